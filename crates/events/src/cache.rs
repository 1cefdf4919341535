//! Request-scoped identity mapping cache.
//!
//! A [`MappingCache`] lives for one call context: a [`Session`] or one
//! consumer batch delivery. The first lookup of a (provider, user) pair hits
//! the record store; the result, found or not, is memoized for the rest of
//! the context.
//!
//! [`Session`]: crate::service::Session

use std::collections::HashMap;
use std::sync::Arc;

use authtrail_core::error::CoreError;
use authtrail_db::models::user_mapping::UserMapping;
use authtrail_db::RecordStore;

type PairKey = (String, String);

pub struct MappingCache {
    store: Arc<dyn RecordStore>,
    entries: HashMap<PairKey, Option<UserMapping>>,
}

impl MappingCache {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            entries: HashMap::new(),
        }
    }

    /// Mapping for the pair, loading it on first use.
    pub async fn get(
        &mut self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<&UserMapping>, CoreError> {
        let key = (provider_name.to_string(), user_id.to_string());
        if !self.entries.contains_key(&key) {
            let found = self.store.find_mapping(provider_name, user_id).await?;
            tracing::debug!(
                provider_name,
                user_id,
                found = found.is_some(),
                "Mapping cache miss"
            );
            self.entries.insert(key.clone(), found);
        }
        Ok(self.entries.get(&key).and_then(Option::as_ref))
    }

    pub async fn exists(&mut self, provider_name: &str, user_id: &str) -> Result<bool, CoreError> {
        Ok(self.get(provider_name, user_id).await?.is_some())
    }

    /// Replace the memo for the mapping's pair with a freshly persisted copy.
    pub fn remember(&mut self, mapping: UserMapping) {
        let key = (mapping.provider_name.clone(), mapping.user_id.clone());
        self.entries.insert(key, Some(mapping));
    }
}
