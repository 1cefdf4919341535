//! Public operations offered to auth provider plugins.
//!
//! [`AuthTrailService`] is the shared, cheaply cloneable entry point.
//! Each caller request opens a [`Session`], which carries the request-scoped
//! [`MappingCache`]; dropping the session discards the cache.

use std::sync::Arc;

use authtrail_core::error::CoreError;
use authtrail_core::schema::SchemaProvider;
use authtrail_db::RecordStore;

use crate::bus::EventBus;
use crate::cache::MappingCache;
use crate::publisher::EventPublisher;

/// Component name reported by dispatcher errors.
pub const COMPONENT_NAME: &str = "AuthTrailService";

#[derive(Clone)]
pub struct AuthTrailService {
    store: Arc<dyn RecordStore>,
    publisher: EventPublisher,
}

impl AuthTrailService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        schema: Arc<dyn SchemaProvider>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            publisher: EventPublisher::new(bus, schema),
        }
    }

    /// Open a new call context with an empty mapping cache.
    pub fn session(&self) -> Session {
        Session {
            publisher: self.publisher.clone(),
            cache: MappingCache::new(Arc::clone(&self.store)),
        }
    }
}

/// One call context. Not shared across requests or principals.
pub struct Session {
    pub(crate) publisher: EventPublisher,
    pub(crate) cache: MappingCache,
}

impl Session {
    /// Queue a log record for the pair. Returns once the event is published.
    pub async fn insert_log(
        &self,
        provider_name: &str,
        user_id: &str,
        log_id: &str,
        message: &str,
    ) -> Result<(), CoreError> {
        self.publisher
            .publish_log(provider_name, user_id, log_id, message)
            .await
    }

    pub async fn check_user_mapping_exists(
        &mut self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<bool, CoreError> {
        self.cache.exists(provider_name, user_id).await
    }

    /// Queue a login-details update for the pair's mapping.
    pub async fn update_mapping_login_details(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<(), CoreError> {
        self.publisher
            .publish_mapping_update(provider_name, user_id)
            .await
    }

    /// Target identity the pair maps to, or `None` when no mapping exists.
    pub async fn get_subject_from_user_mapping(
        &mut self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<String>, CoreError> {
        Ok(self
            .cache
            .get(provider_name, user_id)
            .await?
            .map(|m| m.target_user_identifier.clone()))
    }
}
