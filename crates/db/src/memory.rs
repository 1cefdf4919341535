//! In-memory [`RecordStore`] for tests and database-less runs.
//!
//! Data is lost when the store is dropped. Mapping lookups are counted so
//! callers can observe how often the store was actually queried.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use authtrail_core::types::DbId;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::auth_provider_log::{AuthProviderLog, CreateAuthProviderLog};
use crate::models::user_mapping::{CreateUserMapping, UpdateUserMapping, UserMapping};
use crate::store::RecordStore;

#[derive(Debug, Default)]
struct MemoryState {
    logs: Vec<AuthProviderLog>,
    mappings: Vec<UserMapping>,
    next_log_id: DbId,
    next_mapping_id: DbId,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: RwLock<MemoryState>,
    mapping_lookups: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of [`find_mapping`](RecordStore::find_mapping) calls served.
    pub fn mapping_lookups(&self) -> usize {
        self.mapping_lookups.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored log record, in insertion order.
    pub async fn all_logs(&self) -> Vec<AuthProviderLog> {
        self.state.read().await.logs.clone()
    }

    /// Snapshot of every stored mapping, in insertion order.
    pub async fn all_mappings(&self) -> Vec<UserMapping> {
        self.state.read().await.mappings.clone()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_log(
        &self,
        input: &CreateAuthProviderLog,
    ) -> Result<AuthProviderLog, StoreError> {
        let mut state = self.state.write().await;
        state.next_log_id += 1;
        let record = AuthProviderLog {
            id: state.next_log_id,
            provider_name: input.provider_name.clone(),
            user_id: input.user_id.clone(),
            log_id: input.log_id.clone(),
            message: input.message.clone(),
            created_at: Utc::now(),
        };
        state.logs.push(record.clone());
        Ok(record)
    }

    async fn list_logs(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Vec<AuthProviderLog>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .logs
            .iter()
            .filter(|l| l.provider_name == provider_name && l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_mapping(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<UserMapping>, StoreError> {
        self.mapping_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .read()
            .await
            .mappings
            .iter()
            .find(|m| m.provider_name == provider_name && m.user_id == user_id)
            .cloned())
    }

    async fn create_mapping(&self, input: &CreateUserMapping) -> Result<UserMapping, StoreError> {
        let mut state = self.state.write().await;
        state.next_mapping_id += 1;
        let now = Utc::now();
        let mapping = UserMapping {
            id: state.next_mapping_id,
            provider_name: input.provider_name.clone(),
            user_id: input.user_id.clone(),
            target_user_identifier: input.target_user_identifier.clone(),
            last_auth_provider_log_id: None,
            last_login_at: None,
            number_of_logins: None,
            created_at: now,
            updated_at: now,
        };
        state.mappings.push(mapping.clone());
        Ok(mapping)
    }

    async fn update_mapping(
        &self,
        id: DbId,
        input: &UpdateUserMapping,
    ) -> Result<UserMapping, StoreError> {
        let mut state = self.state.write().await;
        let mapping = state
            .mappings
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound {
                entity: "auth_provider_user_mapping",
                id,
            })?;

        if let Some(log_id) = input.last_auth_provider_log_id {
            mapping.last_auth_provider_log_id = Some(log_id);
        }
        if let Some(at) = input.last_login_at {
            mapping.last_login_at = Some(at);
        }
        if let Some(count) = input.number_of_logins {
            mapping.number_of_logins = Some(count);
        }
        mapping.updated_at = Utc::now();
        Ok(mapping.clone())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn new_mapping(provider: &str, user: &str, target: &str) -> CreateUserMapping {
        CreateUserMapping {
            provider_name: provider.to_string(),
            user_id: user.to_string(),
            target_user_identifier: target.to_string(),
        }
    }

    fn new_log(provider: &str, user: &str, log_id: &str) -> CreateAuthProviderLog {
        CreateAuthProviderLog {
            provider_name: provider.to_string(),
            user_id: user.to_string(),
            log_id: log_id.to_string(),
            message: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn log_ids_are_sequential() {
        let store = MemoryRecordStore::new();
        let a = store.insert_log(&new_log("google", "U1", "L1")).await.unwrap();
        let b = store.insert_log(&new_log("google", "U1", "L2")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[tokio::test]
    async fn list_logs_filters_on_both_keys() {
        let store = MemoryRecordStore::new();
        store.insert_log(&new_log("google", "U1", "L1")).await.unwrap();
        store.insert_log(&new_log("google", "U2", "L2")).await.unwrap();
        store.insert_log(&new_log("github", "U1", "L3")).await.unwrap();

        let logs = store.list_logs("google", "U1").await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].log_id, "L1");
    }

    #[tokio::test]
    async fn find_mapping_matches_exact_pair_and_counts_lookups() {
        let store = MemoryRecordStore::new();
        store.create_mapping(&new_mapping("google", "U1", "T1")).await.unwrap();

        assert!(store.find_mapping("google", "U1").await.unwrap().is_some());
        assert!(store.find_mapping("google", "U2").await.unwrap().is_none());
        assert!(store.find_mapping("github", "U1").await.unwrap().is_none());
        assert_eq!(store.mapping_lookups(), 3);
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let store = MemoryRecordStore::new();
        let mapping = store.create_mapping(&new_mapping("google", "U1", "T1")).await.unwrap();

        let updated = store
            .update_mapping(
                mapping.id,
                &UpdateUserMapping {
                    number_of_logins: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.number_of_logins, Some(3));
        assert!(updated.last_login_at.is_none());
        assert!(updated.last_auth_provider_log_id.is_none());
        assert_eq!(updated.target_user_identifier, "T1");
    }

    #[tokio::test]
    async fn update_of_missing_mapping_is_not_found() {
        let store = MemoryRecordStore::new();
        let result = store.update_mapping(99, &UpdateUserMapping::default()).await;
        assert_matches!(result, Err(StoreError::NotFound { id: 99, .. }));
    }
}
