//! Record store seam used by the mapping cache and the event consumer.

use async_trait::async_trait;
use authtrail_core::types::DbId;

use crate::error::StoreError;
use crate::models::auth_provider_log::{AuthProviderLog, CreateAuthProviderLog};
use crate::models::user_mapping::{CreateUserMapping, UpdateUserMapping, UserMapping};

/// Typed persistence for log records and identity mappings.
///
/// Implementations perform no permission checks of their own; callers run
/// the access guard before every write.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_log(&self, input: &CreateAuthProviderLog)
        -> Result<AuthProviderLog, StoreError>;

    /// Log records for a (provider, user) pair in insertion order.
    async fn list_logs(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Vec<AuthProviderLog>, StoreError>;

    /// Limit-one lookup filtered on both keys.
    async fn find_mapping(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<UserMapping>, StoreError>;

    async fn create_mapping(&self, input: &CreateUserMapping) -> Result<UserMapping, StoreError>;

    /// Fails with [`StoreError::NotFound`] if the mapping no longer exists.
    async fn update_mapping(
        &self,
        id: DbId,
        input: &UpdateUserMapping,
    ) -> Result<UserMapping, StoreError>;
}
