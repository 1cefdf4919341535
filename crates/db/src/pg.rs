//! PostgreSQL-backed [`RecordStore`].

use async_trait::async_trait;
use authtrail_core::types::DbId;

use crate::error::StoreError;
use crate::models::auth_provider_log::{AuthProviderLog, CreateAuthProviderLog};
use crate::models::user_mapping::{CreateUserMapping, UpdateUserMapping, UserMapping};
use crate::repositories::{AuthProviderLogRepo, UserMappingRepo};
use crate::store::RecordStore;
use crate::DbPool;

/// Record store delegating to the sqlx repositories.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: DbPool,
}

impl PgRecordStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_log(
        &self,
        input: &CreateAuthProviderLog,
    ) -> Result<AuthProviderLog, StoreError> {
        Ok(AuthProviderLogRepo::create(&self.pool, input).await?)
    }

    async fn list_logs(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Vec<AuthProviderLog>, StoreError> {
        Ok(AuthProviderLogRepo::list_for_user(&self.pool, provider_name, user_id).await?)
    }

    async fn find_mapping(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<UserMapping>, StoreError> {
        Ok(UserMappingRepo::find_by_provider_user(&self.pool, provider_name, user_id).await?)
    }

    async fn create_mapping(&self, input: &CreateUserMapping) -> Result<UserMapping, StoreError> {
        Ok(UserMappingRepo::create(&self.pool, input).await?)
    }

    async fn update_mapping(
        &self,
        id: DbId,
        input: &UpdateUserMapping,
    ) -> Result<UserMapping, StoreError> {
        UserMappingRepo::update(&self.pool, id, input)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "auth_provider_user_mapping",
                id,
            })
    }
}
