//! Live schema introspection against PostgreSQL.
//!
//! Permissions come from the privilege functions evaluated for the session's
//! `current_user`, so a consumer connected as a restricted role sees exactly
//! what that role may write. Field lengths come from
//! `information_schema.columns`. Nothing is cached.

use async_trait::async_trait;
use authtrail_core::error::CoreError;
use authtrail_core::objects::ObjectKind;
use authtrail_core::schema::SchemaProvider;

use crate::error::StoreError;
use crate::DbPool;

const INSERT: &str = "INSERT";
const UPDATE: &str = "UPDATE";

#[derive(Clone)]
pub struct PgSchemaProvider {
    pool: DbPool,
}

impl PgSchemaProvider {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn table_privilege(&self, object: ObjectKind, privilege: &str) -> Result<bool, CoreError> {
        sqlx::query_scalar::<_, bool>("SELECT has_table_privilege(current_user, $1, $2)")
            .bind(object.as_str())
            .bind(privilege)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into())
    }

    async fn column_privilege(
        &self,
        object: ObjectKind,
        field: &str,
        privilege: &str,
    ) -> Result<bool, CoreError> {
        sqlx::query_scalar::<_, bool>("SELECT has_column_privilege(current_user, $1, $2, $3)")
            .bind(object.as_str())
            .bind(field)
            .bind(privilege)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::from(e).into())
    }
}

#[async_trait]
impl SchemaProvider for PgSchemaProvider {
    async fn is_creatable(&self, object: ObjectKind) -> Result<bool, CoreError> {
        self.table_privilege(object, INSERT).await
    }

    async fn is_updatable(&self, object: ObjectKind) -> Result<bool, CoreError> {
        self.table_privilege(object, UPDATE).await
    }

    async fn is_field_creatable(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<bool, CoreError> {
        self.column_privilege(object, field, INSERT).await
    }

    async fn is_field_updatable(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<bool, CoreError> {
        self.column_privilege(object, field, UPDATE).await
    }

    async fn max_length(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<Option<usize>, CoreError> {
        let length: Option<Option<i32>> = sqlx::query_scalar(
            "SELECT character_maximum_length::INT \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2",
        )
        .bind(object.as_str())
        .bind(field)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(length
            .flatten()
            .and_then(|len| usize::try_from(len).ok()))
    }
}
