//! Repository for the `auth_provider_logs` table.

use authtrail_core::types::DbId;
use sqlx::PgPool;

use crate::models::auth_provider_log::{AuthProviderLog, CreateAuthProviderLog};

/// Column list for `auth_provider_logs` SELECT queries.
const COLUMNS: &str = "id, provider_name, user_id, log_id, message, created_at";

/// Provides insert and read-back operations for log records.
pub struct AuthProviderLogRepo;

impl AuthProviderLogRepo {
    /// Insert a new log record, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAuthProviderLog,
    ) -> Result<AuthProviderLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_provider_logs (provider_name, user_id, log_id, message) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuthProviderLog>(&query)
            .bind(&input.provider_name)
            .bind(&input.user_id)
            .bind(&input.log_id)
            .bind(&input.message)
            .fetch_one(pool)
            .await
    }

    /// Find a log record by its primary key.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AuthProviderLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM auth_provider_logs WHERE id = $1");
        sqlx::query_as::<_, AuthProviderLog>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List log records for a (provider, user) pair, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Vec<AuthProviderLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM auth_provider_logs \
             WHERE provider_name = $1 AND user_id = $2 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, AuthProviderLog>(&query)
            .bind(provider_name)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
