//! Repository for the `auth_provider_user_mappings` table.

use authtrail_core::types::DbId;
use sqlx::PgPool;

use crate::models::user_mapping::{CreateUserMapping, UpdateUserMapping, UserMapping};

/// Column list for `auth_provider_user_mappings` SELECT queries.
const COLUMNS: &str = "\
    id, provider_name, user_id, target_user_identifier, \
    last_auth_provider_log_id, last_login_at, number_of_logins, \
    created_at, updated_at";

/// Provides lookup, creation and update operations for identity mappings.
pub struct UserMappingRepo;

impl UserMappingRepo {
    /// Create a mapping. Used by integration setup flows, not the pipeline.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUserMapping,
    ) -> Result<UserMapping, sqlx::Error> {
        let query = format!(
            "INSERT INTO auth_provider_user_mappings \
                (provider_name, user_id, target_user_identifier) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserMapping>(&query)
            .bind(&input.provider_name)
            .bind(&input.user_id)
            .bind(&input.target_user_identifier)
            .fetch_one(pool)
            .await
    }

    /// Find the mapping for a (provider, user) pair.
    ///
    /// At most one row is returned; uniqueness is the caller's contract, so
    /// the lowest id wins if duplicates were ever created.
    pub async fn find_by_provider_user(
        pool: &PgPool,
        provider_name: &str,
        user_id: &str,
    ) -> Result<Option<UserMapping>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM auth_provider_user_mappings \
             WHERE provider_name = $1 AND user_id = $2 \
             ORDER BY id ASC \
             LIMIT 1"
        );
        sqlx::query_as::<_, UserMapping>(&query)
            .bind(provider_name)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply the non-`None` fields of `input` and bump `updated_at`.
    ///
    /// Returns `None` if no mapping with the given id exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUserMapping,
    ) -> Result<Option<UserMapping>, sqlx::Error> {
        let query = format!(
            "UPDATE auth_provider_user_mappings SET \
                last_auth_provider_log_id = COALESCE($2, last_auth_provider_log_id), \
                last_login_at = COALESCE($3, last_login_at), \
                number_of_logins = COALESCE($4, number_of_logins), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserMapping>(&query)
            .bind(id)
            .bind(input.last_auth_provider_log_id)
            .bind(input.last_login_at)
            .bind(input.number_of_logins)
            .fetch_optional(pool)
            .await
    }
}
