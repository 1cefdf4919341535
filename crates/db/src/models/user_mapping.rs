//! Identity mapping entity models and DTOs.

use authtrail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Links a (provider, external user) pair to a local target identity and
/// tracks login metadata.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct UserMapping {
    pub id: DbId,
    pub provider_name: String,
    pub user_id: String,
    pub target_user_identifier: String,
    /// Weak reference to the most recent log record for this pair.
    pub last_auth_provider_log_id: Option<DbId>,
    pub last_login_at: Option<Timestamp>,
    /// `None` is equivalent to zero logins.
    pub number_of_logins: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserMapping {
    /// Login count with the absent value read as zero.
    pub fn login_count(&self) -> i32 {
        self.number_of_logins.unwrap_or(0)
    }
}

/// DTO used by an integration's setup flow to create a mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserMapping {
    pub provider_name: String,
    pub user_id: String,
    pub target_user_identifier: String,
}

/// DTO for updating a mapping. Only non-`None` fields are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserMapping {
    pub last_auth_provider_log_id: Option<DbId>,
    pub last_login_at: Option<Timestamp>,
    pub number_of_logins: Option<i32>,
}
