//! Auth provider log entity models and DTOs.
//!
//! Log records are immutable once created (no `updated_at`).

use authtrail_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A persisted login attempt or error reported by a provider plugin.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AuthProviderLog {
    pub id: DbId,
    pub provider_name: String,
    pub user_id: String,
    pub log_id: String,
    pub message: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a new log record. All fields are required.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthProviderLog {
    pub provider_name: String,
    pub user_id: String,
    pub log_id: String,
    pub message: String,
}
