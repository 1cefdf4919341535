//! Object kinds and field names written by the audit trail.
//!
//! Field names match the column names in the `auth_provider_logs` and
//! `auth_provider_user_mappings` tables, so the live schema provider can look
//! them up in `information_schema` without a translation table.

use serde::{Deserialize, Serialize};

/// Record types the pipeline writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Immutable audit log entries.
    AuthProviderLog,
    /// Per-(provider, user) identity mappings with login counters.
    UserMapping,
}

impl ObjectKind {
    /// Backing table name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthProviderLog => "auth_provider_logs",
            Self::UserMapping => "auth_provider_user_mappings",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns of `auth_provider_logs`.
pub mod log_fields {
    pub const PROVIDER_NAME: &str = "provider_name";
    pub const USER_ID: &str = "user_id";
    pub const LOG_ID: &str = "log_id";
    pub const MESSAGE: &str = "message";

    /// Every field set when a log record is created.
    pub const ALL: &[&str] = &[PROVIDER_NAME, USER_ID, LOG_ID, MESSAGE];
}

/// Columns of `auth_provider_user_mappings`.
pub mod mapping_fields {
    pub const PROVIDER_NAME: &str = "provider_name";
    pub const USER_ID: &str = "user_id";
    pub const TARGET_USER_IDENTIFIER: &str = "target_user_identifier";
    pub const LAST_AUTH_PROVIDER_LOG_ID: &str = "last_auth_provider_log_id";
    pub const LAST_LOGIN_AT: &str = "last_login_at";
    pub const NUMBER_OF_LOGINS: &str = "number_of_logins";

    /// Fields written when a log record is linked to its mapping.
    pub const LOG_LINK: &[&str] = &[LAST_AUTH_PROVIDER_LOG_ID];

    /// Fields written when a successful login is recorded.
    pub const LOGIN_DETAILS: &[&str] = &[LAST_LOGIN_AT, NUMBER_OF_LOGINS];
}
