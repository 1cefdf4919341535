pub mod auth_provider_log;
pub mod user_mapping;
