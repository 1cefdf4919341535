//! Repository layer: one zero-sized struct per table, each method taking the
//! pool explicitly.

pub mod auth_provider_log_repo;
pub mod user_mapping_repo;

pub use auth_provider_log_repo::AuthProviderLogRepo;
pub use user_mapping_repo::UserMappingRepo;
