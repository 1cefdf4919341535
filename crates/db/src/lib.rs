//! Persistence for the auth provider audit trail.
//!
//! - [`RecordStore`]: the typed store seam used by the event pipeline.
//! - [`PgRecordStore`] / [`MemoryRecordStore`]: PostgreSQL and in-memory
//!   implementations.
//! - [`PgSchemaProvider`]: live permission and field-length introspection.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryRecordStore;
pub use pg::PgRecordStore;
pub use schema::PgSchemaProvider;
pub use store::RecordStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the bundled migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
