//! Standalone worker hosting the auth provider audit trail pipeline.
//!
//! [`runtime::Runtime`] wires the record store, schema provider, event bus
//! and consumer task; [`bridge`] exposes the dispatcher over JSON lines.

pub mod bridge;
pub mod config;
pub mod runtime;

pub use config::{ConfigError, WorkerConfig};
pub use runtime::{Runtime, RuntimeError};
