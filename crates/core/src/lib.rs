//! Shared building blocks for the auth provider audit trail.
//!
//! Everything in this crate is free of database and runtime wiring so it can
//! be reused by the record store, the event pipeline, and the worker host.

pub mod access;
pub mod error;
pub mod objects;
pub mod schema;
pub mod types;
pub mod validation;
