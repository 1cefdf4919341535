//! Event pipeline for the auth provider audit trail.
//!
//! - [`EventBus`]: in-process single-consumer queue backed by an unbounded
//!   `tokio::sync::mpsc` channel.
//! - [`EventPublisher`]: validates and truncates caller input, then
//!   publishes one domain event per call.
//! - [`EventConsumer`]: permission-checked write path and its delivery loop.
//! - [`MappingCache`]: request-scoped memo of mapping lookups.
//! - [`AuthTrailService`] / [`Session`]: the public operations, including
//!   the name-based [`Session::call`] dispatcher.

pub mod bus;
pub mod cache;
pub mod consumer;
pub mod dispatch;
pub mod publisher;
pub mod service;

pub use bus::{AuthTrailEvent, EventBus, EventReceiver, LogEvent, MappingUpdateEvent};
pub use cache::MappingCache;
pub use consumer::{BatchOutcome, ConsumerConfig, DeliveryFailure, EventConsumer};
pub use dispatch::{Action, ActionArgs};
pub use publisher::EventPublisher;
pub use service::{AuthTrailService, Session};
