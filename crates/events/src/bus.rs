//! In-process event bus backed by an unbounded `tokio::sync::mpsc` channel.
//!
//! [`EventBus`] carries [`AuthTrailEvent`]s from the publisher to the
//! consumer. It is designed to be shared via `Arc<EventBus>`.

use authtrail_core::types::Timestamp;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Domain events
// ---------------------------------------------------------------------------

/// Request to persist one log record.
///
/// Field values have already been validated and truncated by the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unique per publish call; repeated deliveries carry the same id.
    pub event_id: Uuid,
    pub provider_name: String,
    pub user_id: String,
    pub log_id: String,
    pub message: String,
    pub published_at: Timestamp,
}

impl LogEvent {
    pub fn new(
        provider_name: impl Into<String>,
        user_id: impl Into<String>,
        log_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            provider_name: provider_name.into(),
            user_id: user_id.into(),
            log_id: log_id.into(),
            message: message.into(),
            published_at: Utc::now(),
        }
    }
}

/// Request to record a successful login on a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingUpdateEvent {
    pub event_id: Uuid,
    pub provider_name: String,
    pub user_id: String,
    pub published_at: Timestamp,
}

impl MappingUpdateEvent {
    pub fn new(provider_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            provider_name: provider_name.into(),
            user_id: user_id.into(),
            published_at: Utc::now(),
        }
    }
}

/// Envelope for everything travelling over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthTrailEvent {
    Log(LogEvent),
    MappingUpdate(MappingUpdateEvent),
}

impl AuthTrailEvent {
    pub fn event_id(&self) -> Uuid {
        match self {
            Self::Log(e) => e.event_id,
            Self::MappingUpdate(e) => e.event_id,
        }
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::MappingUpdate(_) => "mapping_update",
        }
    }
}

impl From<LogEvent> for AuthTrailEvent {
    fn from(event: LogEvent) -> Self {
        Self::Log(event)
    }
}

impl From<MappingUpdateEvent> for AuthTrailEvent {
    fn from(event: MappingUpdateEvent) -> Self {
        Self::MappingUpdate(event)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Consumer end of an [`EventBus`].
pub type EventReceiver = mpsc::UnboundedReceiver<AuthTrailEvent>;

/// In-process event bus with a single consumer.
///
/// Backed by an unbounded `tokio::sync::mpsc` channel: publishing never
/// blocks and never overwrites an event the consumer has not seen yet.
/// Dropping every clone of the bus closes the channel; the consumer then
/// receives whatever is still queued before it observes the close.
///
/// # Usage
///
/// ```rust
/// use authtrail_events::bus::{EventBus, MappingUpdateEvent};
///
/// let (bus, mut rx) = EventBus::channel();
///
/// bus.publish(MappingUpdateEvent::new("myAuthProvider", "U1"));
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::UnboundedSender<AuthTrailEvent>,
}

impl EventBus {
    /// Create a bus together with its one consumer end.
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event for the consumer. Never blocks.
    ///
    /// The event is dropped only when the consumer end has been dropped.
    pub fn publish(&self, event: impl Into<AuthTrailEvent>) {
        let event = event.into();
        let event_id = event.event_id();
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(()) => {
                tracing::debug!(%event_id, kind, "Event published");
            }
            Err(_) => {
                tracing::warn!(%event_id, kind, "Event dropped, no active consumer");
            }
        }
    }

    /// Whether the consumer end has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let (bus, mut rx) = EventBus::channel();

        bus.publish(LogEvent::new("google", "U1", "L1", "boom"));

        let received = rx.recv().await.expect("should receive the event");
        assert_matches!(received, AuthTrailEvent::Log(e) if e.log_id == "L1" && e.message == "boom");
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let (bus, mut rx) = EventBus::channel();

        bus.publish(LogEvent::new("google", "U1", "L1", "first"));
        bus.publish(MappingUpdateEvent::new("google", "U1"));

        assert_eq!(rx.recv().await.unwrap().kind(), "log");
        assert_eq!(rx.recv().await.unwrap().kind(), "mapping_update");
    }

    #[test]
    fn unread_events_are_never_overwritten() {
        let (bus, mut rx) = EventBus::channel();

        for i in 0..5_000 {
            bus.publish(LogEvent::new("google", "U1", format!("L{i}"), "boom"));
        }

        let mut received = 0;
        while let Ok(event) = rx.try_recv() {
            assert_matches!(event, AuthTrailEvent::Log(e) if e.log_id == format!("L{received}"));
            received += 1;
        }
        assert_eq!(received, 5_000);
    }

    #[test]
    fn publish_after_consumer_dropped_does_not_panic() {
        let (bus, rx) = EventBus::channel();
        drop(rx);

        assert!(bus.is_closed());
        bus.publish(MappingUpdateEvent::new("google", "U1"));
    }

    #[test]
    fn dropping_the_bus_closes_the_channel_after_queued_events() {
        let (bus, mut rx) = EventBus::channel();
        let clone = bus.clone();
        bus.publish(MappingUpdateEvent::new("google", "U1"));
        drop(bus);
        drop(clone);

        assert!(rx.try_recv().is_ok());
        assert_matches!(rx.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn each_event_gets_a_distinct_id() {
        let a = MappingUpdateEvent::new("google", "U1");
        let b = MappingUpdateEvent::new("google", "U1");
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn envelope_serializes_with_kind_tag() {
        let event = AuthTrailEvent::from(MappingUpdateEvent::new("google", "U1"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "mapping_update");
        assert_eq!(json["provider_name"], "google");
    }
}
