//! Consume side of the pipeline.
//!
//! [`EventConsumer`] owns the write path: it re-checks permissions through
//! the [`AccessGuard`] under its own principal, persists log records, and
//! maintains the mapping's log link and login counters.
//!
//! The handlers take same-kind batches. Every event in a batch is processed
//! in order and on its own: a failing event is reported with its id and the
//! rest of the batch carries on. An empty batch is a no-op.
//! [`EventConsumer::run`] is the delivery loop that turns the bus into such
//! batches.

use std::sync::Arc;

use authtrail_core::access::AccessGuard;
use authtrail_core::error::CoreError;
use authtrail_core::objects::{log_fields, mapping_fields, ObjectKind};
use authtrail_core::schema::SchemaProvider;
use authtrail_db::models::auth_provider_log::{AuthProviderLog, CreateAuthProviderLog};
use authtrail_db::models::user_mapping::{UpdateUserMapping, UserMapping};
use authtrail_db::RecordStore;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::bus::{AuthTrailEvent, EventReceiver, LogEvent, MappingUpdateEvent};
use crate::cache::MappingCache;

/// Default upper bound on events drained into one delivery.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum number of events drained from the bus per delivery.
    pub max_batch_size: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// One event that could not be fully processed.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    /// `"log"` or `"mapping_update"`.
    pub kind: &'static str,
    pub event_id: Uuid,
    pub error: String,
}

/// Per-event result of one handler invocation.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Records written, in event order.
    pub completed: Vec<T>,
    pub failures: Vec<DeliveryFailure>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, kind: &'static str, event_id: Uuid, error: CoreError) {
        self.failures.push(DeliveryFailure {
            kind,
            event_id,
            error: error.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Same-kind run of events handed to one handler invocation.
#[derive(Debug)]
enum Batch {
    Log(Vec<LogEvent>),
    MappingUpdate(Vec<MappingUpdateEvent>),
}

#[derive(Clone)]
pub struct EventConsumer {
    store: Arc<dyn RecordStore>,
    guard: AccessGuard,
    config: ConsumerConfig,
    failures: Option<mpsc::UnboundedSender<DeliveryFailure>>,
}

impl EventConsumer {
    pub fn new(
        store: Arc<dyn RecordStore>,
        schema: Arc<dyn SchemaProvider>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            store,
            guard: AccessGuard::new(schema),
            config,
            failures: None,
        }
    }

    /// Also report failed events on `tx`, in addition to the error log.
    pub fn with_failure_channel(mut self, tx: mpsc::UnboundedSender<DeliveryFailure>) -> Self {
        self.failures = Some(tx);
        self
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    /// Persist one log record per event and link it to the pair's mapping.
    ///
    /// Create access on the log object is checked for each event before its
    /// write. A missing mapping is not an error.
    pub async fn handle_log_events(&self, batch: &[LogEvent]) -> BatchOutcome<AuthProviderLog> {
        let mut outcome = BatchOutcome::new();
        let mut cache = MappingCache::new(Arc::clone(&self.store));

        for event in batch {
            match self.process_log_event(&mut cache, event).await {
                Ok(record) => outcome.completed.push(record),
                Err(e) => outcome.fail("log", event.event_id, e),
            }
        }
        outcome
    }

    /// Stamp the login time and bump the login counter on each event's
    /// mapping. Events whose pair has no mapping are skipped.
    pub async fn handle_mapping_update_events(
        &self,
        batch: &[MappingUpdateEvent],
    ) -> BatchOutcome<UserMapping> {
        let mut outcome = BatchOutcome::new();
        let mut cache = MappingCache::new(Arc::clone(&self.store));

        for event in batch {
            match self.process_login_event(&mut cache, event).await {
                Ok(Some(saved)) => outcome.completed.push(saved),
                Ok(None) => {}
                Err(e) => outcome.fail("mapping_update", event.event_id, e),
            }
        }
        outcome
    }

    async fn process_log_event(
        &self,
        cache: &mut MappingCache,
        event: &LogEvent,
    ) -> Result<AuthProviderLog, CoreError> {
        self.guard
            .check_create_access(ObjectKind::AuthProviderLog, log_fields::ALL)
            .await?;

        let record = self
            .store
            .insert_log(&CreateAuthProviderLog {
                provider_name: event.provider_name.clone(),
                user_id: event.user_id.clone(),
                log_id: event.log_id.clone(),
                message: event.message.clone(),
            })
            .await?;

        tracing::info!(
            event_id = %event.event_id,
            log_record_id = record.id,
            provider_name = %record.provider_name,
            user_id = %record.user_id,
            "Auth provider log persisted"
        );

        self.link_mapping(cache, &record).await?;
        Ok(record)
    }

    async fn process_login_event(
        &self,
        cache: &mut MappingCache,
        event: &MappingUpdateEvent,
    ) -> Result<Option<UserMapping>, CoreError> {
        let Some(mapping) = cache
            .get(&event.provider_name, &event.user_id)
            .await?
            .cloned()
        else {
            tracing::debug!(
                event_id = %event.event_id,
                provider_name = %event.provider_name,
                user_id = %event.user_id,
                "No mapping configured, login not recorded"
            );
            return Ok(None);
        };

        self.guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOGIN_DETAILS)
            .await?;

        let update = UpdateUserMapping {
            last_login_at: Some(Utc::now()),
            number_of_logins: Some(mapping.login_count().saturating_add(1)),
            ..Default::default()
        };
        let saved = self.store.update_mapping(mapping.id, &update).await?;

        tracing::info!(
            event_id = %event.event_id,
            mapping_id = saved.id,
            number_of_logins = saved.login_count(),
            "Mapping login details updated"
        );

        cache.remember(saved.clone());
        Ok(Some(saved))
    }

    /// Point the pair's mapping, if any, at the freshly created log record.
    async fn link_mapping(
        &self,
        cache: &mut MappingCache,
        record: &AuthProviderLog,
    ) -> Result<(), CoreError> {
        let Some(mapping_id) = cache
            .get(&record.provider_name, &record.user_id)
            .await?
            .map(|m| m.id)
        else {
            return Ok(());
        };

        self.guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOG_LINK)
            .await?;

        let update = UpdateUserMapping {
            last_auth_provider_log_id: Some(record.id),
            ..Default::default()
        };
        let saved = self.store.update_mapping(mapping_id, &update).await?;

        tracing::debug!(
            mapping_id,
            log_record_id = record.id,
            "Mapping linked to latest log record"
        );
        cache.remember(saved);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Delivery loop
    // -----------------------------------------------------------------------

    /// Run the delivery loop until the bus closes or `cancel` fires.
    ///
    /// Each wake-up drains whatever is already queued (up to
    /// `max_batch_size`), splits it into same-kind runs in publish order, and
    /// hands each run to its handler. Failed events are reported and the
    /// loop carries on. Once every bus handle is dropped, queued events are
    /// still delivered before the loop exits.
    pub async fn run(self, mut receiver: EventReceiver, cancel: CancellationToken) {
        tracing::info!(max_batch_size = self.config.max_batch_size, "Event consumer started");

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event consumer cancelled");
                    break;
                }
                received = receiver.recv() => received,
            };

            let Some(first) = received else {
                tracing::info!("Event bus closed, consumer shutting down");
                break;
            };

            let pending = self.drain(first, &mut receiver);
            self.deliver(pending).await;
        }
    }

    /// Collect `first` plus any events already queued on the receiver.
    fn drain(&self, first: AuthTrailEvent, receiver: &mut EventReceiver) -> Vec<AuthTrailEvent> {
        let mut pending = vec![first];
        let max = self.config.max_batch_size.max(1);

        while pending.len() < max {
            match receiver.try_recv() {
                Ok(event) => pending.push(event),
                // A closed bus is noticed on the next `recv`.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        pending
    }

    async fn deliver(&self, events: Vec<AuthTrailEvent>) {
        for batch in split_runs(events) {
            let failures = match &batch {
                Batch::Log(run) => self.handle_log_events(run).await.failures,
                Batch::MappingUpdate(run) => self.handle_mapping_update_events(run).await.failures,
            };

            for failure in failures {
                tracing::error!(
                    event_id = %failure.event_id,
                    kind = failure.kind,
                    error = %failure.error,
                    "Failed to process event"
                );
                if let Some(tx) = &self.failures {
                    // A closed failure channel only means nobody is listening.
                    let _ = tx.send(failure);
                }
            }
        }
    }
}

/// Split events into maximal same-kind runs, preserving order.
fn split_runs(events: Vec<AuthTrailEvent>) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    for event in events {
        match event {
            AuthTrailEvent::Log(e) => {
                if let Some(Batch::Log(run)) = batches.last_mut() {
                    run.push(e);
                } else {
                    batches.push(Batch::Log(vec![e]));
                }
            }
            AuthTrailEvent::MappingUpdate(e) => {
                if let Some(Batch::MappingUpdate(run)) = batches.last_mut() {
                    run.push(e);
                } else {
                    batches.push(Batch::MappingUpdate(vec![e]));
                }
            }
        }
    }
    batches
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use authtrail_core::schema::StaticSchema;
    use authtrail_db::models::user_mapping::CreateUserMapping;
    use authtrail_db::MemoryRecordStore;

    use super::*;
    use crate::bus::EventBus;

    struct Fixture {
        store: Arc<MemoryRecordStore>,
        schema: Arc<StaticSchema>,
        consumer: EventConsumer,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryRecordStore::new());
        let schema = Arc::new(StaticSchema::permissive());
        let consumer = EventConsumer::new(
            store.clone(),
            schema.clone(),
            ConsumerConfig::default(),
        );
        Fixture {
            store,
            schema,
            consumer,
        }
    }

    async fn seed_mapping(store: &MemoryRecordStore, user: &str) -> UserMapping {
        store
            .create_mapping(&CreateUserMapping {
                provider_name: "myAuthProvider".into(),
                user_id: user.into(),
                target_user_identifier: "T1".into(),
            })
            .await
            .unwrap()
    }

    fn log_event(user: &str, log_id: &str) -> LogEvent {
        LogEvent::new("myAuthProvider", user, log_id, "boom")
    }

    fn login_event(user: &str) -> MappingUpdateEvent {
        MappingUpdateEvent::new("myAuthProvider", user)
    }

    // -- log events --------------------------------------------------------

    #[tokio::test]
    async fn empty_log_batch_is_noop() {
        let f = fixture();
        f.schema.deny_create(ObjectKind::AuthProviderLog).await;

        let outcome = f.consumer.handle_log_events(&[]).await;
        assert!(outcome.completed.is_empty());
        assert!(outcome.is_clean());
        assert!(f.store.all_logs().await.is_empty());
    }

    #[tokio::test]
    async fn log_without_mapping_creates_record_only() {
        let f = fixture();

        let outcome = f.consumer.handle_log_events(&[log_event("U1", "L1")]).await;

        assert!(outcome.is_clean());
        assert_eq!(outcome.completed.len(), 1);
        let logs = f.store.all_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].provider_name, "myAuthProvider");
        assert_eq!(logs[0].user_id, "U1");
        assert_eq!(logs[0].log_id, "L1");
        assert_eq!(logs[0].message, "boom");
        assert!(f.store.all_mappings().await.is_empty());
    }

    #[tokio::test]
    async fn log_links_existing_mapping() {
        let f = fixture();
        let mapping = seed_mapping(&f.store, "U1").await;

        let outcome = f.consumer.handle_log_events(&[log_event("U1", "L1")]).await;

        assert!(outcome.is_clean());
        let mappings = f.store.all_mappings().await;
        assert_eq!(mappings[0].id, mapping.id);
        assert_eq!(mappings[0].last_auth_provider_log_id, Some(outcome.completed[0].id));
        assert_eq!(mappings[0].number_of_logins, None);
        assert!(mappings[0].last_login_at.is_none());
    }

    #[tokio::test]
    async fn log_create_denial_fails_each_event_without_writing() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;
        f.schema
            .deny_field_create(ObjectKind::AuthProviderLog, log_fields::MESSAGE)
            .await;

        let events = [log_event("U1", "L1"), log_event("U1", "L2")];
        let outcome = f.consumer.handle_log_events(&events).await;

        assert!(outcome.completed.is_empty());
        let failed: Vec<_> = outcome.failures.iter().map(|x| x.event_id).collect();
        assert_eq!(failed, vec![events[0].event_id, events[1].event_id]);
        assert!(outcome.failures[0].error.contains("cannot create auth_provider_logs"));
        assert!(f.store.all_logs().await.is_empty());
        assert!(f.store.all_mappings().await[0].last_auth_provider_log_id.is_none());
    }

    #[tokio::test]
    async fn mapping_link_denial_surfaces_after_log_is_written() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;
        f.schema
            .deny_field_update(
                ObjectKind::UserMapping,
                mapping_fields::LAST_AUTH_PROVIDER_LOG_ID,
            )
            .await;

        let outcome = f.consumer.handle_log_events(&[log_event("U1", "L1")]).await;

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].kind, "log");
        assert!(outcome.failures[0].error.contains("cannot update auth_provider_user_mappings"));
        assert_eq!(f.store.all_logs().await.len(), 1);
        assert!(f.store.all_mappings().await[0].last_auth_provider_log_id.is_none());
    }

    #[tokio::test]
    async fn failing_event_does_not_block_the_rest_of_the_batch() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;
        f.schema
            .deny_field_update(
                ObjectKind::UserMapping,
                mapping_fields::LAST_AUTH_PROVIDER_LOG_ID,
            )
            .await;

        let linked = log_event("U1", "L1");
        let unmapped = log_event("U2", "L2");
        let outcome = f
            .consumer
            .handle_log_events(&[linked.clone(), unmapped.clone()])
            .await;

        // Only the event whose mapping link was denied is reported.
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].event_id, linked.event_id);
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].log_id, "L2");

        let users: Vec<_> = f
            .store
            .all_logs()
            .await
            .into_iter()
            .map(|l| l.user_id)
            .collect();
        assert_eq!(users, ["U1", "U2"]);
    }

    #[tokio::test]
    async fn multi_event_log_batch_is_processed_in_order() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;

        let outcome = f
            .consumer
            .handle_log_events(&[log_event("U1", "L1"), log_event("U2", "L2"), log_event("U1", "L3")])
            .await;

        assert!(outcome.is_clean());
        let ids: Vec<_> = outcome.completed.iter().map(|r| r.log_id.as_str()).collect();
        assert_eq!(ids, ["L1", "L2", "L3"]);
        assert_eq!(
            f.store.all_mappings().await[0].last_auth_provider_log_id,
            Some(outcome.completed[2].id)
        );
        // One lookup per distinct pair in the batch.
        assert_eq!(f.store.mapping_lookups(), 2);
    }

    #[tokio::test]
    async fn duplicate_log_events_produce_duplicate_records() {
        let f = fixture();
        let event = log_event("U1", "L1");

        f.consumer.handle_log_events(&[event.clone()]).await;
        f.consumer.handle_log_events(&[event]).await;

        assert_eq!(f.store.all_logs().await.len(), 2);
    }

    // -- mapping update events ---------------------------------------------

    #[tokio::test]
    async fn empty_mapping_batch_is_noop() {
        let f = fixture();
        let outcome = f.consumer.handle_mapping_update_events(&[]).await;
        assert!(outcome.completed.is_empty());
        assert_eq!(f.store.mapping_lookups(), 0);
    }

    #[tokio::test]
    async fn mapping_update_without_mapping_is_noop() {
        let f = fixture();
        f.schema.deny_update(ObjectKind::UserMapping).await;

        let outcome = f
            .consumer
            .handle_mapping_update_events(&[login_event("U1")])
            .await;
        assert!(outcome.completed.is_empty());
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn mapping_update_records_login() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;

        let before = Utc::now();
        let outcome = f
            .consumer
            .handle_mapping_update_events(&[login_event("U1")])
            .await;

        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].number_of_logins, Some(1));
        assert!(outcome.completed[0].last_login_at.unwrap() >= before);
    }

    #[tokio::test]
    async fn consecutive_updates_increment_counter() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;

        f.consumer.handle_mapping_update_events(&[login_event("U1")]).await;
        f.consumer.handle_mapping_update_events(&[login_event("U1")]).await;

        assert_eq!(f.store.all_mappings().await[0].number_of_logins, Some(2));
    }

    #[tokio::test]
    async fn repeated_pair_within_one_batch_counts_each_event() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;

        let outcome = f
            .consumer
            .handle_mapping_update_events(&[login_event("U1"), login_event("U1"), login_event("U1")])
            .await;

        assert!(outcome.is_clean());
        assert_eq!(f.store.all_mappings().await[0].number_of_logins, Some(3));
        assert_eq!(f.store.mapping_lookups(), 1);
    }

    #[tokio::test]
    async fn mapping_update_denial_leaves_mapping_untouched() {
        let f = fixture();
        seed_mapping(&f.store, "U1").await;
        f.schema
            .deny_field_update(ObjectKind::UserMapping, mapping_fields::NUMBER_OF_LOGINS)
            .await;

        let event = login_event("U1");
        let outcome = f.consumer.handle_mapping_update_events(&[event.clone()]).await;

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].event_id, event.event_id);
        assert_eq!(outcome.failures[0].kind, "mapping_update");
        let mappings = f.store.all_mappings().await;
        assert!(mappings[0].number_of_logins.is_none());
        assert!(mappings[0].last_login_at.is_none());
    }

    // -- batching ----------------------------------------------------------

    #[test]
    fn split_runs_groups_consecutive_kinds() {
        let events = vec![
            AuthTrailEvent::from(log_event("U1", "L1")),
            AuthTrailEvent::from(log_event("U1", "L2")),
            AuthTrailEvent::from(login_event("U1")),
            AuthTrailEvent::from(log_event("U1", "L3")),
        ];

        let batches = split_runs(events);

        assert_eq!(batches.len(), 3);
        assert_matches!(&batches[0], Batch::Log(run) if run.len() == 2);
        assert_matches!(&batches[1], Batch::MappingUpdate(run) if run.len() == 1);
        assert_matches!(&batches[2], Batch::Log(run) if run[0].log_id == "L3");
    }

    #[tokio::test]
    async fn drain_respects_max_batch_size() {
        let store = Arc::new(MemoryRecordStore::new());
        let consumer = EventConsumer::new(
            store,
            Arc::new(StaticSchema::permissive()),
            ConsumerConfig { max_batch_size: 2 },
        );
        let (bus, mut rx) = EventBus::channel();
        for i in 0..4 {
            bus.publish(log_event("U1", &format!("L{i}")));
        }

        let first = rx.recv().await.unwrap();
        let pending = consumer.drain(first, &mut rx);
        assert_eq!(pending.len(), 2);
        // The rest stays queued for the next delivery.
        let next = rx.recv().await.unwrap();
        assert_eq!(consumer.drain(next, &mut rx).len(), 2);
    }

    #[tokio::test]
    async fn failed_events_are_reported_one_by_one() {
        let f = fixture();
        f.schema.deny_create(ObjectKind::AuthProviderLog).await;
        let (tx, mut failures) = mpsc::unbounded_channel();
        let consumer = f.consumer.with_failure_channel(tx);

        let a = log_event("U1", "L1");
        let b = log_event("U2", "L2");
        consumer
            .deliver(vec![AuthTrailEvent::from(a.clone()), AuthTrailEvent::from(b.clone())])
            .await;

        let first = failures.try_recv().expect("first failure should be reported");
        let second = failures.try_recv().expect("second failure should be reported");
        assert!(failures.try_recv().is_err());
        assert_eq!(first.kind, "log");
        assert_eq!(first.event_id, a.event_id);
        assert_eq!(second.event_id, b.event_id);
        assert!(first.error.contains("auth_provider_logs"));
    }
}
