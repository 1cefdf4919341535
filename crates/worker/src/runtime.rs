//! Wiring of store, schema, bus and consumer task for one worker process.

use std::sync::Arc;
use std::time::Duration;

use authtrail_core::schema::{SchemaProvider, StaticSchema};
use authtrail_db::{MemoryRecordStore, PgRecordStore, PgSchemaProvider, RecordStore};
use authtrail_events::{AuthTrailService, ConsumerConfig, EventBus, EventConsumer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// How long shutdown waits for the consumer to drain queued events.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub struct Runtime {
    service: AuthTrailService,
    bus: Arc<EventBus>,
    cancel: CancellationToken,
    consumer: JoinHandle<()>,
}

impl Runtime {
    /// Connect the configured backends and start the consumer task.
    pub async fn start(config: &WorkerConfig) -> Result<Self, RuntimeError> {
        let (store, schema): (Arc<dyn RecordStore>, Arc<dyn SchemaProvider>) =
            match &config.database_url {
                Some(url) => {
                    let pool = authtrail_db::create_pool(url, config.db_max_connections).await?;
                    tracing::info!("Database connection pool created");

                    authtrail_db::health_check(&pool).await?;
                    tracing::info!("Database health check passed");

                    authtrail_db::run_migrations(&pool).await?;
                    tracing::info!("Database migrations applied");

                    (
                        Arc::new(PgRecordStore::new(pool.clone())),
                        Arc::new(PgSchemaProvider::new(pool)),
                    )
                }
                None => {
                    tracing::warn!(
                        "DATABASE_URL not set, using in-memory store and permissive schema"
                    );
                    (
                        Arc::new(MemoryRecordStore::new()),
                        Arc::new(StaticSchema::permissive()),
                    )
                }
            };

        Ok(Self::with_backends(store, schema, config.consumer.clone()))
    }

    /// Start the pipeline on explicit backends. Must be called inside a
    /// tokio runtime.
    pub fn with_backends(
        store: Arc<dyn RecordStore>,
        schema: Arc<dyn SchemaProvider>,
        consumer_config: ConsumerConfig,
    ) -> Self {
        let (bus, receiver) = EventBus::channel();
        let bus = Arc::new(bus);
        let cancel = CancellationToken::new();

        let consumer = EventConsumer::new(Arc::clone(&store), Arc::clone(&schema), consumer_config);
        let consumer = tokio::spawn(consumer.run(receiver, cancel.clone()));
        tracing::info!("Event consumer spawned");

        let service = AuthTrailService::new(store, schema, Arc::clone(&bus));

        Self {
            service,
            bus,
            cancel,
            consumer,
        }
    }

    pub fn service(&self) -> &AuthTrailService {
        &self.service
    }

    /// Close the bus, let the consumer drain what is queued, then stop it.
    ///
    /// Sessions opened from [`Runtime::service`] keep the bus alive, so drop
    /// them first.
    pub async fn shutdown(self) {
        let Self {
            service,
            bus,
            cancel,
            mut consumer,
        } = self;
        drop(service);
        drop(bus);

        if tokio::time::timeout(DRAIN_TIMEOUT, &mut consumer).await.is_err() {
            tracing::warn!("Event consumer did not drain in time, cancelling");
            cancel.cancel();
            let _ = consumer.await;
        }
        tracing::info!("Worker runtime stopped");
    }
}
