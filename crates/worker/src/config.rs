use authtrail_events::consumer::DEFAULT_MAX_BATCH_SIZE;
use authtrail_events::ConsumerConfig;

/// Default sqlx pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("{var} must be a positive integer, got {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// PostgreSQL URL. `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub consumer: ConsumerConfig,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default  |
    /// |----------------------|----------|
    /// | `DATABASE_URL`       | unset    |
    /// | `DB_MAX_CONNECTIONS` | `20`     |
    /// | `CONSUMER_MAX_BATCH` | `200`    |
    ///
    /// Without `DATABASE_URL` the worker uses the in-memory record store and
    /// a permissive static schema.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let db_max_connections = positive(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let max_batch_size = positive(&lookup, "CONSUMER_MAX_BATCH", DEFAULT_MAX_BATCH_SIZE)?;

        Ok(Self {
            database_url,
            db_max_connections,
            consumer: ConsumerConfig { max_batch_size },
        })
    }
}

fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}
