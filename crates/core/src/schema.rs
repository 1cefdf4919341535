//! Schema and permission metadata.
//!
//! [`SchemaProvider`] answers the questions the access guard and the
//! publisher need: may the current principal create/update an object kind or
//! one of its fields, and what is a field's maximum length. Production uses
//! live database introspection (see `authtrail_db::PgSchemaProvider`);
//! [`StaticSchema`] is a map-backed implementation for tests and for running
//! without a database.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::objects::{log_fields, mapping_fields, ObjectKind};

/// Introspection seam consulted before every write.
///
/// Implementations must not cache answers across calls; permissions may
/// change between invocations.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn is_creatable(&self, object: ObjectKind) -> Result<bool, CoreError>;

    async fn is_updatable(&self, object: ObjectKind) -> Result<bool, CoreError>;

    async fn is_field_creatable(&self, object: ObjectKind, field: &str)
        -> Result<bool, CoreError>;

    async fn is_field_updatable(&self, object: ObjectKind, field: &str)
        -> Result<bool, CoreError>;

    /// Declared maximum length in characters, or `None` when unbounded.
    async fn max_length(&self, object: ObjectKind, field: &str)
        -> Result<Option<usize>, CoreError>;
}

// ---------------------------------------------------------------------------
// Default field lengths
// ---------------------------------------------------------------------------

/// Length limits matching the columns created by the bundled migrations.
pub mod default_lengths {
    pub const PROVIDER_NAME: usize = 255;
    pub const USER_ID: usize = 255;
    pub const LOG_ID: usize = 255;
    pub const MESSAGE: usize = 32_768;
    pub const TARGET_USER_IDENTIFIER: usize = 255;
}

// ---------------------------------------------------------------------------
// StaticSchema
// ---------------------------------------------------------------------------

type FieldKey = (ObjectKind, String);

#[derive(Debug, Default)]
struct StaticState {
    denied_object_create: HashSet<ObjectKind>,
    denied_object_update: HashSet<ObjectKind>,
    denied_field_create: HashSet<FieldKey>,
    denied_field_update: HashSet<FieldKey>,
    max_lengths: HashMap<FieldKey, usize>,
}

/// Map-lookup schema provider.
///
/// Everything is allowed unless explicitly denied. Denials can be added or
/// lifted at runtime so callers can model permission changes between
/// invocations.
#[derive(Debug, Default)]
pub struct StaticSchema {
    state: RwLock<StaticState>,
}

impl StaticSchema {
    /// Permissive schema carrying the default field lengths of both tables.
    pub fn permissive() -> Self {
        let mut state = StaticState::default();
        let lengths = [
            (ObjectKind::AuthProviderLog, log_fields::PROVIDER_NAME, default_lengths::PROVIDER_NAME),
            (ObjectKind::AuthProviderLog, log_fields::USER_ID, default_lengths::USER_ID),
            (ObjectKind::AuthProviderLog, log_fields::LOG_ID, default_lengths::LOG_ID),
            (ObjectKind::AuthProviderLog, log_fields::MESSAGE, default_lengths::MESSAGE),
            (ObjectKind::UserMapping, mapping_fields::PROVIDER_NAME, default_lengths::PROVIDER_NAME),
            (ObjectKind::UserMapping, mapping_fields::USER_ID, default_lengths::USER_ID),
            (
                ObjectKind::UserMapping,
                mapping_fields::TARGET_USER_IDENTIFIER,
                default_lengths::TARGET_USER_IDENTIFIER,
            ),
        ];
        for (object, field, len) in lengths {
            state.max_lengths.insert((object, field.to_string()), len);
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Builder form of [`set_max_length`](Self::set_max_length).
    pub fn with_max_length(mut self, object: ObjectKind, field: &str, max_length: usize) -> Self {
        self.state
            .get_mut()
            .max_lengths
            .insert((object, field.to_string()), max_length);
        self
    }

    pub async fn set_max_length(&self, object: ObjectKind, field: &str, max_length: usize) {
        self.state
            .write()
            .await
            .max_lengths
            .insert((object, field.to_string()), max_length);
    }

    pub async fn deny_create(&self, object: ObjectKind) {
        self.state.write().await.denied_object_create.insert(object);
    }

    pub async fn deny_update(&self, object: ObjectKind) {
        self.state.write().await.denied_object_update.insert(object);
    }

    pub async fn deny_field_create(&self, object: ObjectKind, field: &str) {
        self.state
            .write()
            .await
            .denied_field_create
            .insert((object, field.to_string()));
    }

    pub async fn deny_field_update(&self, object: ObjectKind, field: &str) {
        self.state
            .write()
            .await
            .denied_field_update
            .insert((object, field.to_string()));
    }

    /// Lift every object- and field-level denial. Length limits are kept.
    pub async fn allow_all(&self) {
        let mut state = self.state.write().await;
        state.denied_object_create.clear();
        state.denied_object_update.clear();
        state.denied_field_create.clear();
        state.denied_field_update.clear();
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn is_creatable(&self, object: ObjectKind) -> Result<bool, CoreError> {
        Ok(!self.state.read().await.denied_object_create.contains(&object))
    }

    async fn is_updatable(&self, object: ObjectKind) -> Result<bool, CoreError> {
        Ok(!self.state.read().await.denied_object_update.contains(&object))
    }

    async fn is_field_creatable(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<bool, CoreError> {
        let key = (object, field.to_string());
        Ok(!self.state.read().await.denied_field_create.contains(&key))
    }

    async fn is_field_updatable(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<bool, CoreError> {
        let key = (object, field.to_string());
        Ok(!self.state.read().await.denied_field_update.contains(&key))
    }

    async fn max_length(
        &self,
        object: ObjectKind,
        field: &str,
    ) -> Result<Option<usize>, CoreError> {
        let key = (object, field.to_string());
        Ok(self.state.read().await.max_lengths.get(&key).copied())
    }
}
