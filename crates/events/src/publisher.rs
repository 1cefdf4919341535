//! Publish side of the pipeline.
//!
//! [`EventPublisher`] validates request shape, truncates values to their
//! declared field lengths, and hands one event per call to the bus. It never
//! checks write permissions; the consumer does that under its own principal.

use std::sync::Arc;

use authtrail_core::error::CoreError;
use authtrail_core::objects::{log_fields, mapping_fields, ObjectKind};
use authtrail_core::schema::SchemaProvider;
use authtrail_core::validation::{require_non_blank, truncate};

use crate::bus::{EventBus, LogEvent, MappingUpdateEvent};

/// Returned when any of the four log inputs is blank.
pub const LOG_FIELDS_REQUIRED: &str =
    "Provider name, user ID, log ID and message are all required";

/// Returned when either mapping-update input is blank.
pub const MAPPING_FIELDS_REQUIRED: &str = "Provider name and user ID are both required";

#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<EventBus>,
    schema: Arc<dyn SchemaProvider>,
}

impl EventPublisher {
    pub fn new(bus: Arc<EventBus>, schema: Arc<dyn SchemaProvider>) -> Self {
        Self { bus, schema }
    }

    /// Validate, truncate and publish a [`LogEvent`].
    pub async fn publish_log(
        &self,
        provider_name: &str,
        user_id: &str,
        log_id: &str,
        message: &str,
    ) -> Result<(), CoreError> {
        require_non_blank(&[provider_name, user_id, log_id, message], LOG_FIELDS_REQUIRED)?;

        let object = ObjectKind::AuthProviderLog;
        let event = LogEvent::new(
            self.fit(object, log_fields::PROVIDER_NAME, provider_name).await?,
            self.fit(object, log_fields::USER_ID, user_id).await?,
            self.fit(object, log_fields::LOG_ID, log_id).await?,
            self.fit(object, log_fields::MESSAGE, message).await?,
        );

        tracing::debug!(
            event_id = %event.event_id,
            provider_name = %event.provider_name,
            user_id = %event.user_id,
            log_id = %event.log_id,
            "Publishing log event"
        );
        self.bus.publish(event);
        Ok(())
    }

    /// Validate, truncate and publish a [`MappingUpdateEvent`].
    pub async fn publish_mapping_update(
        &self,
        provider_name: &str,
        user_id: &str,
    ) -> Result<(), CoreError> {
        require_non_blank(&[provider_name, user_id], MAPPING_FIELDS_REQUIRED)?;

        let object = ObjectKind::UserMapping;
        let event = MappingUpdateEvent::new(
            self.fit(object, mapping_fields::PROVIDER_NAME, provider_name).await?,
            self.fit(object, mapping_fields::USER_ID, user_id).await?,
        );

        tracing::debug!(
            event_id = %event.event_id,
            provider_name = %event.provider_name,
            user_id = %event.user_id,
            "Publishing mapping update event"
        );
        self.bus.publish(event);
        Ok(())
    }

    /// Truncate `value` to the field's declared maximum, if it has one.
    async fn fit(&self, object: ObjectKind, field: &str, value: &str) -> Result<String, CoreError> {
        Ok(match self.schema.max_length(object, field).await? {
            Some(max) => truncate(value, max).into_owned(),
            None => value.to_string(),
        })
    }
}
