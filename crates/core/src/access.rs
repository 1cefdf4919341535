//! Object- and field-level write permission checks.
//!
//! [`AccessGuard`] is consulted by the event consumer immediately before each
//! write. Every check goes back to the [`SchemaProvider`]; nothing is cached.

use std::sync::Arc;

use crate::error::{AccessOperation, CoreError};
use crate::objects::ObjectKind;
use crate::schema::SchemaProvider;

#[derive(Clone)]
pub struct AccessGuard {
    schema: Arc<dyn SchemaProvider>,
}

impl AccessGuard {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self { schema }
    }

    /// Ensure the principal may create `object` with every field in `fields`.
    pub async fn check_create_access(
        &self,
        object: ObjectKind,
        fields: &[&str],
    ) -> Result<(), CoreError> {
        self.check(AccessOperation::Create, object, fields).await
    }

    /// Ensure the principal may update every field in `fields` on `object`.
    pub async fn check_update_access(
        &self,
        object: ObjectKind,
        fields: &[&str],
    ) -> Result<(), CoreError> {
        self.check(AccessOperation::Update, object, fields).await
    }

    async fn check(
        &self,
        operation: AccessOperation,
        object: ObjectKind,
        fields: &[&str],
    ) -> Result<(), CoreError> {
        if self.is_permitted(operation, object, fields).await? {
            return Ok(());
        }

        tracing::warn!(
            operation = %operation,
            object = %object,
            fields = ?fields,
            "Write denied by access guard"
        );
        Err(CoreError::Permission {
            operation,
            object,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        })
    }

    async fn is_permitted(
        &self,
        operation: AccessOperation,
        object: ObjectKind,
        fields: &[&str],
    ) -> Result<bool, CoreError> {
        let object_ok = match operation {
            AccessOperation::Create => self.schema.is_creatable(object).await?,
            AccessOperation::Update => self.schema.is_updatable(object).await?,
        };
        if !object_ok {
            return Ok(false);
        }

        for field in fields {
            let field_ok = match operation {
                AccessOperation::Create => self.schema.is_field_creatable(object, field).await?,
                AccessOperation::Update => self.schema.is_field_updatable(object, field).await?,
            };
            if !field_ok {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::objects::{log_fields, mapping_fields};
    use crate::schema::StaticSchema;

    fn guard_with(schema: Arc<StaticSchema>) -> AccessGuard {
        AccessGuard::new(schema)
    }

    #[tokio::test]
    async fn permitted_create_passes() {
        let guard = guard_with(Arc::new(StaticSchema::permissive()));
        guard
            .check_create_access(ObjectKind::AuthProviderLog, log_fields::ALL)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn object_level_denial_fails_create() {
        let schema = Arc::new(StaticSchema::permissive());
        schema.deny_create(ObjectKind::AuthProviderLog).await;
        let guard = guard_with(schema);

        let result = guard
            .check_create_access(ObjectKind::AuthProviderLog, log_fields::ALL)
            .await;
        assert_matches!(
            result,
            Err(CoreError::Permission { operation: AccessOperation::Create, object: ObjectKind::AuthProviderLog, fields })
                if fields.len() == 4
        );
    }

    #[tokio::test]
    async fn single_field_denial_fails_update() {
        let schema = Arc::new(StaticSchema::permissive());
        schema
            .deny_field_update(ObjectKind::UserMapping, mapping_fields::NUMBER_OF_LOGINS)
            .await;
        let guard = guard_with(schema);

        let result = guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOGIN_DETAILS)
            .await;
        assert_matches!(result, Err(CoreError::Permission { operation: AccessOperation::Update, .. }));

        // A field outside the denied set is still writable.
        guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOG_LINK)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_denial_does_not_affect_update() {
        let schema = Arc::new(StaticSchema::permissive());
        schema.deny_create(ObjectKind::UserMapping).await;
        let guard = guard_with(schema);

        guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOGIN_DETAILS)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn permission_changes_are_seen_on_next_check() {
        let schema = Arc::new(StaticSchema::permissive());
        let guard = guard_with(Arc::clone(&schema));

        schema.deny_update(ObjectKind::UserMapping).await;
        assert!(guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOG_LINK)
            .await
            .is_err());

        schema.allow_all().await;
        assert!(guard
            .check_update_access(ObjectKind::UserMapping, mapping_fields::LOG_LINK)
            .await
            .is_ok());
    }
}
