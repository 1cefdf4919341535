use crate::objects::ObjectKind;

/// Write operation an access check was performed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOperation {
    Create,
    Update,
}

impl AccessOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl std::fmt::Display for AccessOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "Insufficient permissions: cannot {operation} {object} (fields: {})",
        fields.join(", ")
    )]
    Permission {
        operation: AccessOperation,
        object: ObjectKind,
        fields: Vec<String>,
    },

    #[error("Method {action} not implemented by {component}")]
    UnknownAction {
        action: String,
        component: &'static str,
    },

    #[error("Record store error: {0}")]
    Store(String),
}
