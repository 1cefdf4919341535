//! Name-based entry point for late-bound plugin callers.
//!
//! Callers that can only address functionality by string name use
//! [`Session::call`]. The action name is parsed into the closed [`Action`]
//! enum and routed to the typed operation; validation stays with that
//! operation.

use std::str::FromStr;

use authtrail_core::error::CoreError;
use serde_json::Value;

use crate::service::{Session, COMPONENT_NAME};

/// Argument map accepted by [`Session::call`].
pub type ActionArgs = serde_json::Map<String, Value>;

/// Argument keys read from [`ActionArgs`].
pub mod arg_names {
    pub const PROVIDER_NAME: &str = "providerName";
    pub const USER_ID: &str = "userId";
    pub const LOG_ID: &str = "logId";
    pub const MESSAGE: &str = "message";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InsertLog,
    CheckUserMappingExists,
    UpdateMappingLoginDetails,
    GetSubjectFromUserMapping,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::InsertLog,
        Action::CheckUserMappingExists,
        Action::UpdateMappingLoginDetails,
        Action::GetSubjectFromUserMapping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::InsertLog => "insertLog",
            Self::CheckUserMappingExists => "checkUserMappingExists",
            Self::UpdateMappingLoginDetails => "updateMappingLoginDetails",
            Self::GetSubjectFromUserMapping => "getSubjectFromUserMapping",
        }
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| CoreError::UnknownAction {
                action: s.to_string(),
                component: COMPONENT_NAME,
            })
    }
}

/// String argument by name. Missing or non-string values read as empty so
/// the routed operation reports them as blank.
fn arg<'a>(args: &'a ActionArgs, name: &str) -> &'a str {
    args.get(name).and_then(Value::as_str).unwrap_or_default()
}

impl Session {
    /// Route `action` to the matching operation.
    ///
    /// Returns `None` for operations without a result, a JSON boolean for
    /// `checkUserMappingExists`, and a JSON string (or `None`) for
    /// `getSubjectFromUserMapping`.
    pub async fn call(&mut self, action: &str, args: &ActionArgs) -> Result<Option<Value>, CoreError> {
        let action: Action = action.parse()?;
        let provider_name = arg(args, arg_names::PROVIDER_NAME);
        let user_id = arg(args, arg_names::USER_ID);

        tracing::debug!(action = action.name(), provider_name, user_id, "Dispatching action");

        match action {
            Action::InsertLog => {
                self.insert_log(
                    provider_name,
                    user_id,
                    arg(args, arg_names::LOG_ID),
                    arg(args, arg_names::MESSAGE),
                )
                .await?;
                Ok(None)
            }
            Action::CheckUserMappingExists => {
                let exists = self.check_user_mapping_exists(provider_name, user_id).await?;
                Ok(Some(Value::Bool(exists)))
            }
            Action::UpdateMappingLoginDetails => {
                self.update_mapping_login_details(provider_name, user_id).await?;
                Ok(None)
            }
            Action::GetSubjectFromUserMapping => Ok(self
                .get_subject_from_user_mapping(provider_name, user_id)
                .await?
                .map(Value::String)),
        }
    }
}
