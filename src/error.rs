use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::{ResourceType, ScopeField, SectionRef};

/// Failure reported by an override store (network, server, or backend)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("override '{0}' not found")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        current_commit_id: Option<String>,
    },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A required scope field left empty at save time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_scope(field: ScopeField) -> Self {
        Self::new(field.field_name(), format!("{} is required", field.field_name()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverrideError {
    #[error("{requested} cannot be edited while {held} has unsaved changes")]
    ExclusivityViolation {
        held: SectionRef,
        requested: SectionRef,
    },

    #[error("validation failed: {}", .errors.iter().map(|e| &e.message).join("; "))]
    Validation { errors: Vec<FieldError> },

    #[error("git details incomplete: missing {}", .missing.join(", "))]
    GitDetailsIncomplete { missing: Vec<&'static str> },

    #[error("{message}")]
    RemoteCallFailure {
        message: String,
        /// Commit the server holds when the failure was a git conflict
        conflict_commit_id: Option<String>,
    },

    #[error("unexpected server response: {0}")]
    ReconciliationFailure(String),

    #[error("you do not have permission to edit this {0}")]
    PermissionDenied(ResourceType),

    #[error("save or discard {0} before changing the list")]
    UnsavedChanges(SectionRef),

    #[error("{0} not found")]
    SectionNotFound(SectionRef),

    #[error("row {row} not found in {section}")]
    RowNotFound { section: SectionRef, row: usize },
}

impl OverrideError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        OverrideError::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Routes a store failure through the single user-facing formatter
    pub fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Malformed(detail) => OverrideError::ReconciliationFailure(detail),
            StoreError::Conflict {
                ref current_commit_id,
                ..
            } => OverrideError::RemoteCallFailure {
                conflict_commit_id: current_commit_id.clone(),
                message: format_error_message(&err),
            },
            other => OverrideError::RemoteCallFailure {
                message: format_error_message(&other),
                conflict_commit_id: None,
            },
        }
    }

    /// Recovered locally rather than shown as an error
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            OverrideError::ExclusivityViolation { .. } | OverrideError::UnsavedChanges(_)
        )
    }

    /// Text the rendering layer shows for this failure
    pub fn user_message(&self) -> String {
        match self {
            OverrideError::ReconciliationFailure(_) => {
                "Something went wrong while refreshing overrides. Please reload the list."
                    .to_string()
            }
            OverrideError::ExclusivityViolation { .. } => {
                "Please save or discard the override currently being edited first.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Turns a store failure into the message shown to the user; raw transport
/// text never reaches the notice.
pub fn format_error_message(err: &StoreError) -> String {
    match err {
        StoreError::Transport(_) => {
            "Unable to reach the override service. Check your connection and try again."
                .to_string()
        }
        StoreError::NotFound(identifier) => {
            format!("Override '{}' no longer exists. Reload the list.", identifier)
        }
        StoreError::InvalidRequest(message) => message.clone(),
        StoreError::Conflict {
            message,
            current_commit_id,
        } => match current_commit_id {
            Some(commit) => format!(
                "{}. The file changed remotely (commit {}); resolve the conflict and save again.",
                message.trim_end_matches('.'),
                short_commit(commit)
            ),
            None => message.clone(),
        },
        StoreError::Server { status, message } if message.trim().is_empty() => {
            format!("The override service failed with status {}.", status)
        }
        StoreError::Server { message, .. } => message.clone(),
        StoreError::Malformed(_) => "Received an unexpected response from the server.".to_string(),
    }
}

fn short_commit(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}
