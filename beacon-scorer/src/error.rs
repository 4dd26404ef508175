//! Errors raised by the ranking, recording, and learning operations.
#![forbid(unsafe_code)]

use beacon_core::StoreError;
use thiserror::Error;

/// Errors surfaced to callers of the engine's operations.
///
/// Scoring itself never fails: every scorer is total over its inputs, so
/// there is no computation variant.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller identity was missing or blank.
    #[error("caller identity is missing")]
    Authentication,
    /// A referenced entity does not exist.
    #[error("{entity} {id} was not found")]
    NotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// Identity that was requested.
        id: String,
    },
    /// An input field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// A storage collaborator failed; the operation was aborted.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn profile_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "profile",
            id: id.to_owned(),
        }
    }
}

/// Require a non-blank caller identity.
pub(crate) fn authenticated(actor: &str) -> Result<&str, EngineError> {
    let trimmed = actor.trim();
    if trimmed.is_empty() {
        Err(EngineError::Authentication)
    } else {
        Ok(trimmed)
    }
}
