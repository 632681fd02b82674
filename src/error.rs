use thiserror::Error;

use crate::model::SchemaError;

/// Substring the server puts in its error message when a command's
/// `expectedVersion` is stale.
pub const VERSION_MISMATCH_MESSAGE: &str = "expected version doesn't match current version";

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Raw server data failed schema validation or deserialization
    #[error("{0}")]
    Validation(String),

    /// A precondition on the entity's current state does not hold
    #[error("{0}")]
    InvalidState(String),

    /// An enumerated value or argument was not recognised
    #[error("{0}")]
    InvalidArgument(String),

    /// A referenced nested record or lookup target is absent
    #[error("{0}")]
    NotFound(String),

    /// The server rejected a command because the entity changed underneath it
    #[error("{0}")]
    ConcurrencyConflict(String),

    /// Network or server failure not classified any further
    #[error("{0}")]
    Transport(String),
}

impl DomainError {
    pub fn invalid_object(detail: impl std::fmt::Display) -> Self {
        DomainError::Validation(format!("invalid object from server: {}", detail))
    }

    pub fn entity_is_new() -> Self {
        DomainError::InvalidState("entity is new".to_string())
    }

    /// Classify a server error message, picking out version conflicts.
    pub fn from_server_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(VERSION_MISMATCH_MESSAGE) {
            DomainError::ConcurrencyConflict(message)
        } else {
            DomainError::Transport(message)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::ConcurrencyConflict(_))
    }

    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(m)
            | DomainError::InvalidState(m)
            | DomainError::InvalidArgument(m)
            | DomainError::NotFound(m)
            | DomainError::ConcurrencyConflict(m)
            | DomainError::Transport(m) => m,
        }
    }
}

impl From<SchemaError> for DomainError {
    fn from(err: SchemaError) -> Self {
        DomainError::invalid_object(err)
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        DomainError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_detected_by_message() {
        let err = DomainError::from_server_message(
            "InvalidVersion: centre version mismatch: expected version doesn't match current version",
        );
        assert!(err.is_conflict());

        let err = DomainError::from_server_message("centre with name already exists");
        assert!(!err.is_conflict());
        assert_eq!(err, DomainError::Transport("centre with name already exists".to_string()));
    }

    #[test]
    fn test_schema_errors_are_wrapped_as_validation() {
        let err: DomainError = SchemaError::MissingRequired(vec!["name".to_string()]).into();
        assert_eq!(
            err.message(),
            "invalid object from server: Missing required property: name"
        );
    }
}
