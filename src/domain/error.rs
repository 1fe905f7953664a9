use thiserror::Error;

use super::storage::StorageError;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Missing identity: {kind} has no ID")]
    MissingIdentity { kind: &'static str },

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("Timed out after {timeout_ms}ms while trying to {operation}")]
    Timeout { operation: String, timeout_ms: u128 },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn field_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn missing_identity(kind: &'static str) -> Self {
        Self::MissingIdentity { kind }
    }

    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis(),
        }
    }

    /// True for failures the caller caused (bad input or unknown identity)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Validation { .. }
                | Self::InvalidId { .. }
                | Self::MissingIdentity { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("user does not exist");
        assert_eq!(error.to_string(), "Not found: user does not exist");
    }

    #[test]
    fn test_validation_error_keeps_field() {
        let error = DomainError::field_validation("email", "email is required");
        assert_eq!(error.to_string(), "Validation error: email is required");

        match error {
            DomainError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("email")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_storage_error_wraps_context() {
        let error = DomainError::storage(
            "failed to create user",
            StorageError::transport("put", "user:1", "connection refused"),
        );

        assert_eq!(
            error.to_string(),
            "failed to create user: transport error during put of 'user:1': connection refused"
        );
        assert!(std::error::Error::source(&error).is_some());
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_timeout_error() {
        let error = DomainError::timeout("get user", std::time::Duration::from_secs(10));
        assert_eq!(error.to_string(), "Timed out after 10000ms while trying to get user");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DomainError::missing_identity("user").is_client_error());
        assert!(DomainError::invalid_id("bad").is_client_error());
        assert!(DomainError::not_found("x").is_client_error());
    }
}
