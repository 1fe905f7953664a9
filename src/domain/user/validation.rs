//! User validation utilities

use thiserror::Error;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("invalid user ID")]
    InvalidId,

    #[error("name is required")]
    EmptyName,

    #[error("email is required")]
    EmptyEmail,

    #[error("email not valid: '{0}'")]
    InvalidEmail(String),
}

impl UserValidationError {
    /// Name of the offending input field
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidId => "id",
            Self::EmptyName => "name",
            Self::EmptyEmail | Self::InvalidEmail(_) => "email",
        }
    }
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        match err {
            UserValidationError::InvalidId => DomainError::invalid_id(err.to_string()),
            other => DomainError::field_validation(other.field(), other.to_string()),
        }
    }
}

/// Validate a user ID taken from a request path
///
/// IDs are service-generated UUIDs, so anything else cannot exist.
pub fn validate_user_id(id: &str) -> Result<(), UserValidationError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| UserValidationError::InvalidId)
}

/// Validate the caller-supplied fields of a user
///
/// Rules:
/// - Name cannot be empty
/// - Email cannot be empty and must be a syntactically valid address
pub fn validate_user_fields(name: &str, email: &str) -> Result<(), UserValidationError> {
    if name.trim().is_empty() {
        return Err(UserValidationError::EmptyName);
    }

    if email.trim().is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }

    if !email.validate_email() {
        return Err(UserValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}
