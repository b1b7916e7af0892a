//! Error taxonomy for the auth flow.
//!
//! Everything here is recoverable: the worst case is the user starting over
//! from phone entry. `Validation` errors are local and never reach the
//! network; `Transient` is retryable by the user (never automatically, to
//! avoid duplicate code issuance).

use std::fmt;

use thiserror::Error;

/// Fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Phone,
    Code,
    Name,
    Email,
    Location,
    Password,
    ConfirmPassword,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Phone => "phone",
            Field::Code => "code",
            Field::Name => "name",
            Field::Email => "email",
            Field::Location => "location",
            Field::Password => "password",
            Field::ConfirmPassword => "confirm_password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the auth flow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// Local pre-submission validation failure.
    #[error("{message}")]
    Validation { field: Field, message: String },

    #[error("OTP has expired, request a new code")]
    OtpExpired,

    #[error("Incorrect OTP code")]
    OtpMismatch,

    #[error("Resend limit reached")]
    ResendLimitExceeded,

    /// Network or backend failure.
    #[error("Service unavailable: {0}")]
    Transient(String),

    #[error("You must accept Terms & Privacy")]
    ConsentRequired,
}

impl AuthError {
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Whether the user can meaningfully retry the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_carries_field_and_message() {
        let err = AuthError::validation(Field::Phone, "Phone number must be 10 digits");
        assert_eq!(err.to_string(), "Phone number must be 10 digits");
        match err {
            AuthError::Validation { field, .. } => assert_eq!(field, Field::Phone),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(AuthError::Transient("boom".into()).is_retryable());
        assert!(!AuthError::OtpExpired.is_retryable());
        assert!(!AuthError::ResendLimitExceeded.is_retryable());
    }
}
