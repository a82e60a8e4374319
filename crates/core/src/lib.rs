//! Shared primitives for all Rust crates in jitgate.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across jitgate crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Create operation targeted a resource that already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Write operation raced with a newer version of the resource.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic-concurrency retries were used up without a successful write.
    #[error("conflict retries exhausted after {attempts} attempt(s): {message}")]
    ConflictExhausted {
        /// Number of write attempts made.
        attempts: u32,
        /// Description of the last conflict.
        message: String,
    },

    /// A remote collaborator (issue tracker, cluster API) failed or was unreachable.
    #[error("external service error{}: {message}", status_suffix(.status))]
    ExternalService {
        /// Remote HTTP status when a response was received.
        status: Option<u16>,
        /// Remote body or transport error detail.
        message: String,
    },

    /// Operator configuration snapshot is unavailable or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {code})"))
        .unwrap_or_default()
}

impl AppError {
    /// Returns true for [`AppError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for [`AppError::AlreadyExists`].
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Returns true for [`AppError::Conflict`].
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn external_service_error_includes_status_when_present() {
        let with_status = AppError::ExternalService {
            status: Some(502),
            message: "bad gateway".to_owned(),
        };
        let without_status = AppError::ExternalService {
            status: None,
            message: "connection refused".to_owned(),
        };

        assert_eq!(
            with_status.to_string(),
            "external service error (status 502): bad gateway"
        );
        assert_eq!(
            without_status.to_string(),
            "external service error: connection refused"
        );
    }

    #[test]
    fn error_predicates_match_variants() {
        assert!(AppError::NotFound("x".to_owned()).is_not_found());
        assert!(AppError::AlreadyExists("x".to_owned()).is_already_exists());
        assert!(AppError::Conflict("x".to_owned()).is_conflict());
        assert!(!AppError::Internal("x".to_owned()).is_conflict());
    }
}
