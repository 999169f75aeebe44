//! Error types for the SEO assistant
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for SEO assistant operations
///
/// Covers credential failures, lookups of missing or foreign records,
/// malformed caller input, generation failures, and storage problems.
#[derive(Error, Debug)]
pub enum SeoAssistantError {
    /// Missing, invalid or expired credential, or cross-user access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Signing key could not be found even after refreshing the key set
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    /// Referenced session, job or message does not exist for the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed caller input (empty message, oversized title, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generation capability failed or returned unusable content
    #[error("Generation error: {0}")]
    Generation(String),

    /// Generation call did not finish within the configured timeout
    #[error("Generation timed out after {seconds} seconds")]
    Timeout {
        /// Configured timeout that elapsed
        seconds: u64,
    },

    /// Illegal job status transition
    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the job was in
        from: String,
        /// Status that was requested
        to: String,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse error category used by the HTTP layer and job failure recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential or ownership failure
    Unauthorized,
    /// Missing record
    NotFound,
    /// Bad caller input
    Validation,
    /// Generation backend failure, including timeouts
    Generation,
    /// Anything else
    Internal,
}

impl SeoAssistantError {
    /// Returns the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) | Self::UnknownKey(_) => ErrorKind::Unauthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Generation(_) | Self::Timeout { .. } => ErrorKind::Generation,
            _ => ErrorKind::Internal,
        }
    }
}

/// Classifies an `anyhow::Error` by looking for a `SeoAssistantError` in its chain
///
/// Errors that carry no `SeoAssistantError` are `ErrorKind::Internal`.
pub fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SeoAssistantError>())
        .map(SeoAssistantError::kind)
        .unwrap_or(ErrorKind::Internal)
}

/// Result type alias for SEO assistant operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_unauthorized_error_display() {
        let error = SeoAssistantError::Unauthorized("token expired".to_string());
        assert_eq!(error.to_string(), "Unauthorized: token expired");
    }

    #[test]
    fn test_timeout_error_display() {
        let error = SeoAssistantError::Timeout { seconds: 30 };
        assert_eq!(error.to_string(), "Generation timed out after 30 seconds");
    }

    #[test]
    fn test_invalid_transition_display() {
        let error = SeoAssistantError::InvalidTransition {
            from: "completed".to_string(),
            to: "generating".to_string(),
        };
        assert!(error.to_string().contains("completed -> generating"));
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            SeoAssistantError::UnknownKey("kid".into()).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            SeoAssistantError::Timeout { seconds: 1 }.kind(),
            ErrorKind::Generation
        );
        assert_eq!(
            SeoAssistantError::Storage("locked".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_error_kind_through_context() {
        let result: Result<()> = Err(SeoAssistantError::NotFound("session".into()))
            .context("while loading history");
        let err = result.unwrap_err();
        assert_eq!(error_kind(&err), ErrorKind::NotFound);
    }

    #[test]
    fn test_error_kind_plain_anyhow_is_internal() {
        let err = anyhow::anyhow!("boom");
        assert_eq!(error_kind(&err), ErrorKind::Internal);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: SeoAssistantError = json_error.into();
        assert!(matches!(error, SeoAssistantError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeoAssistantError>();
    }
}
