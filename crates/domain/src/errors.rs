//! Error types used throughout the session lifecycle

use authsession_common::{ErrorClassification, ErrorSeverity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for authsession
///
/// Each variant carries the human-readable message that ends up in
/// `SessionState::error` or the controller snapshot; see
/// [`SessionError::user_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SessionError {
    /// Malformed token bundle (for example no parseable expiration date).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or empty client configuration or refresh token.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authorize or refresh rejected by the identity provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Malformed identity token.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Key-value store I/O failure.
    #[error("Cache error: {0}")]
    Cache(String),

    /// In-app browser unavailable or failed to open.
    #[error("Browser error: {0}")]
    Browser(String),
}

impl SessionError {
    /// Message without the category prefix, suitable for display.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::Config(msg)
            | Self::Provider(msg)
            | Self::Decode(msg)
            | Self::Cache(msg)
            | Self::Browser(msg) => msg,
        }
    }

    /// Short category label used as a structured logging field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Provider(_) => "provider",
            Self::Decode(_) => "decode",
            Self::Cache(_) => "cache",
            Self::Browser(_) => "browser",
        }
    }
}

impl ErrorClassification for SessionError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Cache(_) | Self::Browser(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Provider(_) => ErrorSeverity::Error,
            Self::Decode(_) | Self::Cache(_) | Self::Browser(_) => ErrorSeverity::Warning,
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Cache(format!("serialization failed: {err}"))
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    //! Unit tests for errors.
    use super::*;

    #[test]
    fn user_message_strips_category() {
        let err = SessionError::Provider("access_denied".into());
        assert_eq!(err.to_string(), "Provider error: access_denied");
        assert_eq!(err.user_message(), "access_denied");
        assert_eq!(err.kind(), "provider");
    }

    #[test]
    fn classification_marks_io_failures_retryable() {
        assert!(SessionError::Cache("disk".into()).is_retryable());
        assert!(SessionError::Browser("closed".into()).is_retryable());
        assert!(!SessionError::Validation("bad".into()).is_retryable());
        assert!(!SessionError::Decode("bad".into()).is_retryable());
        assert_eq!(SessionError::Config("x".into()).severity(), ErrorSeverity::Error);
        assert!(!SessionError::Config("x".into()).is_critical());
        assert_eq!(SessionError::Provider("x".into()).retry_after(), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(SessionError::Decode("segment".into())).unwrap();
        assert_eq!(json["type"], "Decode");
        assert_eq!(json["message"], "segment");
    }
}
