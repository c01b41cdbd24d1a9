// src/error.rs
// Error taxonomy for the triage agent

use thiserror::Error;

/// Main error type for the fixfast library
#[derive(Error, Debug)]
pub enum FixFastError {
    /// Tool arguments failed schema or type checks
    #[error("invalid tool input: {0}")]
    Validation(String),

    /// The model asked for a tool that is not registered
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Provider unreachable, non-2xx response, or unparseable envelope
    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("model call timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Convenience type alias for Result using FixFastError
pub type Result<T> = std::result::Result<T, FixFastError>;

impl FixFastError {
    /// Errors caused by the request itself (bad arguments, unknown tool)
    /// rather than by a fault inside the tool.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownTool(_))
    }

    /// Message text handed to the model inside an error-flagged tool result
    pub fn to_tool_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Display
    // ============================================================================

    #[test]
    fn test_validation_error() {
        let err = FixFastError::Validation("missing field `description`".to_string());
        assert!(err.to_string().contains("invalid tool input"));
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_unknown_tool_error() {
        let err = FixFastError::UnknownTool("frobnicate".to_string());
        assert_eq!(err.to_string(), "unknown tool: frobnicate");
    }

    #[test]
    fn test_transport_error() {
        let err = FixFastError::Transport("API error 500".to_string());
        assert!(err.to_string().contains("transport error"));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_timeout_error() {
        let err = FixFastError::Timeout(30);
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: FixFastError = json_err.into();
        assert!(err.to_string().contains("JSON"));
    }

    // ============================================================================
    // Recoverability
    // ============================================================================

    #[test]
    fn test_tool_errors_are_recoverable() {
        assert!(FixFastError::Validation("x".into()).is_recoverable());
        assert!(FixFastError::UnknownTool("x".into()).is_recoverable());
    }

    #[test]
    fn test_run_errors_are_fatal() {
        assert!(!FixFastError::Transport("x".into()).is_recoverable());
        assert!(!FixFastError::Configuration("x".into()).is_recoverable());
        assert!(!FixFastError::Cancelled.is_recoverable());
        assert!(!FixFastError::Timeout(1).is_recoverable());
    }
}
