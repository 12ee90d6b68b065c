//! # Database Errors
//!
//! Errors raised by a [`Session`](super::Session) while running a command.
//! The aggregate layer passes them through unchanged.

use thiserror::Error;

/// Result type for session operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database execution failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatabaseError {
    /// Connection-level failure before a reply was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// No server could serve the requested consistency
    #[error("No server available: {0}")]
    Unavailable(String),

    /// The server rejected or failed the command
    #[error("Command failed with code {code}: {message}")]
    CommandFailed { code: i32, message: String },
}

impl DatabaseError {
    /// Create a command failure
    pub fn command_failed(code: i32, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code,
            message: message.into(),
        }
    }

    /// Stable string code for responses and logs
    pub fn code(&self) -> &'static str {
        match self {
            DatabaseError::Transport(_) => "DOCAGG_DB_TRANSPORT",
            DatabaseError::Unavailable(_) => "DOCAGG_DB_UNAVAILABLE",
            DatabaseError::CommandFailed { .. } => "DOCAGG_DB_COMMAND_FAILED",
        }
    }

    /// Whether issuing the same command again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DatabaseError::Transport(_) | DatabaseError::Unavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DatabaseError::command_failed(15955, "a group specification must include an _id");
        assert_eq!(
            err.to_string(),
            "Command failed with code 15955: a group specification must include an _id"
        );
        assert_eq!(err.code(), "DOCAGG_DB_COMMAND_FAILED");
    }

    #[test]
    fn test_retryable() {
        assert!(DatabaseError::Transport("reset".into()).is_retryable());
        assert!(DatabaseError::Unavailable("no primary".into()).is_retryable());
        assert!(!DatabaseError::command_failed(1, "bad").is_retryable());
    }
}
