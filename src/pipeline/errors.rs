//! Pipeline construction errors
//!
//! Error codes:
//! - DOCAGG_PIPELINE_INVALID_TARGET (REJECT)
//! - DOCAGG_PIPELINE_STAGE_CONFLICT (REJECT)

use std::fmt;

/// Severity levels for pipeline errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller input rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Pipeline-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorCode {
    /// Collection name missing or empty
    InvalidTarget,
    /// Grouping expression sets a key that another stage entry also sets
    StageConflict,
}

impl PipelineErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineErrorCode::InvalidTarget => "DOCAGG_PIPELINE_INVALID_TARGET",
            PipelineErrorCode::StageConflict => "DOCAGG_PIPELINE_STAGE_CONFLICT",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for PipelineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Pipeline error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    code: PipelineErrorCode,
    message: String,
    /// Offending stage key, if any
    key: Option<String>,
}

impl PipelineError {
    /// Create an invalid target error
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self {
            code: PipelineErrorCode::InvalidTarget,
            message: reason.into(),
            key: None,
        }
    }

    /// Create a stage key conflict error
    pub fn conflicting_stage_key(key: impl Into<String>) -> Self {
        let k = key.into();
        Self {
            code: PipelineErrorCode::StageConflict,
            message: format!(
                "Grouping expression sets '{}', which the criteria also set on the same stage",
                k
            ),
            key: Some(k),
        }
    }

    pub fn code(&self) -> PipelineErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the conflicting stage key, if applicable
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PipelineError {}

/// Result type for pipeline construction
pub type PipelineResult<T> = Result<T, PipelineError>;
