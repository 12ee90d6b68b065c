//! CLI error types
//!
//! Every CLI error ends the process with a non-zero exit code after an
//! error response has been written.

use std::fmt;
use std::io;

use crate::pipeline::PipelineError;
use crate::session::DatabaseError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, malformed or invalid
    ConfigError,
    /// stdin/stdout failure or malformed JSON
    IoError,
    /// Request is well-formed JSON but not a valid aggregate request
    InvalidRequest,
    /// Collection data file is unusable
    DataError,
    /// Command could not be built
    PipelineRejected,
    /// Database rejected or failed the command
    CommandFailed,
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DOCAGG_CLI_CONFIG_ERROR",
            Self::IoError => "DOCAGG_CLI_IO_ERROR",
            Self::InvalidRequest => "DOCAGG_CLI_INVALID_REQUEST",
            Self::DataError => "DOCAGG_CLI_DATA_ERROR",
            Self::PipelineRejected => "DOCAGG_CLI_PIPELINE_REJECTED",
            Self::CommandFailed => "DOCAGG_CLI_COMMAND_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    pub fn data_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::DataError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self::new(CliErrorCode::PipelineRejected, e.to_string())
    }
}

impl From<DatabaseError> for CliError {
    fn from(e: DatabaseError) -> Self {
        Self::new(
            CliErrorCode::CommandFailed,
            format!("{}: {}", e.code(), e),
        )
    }
}

pub type CliResult<T> = Result<T, CliError>;
