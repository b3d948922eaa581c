//! CLI-specific error types

use std::fmt;
use std::io;

use crate::errors::LoaderError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Bad command-line input
    UsageError,
    /// stdout failure
    IoError,
    /// The loader rejected the request
    LoadFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UsageError => "TABLELOAD_CLI_USAGE_ERROR",
            Self::IoError => "TABLELOAD_CLI_IO_ERROR",
            Self::LoadFailed => "TABLELOAD_CLI_LOAD_FAILED",
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

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::UsageError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
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

impl From<LoaderError> for CliError {
    fn from(e: LoaderError) -> Self {
        Self::new(CliErrorCode::LoadFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_error_keeps_code_text() {
        let err: CliError = LoaderError::no_table_specified().into();
        assert_eq!(err.code(), &CliErrorCode::LoadFailed);
        assert!(err.to_string().contains("TABLELOAD_CONFIGURATION_ERROR"));
    }
}
