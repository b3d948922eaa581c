//! Loader error types
//!
//! Error codes:
//! - TABLELOAD_CONFIGURATION_ERROR (ABORT)
//! - TABLELOAD_PLANNING_ERROR (ABORT)
//! - TABLELOAD_SCHEMA_UNION_ERROR (ABORT)
//! - TABLELOAD_PARSE_ERROR (ABORT)
//! - TABLELOAD_IO_ERROR (TASK_FAILURE)
//! - TABLELOAD_STATE_ERROR (TASK_FAILURE)
//!
//! Planning-time errors abort the coordinating process before any partition
//! is started. Per-partition errors fail only the task that raised them.

use std::fmt;
use std::io;

/// Severity levels for loader errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Coordinator aborts before distribution
    Abort,
    /// Only the owning partition task fails
    TaskFailure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Abort => write!(f, "ABORT"),
            Severity::TaskFailure => write!(f, "TASK_FAILURE"),
        }
    }
}

/// Loader error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderErrorCode {
    /// Invalid constructor argument, empty location set, unsorted table, bad sort column type
    ConfigurationError,
    /// Required field out of range, subfields on a non-map column
    PlanningError,
    /// Conflicting column type across unioned tables
    SchemaUnionError,
    /// Malformed projection or schema text
    ParseError,
    /// Storage I/O failure or interrupted read
    IoError,
    /// Operation invoked outside its valid lifecycle state
    StateError,
}

impl LoaderErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            LoaderErrorCode::ConfigurationError => "TABLELOAD_CONFIGURATION_ERROR",
            LoaderErrorCode::PlanningError => "TABLELOAD_PLANNING_ERROR",
            LoaderErrorCode::SchemaUnionError => "TABLELOAD_SCHEMA_UNION_ERROR",
            LoaderErrorCode::ParseError => "TABLELOAD_PARSE_ERROR",
            LoaderErrorCode::IoError => "TABLELOAD_IO_ERROR",
            LoaderErrorCode::StateError => "TABLELOAD_STATE_ERROR",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            LoaderErrorCode::IoError | LoaderErrorCode::StateError => Severity::TaskFailure,
            _ => Severity::Abort,
        }
    }
}

impl fmt::Display for LoaderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Loader error with code, message and optional context
#[derive(Debug)]
pub struct LoaderError {
    code: LoaderErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl LoaderError {
    fn new(code: LoaderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorCode::ConfigurationError, message)
    }

    /// Create the error raised when a location resolves to no table at all
    pub fn no_table_specified() -> Self {
        Self::configuration("no table specified")
    }

    /// Create a planning error
    pub fn planning(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorCode::PlanningError, message)
    }

    /// Create a schema union error for a column whose type differs between tables
    pub fn schema_union(column: &str, left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Self::new(
            LoaderErrorCode::SchemaUnionError,
            format!("Column '{}' has conflicting types", column),
        )
        .with_details(format!("{} vs {}", left, right))
    }

    /// Create a parse error at a character offset of the input text
    pub fn parse(message: impl Into<String>, input: &str, offset: usize) -> Self {
        Self::new(LoaderErrorCode::ParseError, message)
            .with_details(format!("offset {} in '{}'", offset, input))
    }

    /// Create a parse error without position context
    pub fn parse_plain(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorCode::ParseError, message)
    }

    /// Create an I/O error wrapping the underlying cause
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            source: Some(source),
            ..Self::new(LoaderErrorCode::IoError, message)
        }
    }

    /// Create an I/O error without a source
    pub fn io_no_source(message: impl Into<String>) -> Self {
        Self::new(LoaderErrorCode::IoError, message)
    }

    /// Create a lifecycle state error
    pub fn state(operation: &str, state: impl fmt::Display) -> Self {
        Self::new(
            LoaderErrorCode::StateError,
            format!("'{}' is not valid in state {}", operation, state),
        )
    }

    /// Attach a details string
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> LoaderErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error must abort planning
    pub fn aborts_planning(&self) -> bool {
        self.severity() == Severity::Abort
    }
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for LoaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;
