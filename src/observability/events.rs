//! Observable loader events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in the loader lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Planning
    /// Location resolved to a set of table paths
    LocationResolved,
    /// A location pattern matched nothing
    PatternNoMatch,
    /// A location match was not a table directory
    NotADirectory,
    /// Logical schema resolved
    SchemaResolved,
    /// Projection string planned from required fields
    ProjectionPlanned,
    /// Pushdown acknowledged
    ProjectionPushed,

    // Partition execution
    /// Partition reader opened over the task's input tables
    ReaderInitialized,
    /// Host-provided split reader bound
    ReaderBound,
    /// Reader positioned by seek key
    SeekComplete,
    /// Partition reached end of stream
    PartitionExhausted,
    /// Reader released
    ReaderClosed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::LocationResolved => "LOCATION_RESOLVED",
            Event::PatternNoMatch => "PATTERN_NO_MATCH",
            Event::NotADirectory => "NOT_A_DIRECTORY",
            Event::SchemaResolved => "SCHEMA_RESOLVED",
            Event::ProjectionPlanned => "PROJECTION_PLANNED",
            Event::ProjectionPushed => "PROJECTION_PUSHED",
            Event::ReaderInitialized => "READER_INITIALIZED",
            Event::ReaderBound => "READER_BOUND",
            Event::SeekComplete => "SEEK_COMPLETE",
            Event::PartitionExhausted => "PARTITION_EXHAUSTED",
            Event::ReaderClosed => "READER_CLOSED",
        }
    }

    /// Returns true if this event is reported as a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::PatternNoMatch | Event::NotADirectory)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
