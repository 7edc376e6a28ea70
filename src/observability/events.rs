//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration & inputs
    /// Planner configuration loaded
    ConfigLoaded,
    /// Reference dataset loaded into the in-memory store
    DatasetLoaded,

    // Planning
    /// Request planned
    QueryPlanned,
    /// Request rejected by the planner
    QueryRejected,

    // Execution
    /// Result cursor opened over a plan
    CursorOpened,
    /// Calls already emitted by an earlier batch were suppressed
    DuplicatesSuppressed,
    /// Cursor exhausted
    CursorExhausted,
    /// Cursor closed by the caller before exhaustion
    CursorClosed,
    /// Physical execution failed
    ExecutionFailed,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DatasetLoaded => "DATASET_LOADED",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::CursorOpened => "CURSOR_OPENED",
            Event::DuplicatesSuppressed => "DUPLICATES_SUPPRESSED",
            Event::CursorExhausted => "CURSOR_EXHAUSTED",
            Event::CursorClosed => "CURSOR_CLOSED",
            Event::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    /// True for events reporting a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Event::ExecutionFailed)
    }

    /// True for a rejected request
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::QueryRejected)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
