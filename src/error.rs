use std::fmt;

use serde::Serialize;
use ts_rs::TS;

/// Structured error type for the timeline core. Replaces stringly-typed errors
/// so the frontend can match on error codes and display appropriate UI.
///
/// None of these are fatal: every failure degrades to "edit not applied,
/// user informed" and leaves layout state untouched.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "code", content = "detail")]
#[ts(export)]
pub enum TimelineError {
    /// A host (IPC) call failed. Logged, never retried automatically.
    Host { message: String },
    /// A response arrived after its context changed and was discarded.
    Stale { what: String },
    NotFound { what: String },
    InvalidIndex { what: String, index: usize },
    NoSequence,
    ValidationError { message: String },
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::Host { message } => write!(f, "Host error: {message}"),
            TimelineError::Stale { what } => write!(f, "Stale response discarded: {what}"),
            TimelineError::NotFound { what } => write!(f, "{what} not found"),
            TimelineError::InvalidIndex { what, index } => {
                write!(f, "Invalid {what} index: {index}")
            }
            TimelineError::NoSequence => write!(f, "No sequence loaded"),
            TimelineError::ValidationError { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for TimelineError {}

impl From<String> for TimelineError {
    fn from(s: String) -> Self {
        TimelineError::ValidationError { message: s }
    }
}

impl From<&str> for TimelineError {
    fn from(s: &str) -> Self {
        TimelineError::ValidationError {
            message: s.to_string(),
        }
    }
}
