//! Observable events
//!
//! Every log line names one of these events. Events are explicit and typed.

use std::fmt;

/// Observable events in the query and pagination path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Query compilation
    /// Filter and sort compiled into a backend query
    QueryCompiled,
    /// Filter or sort rejected before any request
    QueryRejected,

    // Pagination
    /// Page request issued
    PageRequested,
    /// Page received from the backend
    PageReceived,
    /// Backend has no more records for the stream
    StreamExhausted,
    /// Stream yielded its configured limit
    StreamLimitReached,
    /// Backend error ended the stream
    StreamFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::QueryCompiled => "QUERY_COMPILED",
            Event::QueryRejected => "QUERY_REJECTED",

            Event::PageRequested => "PAGE_REQUESTED",
            Event::PageReceived => "PAGE_RECEIVED",
            Event::StreamExhausted => "STREAM_EXHAUSTED",
            Event::StreamLimitReached => "STREAM_LIMIT_REACHED",
            Event::StreamFailed => "STREAM_FAILED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::QueryRejected | Event::StreamFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
