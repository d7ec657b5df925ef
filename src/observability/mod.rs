//! Observability for the query and pagination path
//!
//! Structured JSON logs of typed lifecycle events.
//!
//! # Usage
//!
//! ```ignore
//! use peds_client::observability::{Event, Logger};
//!
//! Logger::info(Event::ConfigLoaded.as_str(), &[("page_size", "20")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log a lifecycle event with fields.
///
/// Failure events are logged at WARN, everything else at INFO.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
