//! Observability subsystem
//!
//! Structured JSON logging of replication lifecycle events.
//!
//! # Usage
//!
//! ```ignore
//! use formrepl::observability::{log_event_with_fields, Event, Logger};
//!
//! log_event_with_fields(Event::CallbackRegistered, &[("session", "…")]);
//! Logger::warn("DIGEST_REJECTED", &[("source", "callback")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

fn severity_of(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
