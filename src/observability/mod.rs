//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Monotonic metrics
//! - Begin/complete scopes around physical executions
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on planning: the planner never logs
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use exprcall::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::QueryPlanned, &[("aggregation", "true")]);
//!
//! let scope = ObservationScope::with_fields("BATCH", &[("offset", "0")]);
//! // ... execute ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

fn severity_of(event: Event) -> Severity {
    if event.is_error() {
        Severity::Error
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log an event
pub fn log_event(event: Event) {
    Logger::log(severity_of(event), event.as_str(), &[]);
}

/// Log an event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_of(event), event.as_str(), fields);
}
