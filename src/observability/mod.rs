//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Lifecycle event tracing
//! - Ingestion counters
//!
//! Observability is read-only: nothing here feeds back into ingestion or
//! query results.
//!
//! ```ignore
//! use brickdb::observability::{Logger, Event, log_event_with_fields};
//!
//! Logger::info("ROWS_LOADED", &[("rows", "42")]);
//! log_event_with_fields(Event::GenerationCommitted, &[("version", "v1")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{min_severity, set_min_severity, Logger, Severity};
pub use metrics::{IngestMetrics, MetricsSnapshot};
pub use scope::ObservationScope;

use std::sync::OnceLock;

/// Process-wide counters shared by the pipeline and the query layer
pub fn metrics() -> &'static IngestMetrics {
    static METRICS: OnceLock<IngestMetrics> = OnceLock::new();
    METRICS.get_or_init(IngestMetrics::new)
}

fn event_severity(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event_severity(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_severity_mapping() {
        assert_eq!(event_severity(Event::StorageCorruption), Severity::Fatal);
        assert_eq!(event_severity(Event::RowRejected), Severity::Warn);
        assert_eq!(event_severity(Event::GenerationCommitted), Severity::Info);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ConfigLoaded, &[("data_dir", "/tmp/test")]);
        log_event(Event::StorageOpened);
    }

    #[test]
    fn test_metrics_singleton() {
        let before = metrics().snapshot().lookups;
        metrics().increment_lookups();
        assert!(metrics().snapshot().lookups > before);
    }
}
