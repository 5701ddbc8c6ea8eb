//! Observable events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in brickdb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Storage
    /// Storage engine opened (and persisted generation reloaded, if any)
    StorageOpened,
    /// Scratch generation opened
    GenerationBegin,
    /// Generation committed and now served
    GenerationCommitted,
    /// Scratch generation abandoned before commit
    GenerationDiscarded,
    /// Previously served generation released by the engine
    GenerationRetired,
    /// Persisted generation file corrupt (FATAL)
    StorageCorruption,

    // Ingestion
    /// Rebuild skipped, version already served
    RebuildSkipped,
    /// A row was rejected
    RowRejected,
    /// Rebuild aborted: rejection rate above threshold
    IngestAborted,
    /// Rebuild cancelled by caller
    IngestCancelled,

    // Version tracking
    /// New dataset version recorded
    VersionRecorded,
}

impl Event {
    /// Returns the event name as it appears in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StorageOpened => "STORAGE_OPENED",
            Event::GenerationBegin => "GENERATION_BEGIN",
            Event::GenerationCommitted => "GENERATION_COMMITTED",
            Event::GenerationDiscarded => "GENERATION_DISCARDED",
            Event::GenerationRetired => "GENERATION_RETIRED",
            Event::StorageCorruption => "STORAGE_CORRUPTION",
            Event::RebuildSkipped => "REBUILD_SKIPPED",
            Event::RowRejected => "ROW_REJECTED",
            Event::IngestAborted => "INGEST_ABORTED",
            Event::IngestCancelled => "INGEST_CANCELLED",
            Event::VersionRecorded => "VERSION_RECORDED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StorageCorruption)
    }

    /// Returns true if this event indicates a degraded but recoverable condition
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::RowRejected
                | Event::IngestAborted
                | Event::IngestCancelled
                | Event::GenerationDiscarded
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        for event in [
            Event::GenerationCommitted,
            Event::RowRejected,
            Event::IngestAborted,
            Event::VersionRecorded,
        ] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::StorageCorruption.is_fatal());
        assert!(!Event::IngestAborted.is_fatal());
        assert!(Event::IngestAborted.is_warning());
    }
}
