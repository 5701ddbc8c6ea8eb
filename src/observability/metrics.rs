//! Ingestion counters
//!
//! - Counters only
//! - Monotonic increase for the life of the process
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide ingestion and query counters
///
/// Relaxed ordering throughout: counters are informational and never
/// drive control flow.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    rows_seen: AtomicU64,
    rows_accepted: AtomicU64,
    rows_rejected: AtomicU64,
    rebuilds_committed: AtomicU64,
    rebuilds_aborted: AtomicU64,
    rebuilds_skipped: AtomicU64,
    lookups: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_seen: u64,
    pub rows_accepted: u64,
    pub rows_rejected: u64,
    pub rebuilds_committed: u64,
    pub rebuilds_aborted: u64,
    pub rebuilds_skipped: u64,
    pub lookups: u64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rows_seen(&self, n: u64) {
        self.rows_seen.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_rows_accepted(&self, n: u64) {
        self.rows_accepted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_rows_rejected(&self, n: u64) {
        self.rows_rejected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn increment_committed(&self) {
        self.rebuilds_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_aborted(&self) {
        self.rebuilds_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_skipped(&self) {
        self.rebuilds_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_lookups(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a consistent-enough copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_seen: self.rows_seen.load(Ordering::Relaxed),
            rows_accepted: self.rows_accepted.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            rebuilds_committed: self.rebuilds_committed.load(Ordering::Relaxed),
            rebuilds_aborted: self.rebuilds_aborted.load(Ordering::Relaxed),
            rebuilds_skipped: self.rebuilds_skipped.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = IngestMetrics::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.rows_seen, 0);
        assert_eq!(snap.rebuilds_committed, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = IngestMetrics::new();
        metrics.add_rows_seen(10);
        metrics.add_rows_seen(5);
        metrics.add_rows_rejected(2);
        metrics.increment_committed();

        let snap = metrics.snapshot();
        assert_eq!(snap.rows_seen, 15);
        assert_eq!(snap.rows_rejected, 2);
        assert_eq!(snap.rebuilds_committed, 1);
    }
}
