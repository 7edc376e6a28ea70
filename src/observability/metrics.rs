//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of planning and execution counters
///
/// Relaxed ordering: counters are independent and only read for reporting.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    plans_accepted: AtomicU64,
    plans_rejected: AtomicU64,
    batches_executed: AtomicU64,
    rows_read: AtomicU64,
    calls_emitted: AtomicU64,
    duplicates_suppressed: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_plans_accepted(&self) {
        self.plans_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_executed(&self) {
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_read(&self, rows: u64) {
        self.rows_read.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn increment_calls_emitted(&self) {
        self.calls_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicates_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_accepted: self.plans_accepted.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            batches_executed: self.batches_executed.load(Ordering::Relaxed),
            rows_read: self.rows_read.load(Ordering::Relaxed),
            calls_emitted: self.calls_emitted.load(Ordering::Relaxed),
            duplicates_suppressed: self.duplicates_suppressed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_accepted: u64,
    pub plans_rejected: u64,
    pub batches_executed: u64,
    pub rows_read: u64,
    pub calls_emitted: u64,
    pub duplicates_suppressed: u64,
}
