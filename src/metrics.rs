//! Gate metrics
//!
//! Lock-free counters of access decisions, exposed as a JSON snapshot on
//! `/api/stats`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Decision counters shared by all request handlers
pub struct GateMetrics {
    start_time: Instant,
    granted: AtomicU64,
    replayed: AtomicU64,
    denied: AtomicU64,
    conflicts: AtomicU64,
    contention_failures: AtomicU64,
    missing_after_grant: AtomicU64,
}

/// Serializable view of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    /// Fresh grants that consumed a quota slot
    pub granted: u64,
    /// Free replays of already-accessed items
    pub replayed: u64,
    pub denied: u64,
    /// Conditional writes lost to a concurrent writer
    pub conflicts: u64,
    pub contention_failures: u64,
    /// Grants whose content document no longer exists
    pub missing_after_grant: u64,
}

impl Default for GateMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GateMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            granted: AtomicU64::new(0),
            replayed: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),
            contention_failures: AtomicU64::new(0),
            missing_after_grant: AtomicU64::new(0),
        }
    }

    pub fn record_grant(&self) {
        self.granted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_replay(&self) {
        self.replayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_denial(&self) {
        self.denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_contention_failure(&self) {
        self.contention_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_missing_after_grant(&self) {
        self.missing_after_grant.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            granted: self.granted.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            contention_failures: self.contention_failures.load(Ordering::Relaxed),
            missing_after_grant: self.missing_after_grant.load(Ordering::Relaxed),
        }
    }
}
