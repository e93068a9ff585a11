//! Import metrics
//!
//! Lightweight, thread-safe counters shared by every worker of one
//! `NodesBuilder`. Recording is a handful of relaxed atomic adds per
//! flush, so contention is bounded by flush frequency, not by the
//! `add_node` call rate.
//!
//! # Example
//!
//! ```
//! use rfdb_import::metrics::ImportMetrics;
//!
//! let metrics = ImportMetrics::new();
//! metrics.record_flush(250, 10_000, 30_000);
//!
//! let stats = metrics.snapshot();
//! assert_eq!(stats.flush_count, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Thread-safe import metrics collector.
///
/// Create one per import job and share it (wrapped in `Arc`) with all
/// local workers.
pub struct ImportMetrics {
    // ========================================================================
    // Flush Metrics
    // ========================================================================
    /// Number of successful flushes
    flush_count: AtomicU64,

    /// Nodes registered by successful flushes
    flushed_nodes: AtomicU64,

    /// Property values pushed into accumulators
    written_properties: AtomicU64,

    /// Total time spent in flushes (microseconds)
    flush_total_us: AtomicU64,

    /// Flushes that returned an error
    failed_flushes: AtomicU64,

    // ========================================================================
    // Ingestion Metrics
    // ========================================================================
    /// `add_node` calls skipped because the id was already seen
    deduplicated_ids: AtomicU64,

    /// Accumulators created lazily on first sight of a property key
    accumulators_created: AtomicU64,

    /// When metrics collection started
    started_at: Instant,
}

/// Point-in-time copy of all counters. Plain values, serializable for
/// reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Number of successful flushes
    pub flush_count: u64,
    /// Nodes registered by successful flushes
    pub flushed_nodes: u64,
    /// Property values pushed into accumulators
    pub written_properties: u64,
    /// Average flush duration in microseconds
    pub flush_avg_us: u64,
    /// Flushes that returned an error
    pub failed_flushes: u64,
    /// Skipped duplicate ids
    pub deduplicated_ids: u64,
    /// Accumulators created during import
    pub accumulators_created: u64,
    /// Seconds since the collector was created
    pub elapsed_secs: u64,
}

impl ImportMetrics {
    pub fn new() -> Self {
        Self {
            flush_count: AtomicU64::new(0),
            flushed_nodes: AtomicU64::new(0),
            written_properties: AtomicU64::new(0),
            flush_total_us: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
            deduplicated_ids: AtomicU64::new(0),
            accumulators_created: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a successful flush.
    pub fn record_flush(&self, duration_us: u64, nodes: u64, properties: u64) {
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        self.flush_total_us.fetch_add(duration_us, Ordering::Relaxed);
        self.flushed_nodes.fetch_add(nodes, Ordering::Relaxed);
        self.written_properties.fetch_add(properties, Ordering::Relaxed);
    }

    pub fn record_failed_flush(&self) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deduplicated(&self) {
        self.deduplicated_ids.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accumulator_created(&self) {
        self.accumulators_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushed_nodes(&self) -> u64 {
        self.flushed_nodes.load(Ordering::Relaxed)
    }

    pub fn written_properties(&self) -> u64 {
        self.written_properties.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let flush_count = self.flush_count.load(Ordering::Relaxed);
        let flush_total_us = self.flush_total_us.load(Ordering::Relaxed);
        let flush_avg_us = if flush_count > 0 {
            flush_total_us / flush_count
        } else {
            0
        };

        MetricsSnapshot {
            flush_count,
            flushed_nodes: self.flushed_nodes(),
            written_properties: self.written_properties(),
            flush_avg_us,
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            deduplicated_ids: self.deduplicated_ids.load(Ordering::Relaxed),
            accumulators_created: self.accumulators_created.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs(),
        }
    }
}

impl Default for ImportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ImportMetrics::new().snapshot();
        assert_eq!(snapshot.flush_count, 0);
        assert_eq!(snapshot.flush_avg_us, 0);
        assert_eq!(snapshot.flushed_nodes, 0);
    }

    #[test]
    fn test_flush_recording() {
        let metrics = ImportMetrics::new();
        metrics.record_flush(100, 3, 6);
        metrics.record_flush(300, 2, 0);
        metrics.record_failed_flush();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.flush_count, 2);
        assert_eq!(snapshot.flush_avg_us, 200);
        assert_eq!(snapshot.flushed_nodes, 5);
        assert_eq!(snapshot.written_properties, 6);
        assert_eq!(snapshot.failed_flushes, 1);
    }

    #[test]
    fn test_thread_safety() {
        let metrics = Arc::new(ImportMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        metrics.record_flush(1, 10, 1);
                        metrics.record_deduplicated();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.flush_count, 8_000);
        assert_eq!(snapshot.flushed_nodes, 80_000);
        assert_eq!(snapshot.deduplicated_ids, 8_000);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let metrics = ImportMetrics::new();
        metrics.record_accumulator_created();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["accumulators_created"], 1);
    }
}
