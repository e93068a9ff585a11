//! System resource detection and adaptive import tuning.
//!
//! Detects available RAM and CPU cores, then computes the lane count and
//! batch capacity for an import on this host. Stateless: each call to
//! `ResourceManager::auto_tune()` detects the system again.

use sysinfo::{MemoryRefreshKind, RefreshKind, System};

use crate::config::{Concurrency, DEFAULT_BATCH_CAPACITY};

// ── Constants ───────────────────────────────────────────────────────

const GB: u64 = 1024 * 1024 * 1024;

/// Lane ceiling.
const MAX_CONCURRENCY: usize = 64;

const MEDIUM_BATCH_CAPACITY: usize = 50_000;
const LARGE_BATCH_CAPACITY: usize = 100_000;

// ── SystemResources ─────────────────────────────────────────────────

/// Snapshot of detected hardware resources.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total physical RAM in bytes.
    pub total_memory_bytes: u64,
    /// Available (re-usable) RAM in bytes.
    pub available_memory_bytes: u64,
    /// Logical CPU count.
    pub cpu_count: usize,
}

impl SystemResources {
    /// Probe the current system for RAM and CPU information.
    pub fn detect() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        sys.refresh_memory();

        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            cpu_count,
        }
    }

    /// Memory pressure indicator (0.0 = no pressure, 1.0 = critical).
    pub fn memory_pressure(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            return 1.0;
        }
        let ratio = self.available_memory_bytes as f64 / self.total_memory_bytes as f64;
        (1.0 - ratio).clamp(0.0, 1.0)
    }
}

// ── TuningProfile ───────────────────────────────────────────────────

/// Import parameters computed from system resources.
#[derive(Debug, Clone)]
pub struct TuningProfile {
    /// Worker lanes and remap fan-out.
    pub concurrency: Concurrency,
    /// Nodes staged per lane before a flush.
    pub batch_capacity: usize,
    /// Memory pressure at detection time (0.0 = no pressure, 1.0 = critical).
    pub memory_pressure: f64,
}

impl TuningProfile {
    /// Heuristics:
    /// - `concurrency`: `clamp(cpu_count, 1, 64)` if RAM >= 2 GB, else 1.
    /// - `batch_capacity`: available < 4 GB -> 10K, > 16 GB -> 100K, else 50K.
    pub fn from_resources(res: &SystemResources) -> Self {
        let lanes = if res.total_memory_bytes >= 2 * GB {
            res.cpu_count.clamp(1, MAX_CONCURRENCY)
        } else {
            1
        };
        let concurrency = Concurrency::new(lanes).unwrap_or(Concurrency::SINGLE);

        let available_gb = res.available_memory_bytes as f64 / GB as f64;
        let batch_capacity = if available_gb < 4.0 {
            DEFAULT_BATCH_CAPACITY
        } else if available_gb > 16.0 {
            LARGE_BATCH_CAPACITY
        } else {
            MEDIUM_BATCH_CAPACITY
        };

        Self {
            concurrency,
            batch_capacity,
            memory_pressure: res.memory_pressure(),
        }
    }
}

impl Default for TuningProfile {
    /// Conservative defaults suitable for tests and unknown environments.
    fn default() -> Self {
        Self {
            concurrency: Concurrency::default(),
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            memory_pressure: 0.0,
        }
    }
}

// ── ResourceManager ─────────────────────────────────────────────────

/// Stateless utility: detect system resources and compute tuning profile.
pub struct ResourceManager;

impl ResourceManager {
    /// Probe the system and return an adaptive tuning profile.
    pub fn auto_tune() -> TuningProfile {
        let resources = SystemResources::detect();
        let profile = TuningProfile::from_resources(&resources);
        tracing::debug!(
            cpus = resources.cpu_count,
            total_mb = resources.total_memory_bytes / (1024 * 1024),
            concurrency = profile.concurrency.value(),
            batch_capacity = profile.batch_capacity,
            "Import tuning profile"
        );
        profile
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build `SystemResources` with explicit values (bypasses detection).
    fn make_resources(total_gb: f64, available_gb: f64, cpus: usize) -> SystemResources {
        SystemResources {
            total_memory_bytes: (total_gb * GB as f64) as u64,
            available_memory_bytes: (available_gb * GB as f64) as u64,
            cpu_count: cpus,
        }
    }

    #[test]
    fn test_system_resources_detection() {
        let res = SystemResources::detect();
        assert!(res.total_memory_bytes > 0, "total memory must be positive");
        assert!(res.cpu_count >= 1, "cpu count must be at least 1");
    }

    #[test]
    fn test_low_memory_uses_single_lane() {
        let profile = TuningProfile::from_resources(&make_resources(1.0, 0.5, 8));
        assert_eq!(profile.concurrency.value(), 1);
        assert_eq!(profile.batch_capacity, DEFAULT_BATCH_CAPACITY);
    }

    #[test]
    fn test_medium_machine() {
        let profile = TuningProfile::from_resources(&make_resources(16.0, 8.0, 8));
        assert_eq!(profile.concurrency.value(), 8);
        assert_eq!(profile.batch_capacity, MEDIUM_BATCH_CAPACITY);
        assert!((profile.memory_pressure - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_large_machine_caps_lanes() {
        let profile = TuningProfile::from_resources(&make_resources(256.0, 200.0, 128));
        assert_eq!(profile.concurrency.value(), MAX_CONCURRENCY);
        assert_eq!(profile.batch_capacity, LARGE_BATCH_CAPACITY);
    }

    #[test]
    fn test_zero_total_memory_is_critical_pressure() {
        assert_eq!(make_resources(0.0, 0.0, 1).memory_pressure(), 1.0);
    }

    #[test]
    fn test_auto_tune_produces_valid_profile() {
        let profile = ResourceManager::auto_tune();
        assert!(profile.concurrency.value() >= 1);
        assert!(profile.batch_capacity > 0);
    }
}
