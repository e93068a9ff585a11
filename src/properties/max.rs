//! Running maximum over every value ever set on an accumulator.
//!
//! Updates take a fast path when the current maximum already covers the
//! candidate. Otherwise longs use `fetch_max` and doubles retry a
//! compare-exchange on the bit pattern until the candidate is adopted or
//! beaten. The maximum never decreases.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

pub trait RunningMax<V>: Default + Send + Sync {
    fn update(&self, value: &V);

    /// Current maximum; `None` if nothing was ever tracked.
    fn get(&self) -> Option<V>;
}

// ── Long ───────────────────────────────────────────────────────────

pub struct LongMax {
    current: AtomicI64,
    seen: AtomicBool,
}

impl Default for LongMax {
    fn default() -> Self {
        Self {
            current: AtomicI64::new(i64::MIN),
            seen: AtomicBool::new(false),
        }
    }
}

impl RunningMax<i64> for LongMax {
    fn update(&self, value: &i64) {
        let candidate = *value;
        if !self.seen.load(Ordering::Relaxed) {
            self.seen.store(true, Ordering::Relaxed);
        }
        if self.current.load(Ordering::Acquire) >= candidate {
            return;
        }
        self.current.fetch_max(candidate, Ordering::AcqRel);
    }

    fn get(&self) -> Option<i64> {
        self.seen
            .load(Ordering::Acquire)
            .then(|| self.current.load(Ordering::Acquire))
    }
}

// ── Double ─────────────────────────────────────────────────────────

/// Holds the bit pattern of the maximum. Starts at NaN, meaning "no real
/// value yet": any non-NaN candidate beats it, a NaN candidate never
/// replaces a real maximum.
pub struct DoubleMax {
    bits: AtomicU64,
    seen: AtomicBool,
}

impl Default for DoubleMax {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(f64::NAN.to_bits()),
            seen: AtomicBool::new(false),
        }
    }
}

impl RunningMax<f64> for DoubleMax {
    fn update(&self, value: &f64) {
        let candidate = *value;
        if !self.seen.load(Ordering::Relaxed) {
            self.seen.store(true, Ordering::Relaxed);
        }

        // Fast path: NaN compares false both ways, so a NaN candidate
        // falls through here and is rejected below.
        let mut current_bits = self.bits.load(Ordering::Acquire);
        if f64::from_bits(current_bits) >= candidate {
            return;
        }

        loop {
            let current = f64::from_bits(current_bits);
            let adopt = candidate > current || (current.is_nan() && !candidate.is_nan());
            if !adopt {
                return;
            }
            match self.bits.compare_exchange_weak(
                current_bits,
                candidate.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current_bits = actual,
            }
        }
    }

    fn get(&self) -> Option<f64> {
        self.seen
            .load(Ordering::Acquire)
            .then(|| f64::from_bits(self.bits.load(Ordering::Acquire)))
    }
}

// ── Arrays ─────────────────────────────────────────────────────────

/// Array kinds track no maximum.
#[derive(Default)]
pub struct NoMax;

impl<V> RunningMax<V> for NoMax {
    fn update(&self, _value: &V) {}

    fn get(&self) -> Option<V> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_long_max_is_monotonic() {
        let max = LongMax::default();
        assert_eq!(max.get(), None);
        max.update(&5);
        max.update(&-3);
        assert_eq!(max.get(), Some(5));
        max.update(&i64::MIN);
        assert_eq!(max.get(), Some(5));
    }

    #[test]
    fn test_long_max_of_only_min_values() {
        let max = LongMax::default();
        max.update(&i64::MIN);
        assert_eq!(max.get(), Some(i64::MIN));
    }

    #[test]
    fn test_nan_never_becomes_the_maximum() {
        let max = DoubleMax::default();
        max.update(&f64::NAN);
        max.update(&1.0);
        assert_eq!(max.get(), Some(1.0));

        max.update(&f64::NAN);
        assert_eq!(max.get(), Some(1.0));
    }

    #[test]
    fn test_only_nan_values_report_nan() {
        let max = DoubleMax::default();
        max.update(&f64::NAN);
        assert!(max.get().unwrap().is_nan());
    }

    #[test]
    fn test_double_max_handles_negative_values_and_infinities() {
        let max = DoubleMax::default();
        max.update(&-7.5);
        assert_eq!(max.get(), Some(-7.5));
        max.update(&f64::NEG_INFINITY);
        assert_eq!(max.get(), Some(-7.5));
        max.update(&f64::INFINITY);
        assert_eq!(max.get(), Some(f64::INFINITY));
    }

    #[test]
    fn test_concurrent_double_updates() {
        let max = Arc::new(DoubleMax::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let max = Arc::clone(&max);
                std::thread::spawn(move || {
                    for i in 0..10_000 {
                        max.update(&((i * 8 + t) as f64));
                        max.update(&f64::NAN);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max.get(), Some(79_999.0));
    }
}
