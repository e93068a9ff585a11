//! Fixed-capacity bit set with atomic test-and-set.

use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: u64 = 64;

/// Lock-free bit set sized once at construction.
pub struct AtomicBitSet {
    words: Box<[AtomicU64]>,
    capacity: u64,
}

impl AtomicBitSet {
    /// Bit set able to hold indices `0..capacity`.
    pub fn new(capacity: u64) -> Self {
        let word_count = capacity.div_ceil(WORD_BITS) as usize;
        Self {
            words: (0..word_count).map(|_| AtomicU64::new(0)).collect(),
            capacity,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Set the bit and return its previous state. Exactly one of any
    /// number of concurrent callers for the same index observes `false`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= capacity`.
    pub fn get_and_set(&self, index: u64) -> bool {
        assert!(index < self.capacity, "index {index} out of bounds for {}", self.capacity);
        let mask = 1u64 << (index % WORD_BITS);
        let word = &self.words[(index / WORD_BITS) as usize];
        word.fetch_or(mask, Ordering::AcqRel) & mask != 0
    }

    pub fn get(&self, index: u64) -> bool {
        if index >= self.capacity {
            return false;
        }
        let mask = 1u64 << (index % WORD_BITS);
        self.words[(index / WORD_BITS) as usize].load(Ordering::Acquire) & mask != 0
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as u64)
            .sum()
    }
}
