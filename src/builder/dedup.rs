//! Shared "already seen" predicate over original ids.
//!
//! Every lane consults it on every `add_node`, so marking must be an
//! atomic check-and-set: of any number of concurrent calls for one id,
//! exactly one observes it as new.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::collections::{lock, AtomicBitSet};

/// Largest id bound served by a bit set (512 MiB of bits).
const MAX_BITSET_CAPACITY: u64 = 1 << 32;

const SHARD_COUNT: usize = 16;

pub enum SeenIds {
    /// Dense bit set over `0..=max_original_id`.
    Bounded(AtomicBitSet),
    /// Id bound unknown or too large for a bit set.
    Sharded(Box<[Mutex<HashSet<u64>>]>),
}

impl SeenIds {
    /// Predicate for ids up to `max_original_id`, when known. Ids above
    /// the bound must be rejected by the caller.
    pub fn new(max_original_id: Option<u64>) -> Self {
        match max_original_id {
            Some(max) if max < MAX_BITSET_CAPACITY => SeenIds::Bounded(AtomicBitSet::new(max + 1)),
            _ => SeenIds::Sharded((0..SHARD_COUNT).map(|_| Mutex::new(HashSet::new())).collect()),
        }
    }

    /// Mark `original_id` as seen. Returns true on first sight.
    pub fn mark(&self, original_id: u64) -> bool {
        match self {
            SeenIds::Bounded(bits) => !bits.get_and_set(original_id),
            SeenIds::Sharded(shards) => lock(&shards[shard_of(original_id)]).insert(original_id),
        }
    }

    pub fn contains(&self, original_id: u64) -> bool {
        match self {
            SeenIds::Bounded(bits) => bits.get(original_id),
            SeenIds::Sharded(shards) => lock(&shards[shard_of(original_id)]).contains(&original_id),
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            SeenIds::Bounded(bits) => bits.cardinality(),
            SeenIds::Sharded(shards) => shards.iter().map(|s| lock(s).len() as u64).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[inline]
fn shard_of(id: u64) -> usize {
    // Fibonacci hashing; the top bits pick the shard.
    (id.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 60) as usize % SHARD_COUNT
}
