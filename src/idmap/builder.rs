//! Concurrent id map construction.
//!
//! Lanes reserve a dense range of mapped ids per flush with one
//! `fetch_add`, then write their original ids into that range. The
//! reverse direction (original → mapped) is computed once at build time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use roaring::RoaringTreemap;

use crate::collections::SparseArrayBuilder;
use crate::error::Result;
use crate::executor::ImportPool;
use crate::idmap::labels::LabelInformationBuilder;
use crate::idmap::{IdMap, NOT_FOUND};
use crate::labels::LabelRegistry;

/// The original → mapped direction is a paged array indexed by original
/// id: lookups are one page access, but every touched 4096-id range costs
/// a full page (32 KiB) however few of its ids are used. Inputs with ids
/// spread far apart pay up to one page per node.
pub struct IdMapBuilder {
    next_mapped_id: AtomicU64,
    highest_original_id: AtomicU64,
    mapped_to_original: SparseArrayBuilder<u64>,
    labels: LabelInformationBuilder,
}

impl IdMapBuilder {
    pub fn new(has_label_information: bool) -> Self {
        Self {
            next_mapped_id: AtomicU64::new(0),
            highest_original_id: AtomicU64::new(0),
            mapped_to_original: SparseArrayBuilder::new(NOT_FOUND),
            labels: LabelInformationBuilder::new(has_label_information),
        }
    }

    /// Reserve `len` consecutive mapped ids.
    pub fn allocate(&self, len: usize) -> IdMapAllocator<'_> {
        let start = self.next_mapped_id.fetch_add(len as u64, Ordering::AcqRel);
        IdMapAllocator {
            builder: self,
            start,
            len,
        }
    }

    /// Mapped ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next_mapped_id.load(Ordering::Acquire)
    }

    pub fn has_label_information(&self) -> bool {
        self.labels.is_enabled()
    }

    /// Freeze everything inserted so far into an `IdMap`.
    ///
    /// Every allocation must have been inserted; `build` is called after
    /// all lanes are closed. If an original id was inserted more than
    /// once, the highest mapped id (the last allocation) wins.
    pub fn build(&self, registry: &LabelRegistry, pool: &ImportPool) -> Result<IdMap> {
        let node_count = self.allocated();
        let mapped_to_original = self.mapped_to_original.take();
        let highest_original_id = self.highest_original_id.load(Ordering::Acquire);

        let original_to_mapped = SparseArrayBuilder::new(NOT_FOUND);
        pool.install(|| {
            (0..node_count).into_par_iter().for_each(|mapped| {
                let original = *mapped_to_original.get(mapped);
                if original == NOT_FOUND {
                    return;
                }
                original_to_mapped.update(original, |slot| {
                    if *slot == NOT_FOUND || *slot < mapped {
                        *slot = mapped;
                    }
                });
            });
        });

        Ok(IdMap {
            node_count,
            highest_original_id,
            mapped_to_original,
            original_to_mapped: original_to_mapped.build(),
            labels: self.labels.take(registry),
        })
    }
}

/// A reserved range `[start, start + len)` of mapped ids.
pub struct IdMapAllocator<'a> {
    builder: &'a IdMapBuilder,
    start: u64,
    len: usize,
}

impl IdMapAllocator<'_> {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write the originals of the reserved range, in order.
    pub fn insert(&self, original_ids: &[u64]) {
        debug_assert_eq!(original_ids.len(), self.len);
        let mut highest = 0;
        for (offset, &original) in original_ids.iter().enumerate() {
            self.builder
                .mapped_to_original
                .set(self.start + offset as u64, original);
            highest = highest.max(original);
        }
        if !original_ids.is_empty() {
            self.builder
                .highest_original_id
                .fetch_max(highest, Ordering::AcqRel);
        }
    }

    /// Record labels of the reserved range: `tokens[i]` are the global
    /// label tokens of the i-th node.
    pub fn insert_labels<'t>(&self, tokens: impl IntoIterator<Item = &'t [u32]>) {
        if !self.builder.labels.is_enabled() {
            return;
        }
        let mut batch: HashMap<u32, RoaringTreemap> = HashMap::new();
        for (offset, node_tokens) in tokens.into_iter().enumerate() {
            let mapped = self.start + offset as u64;
            for &token in node_tokens {
                batch.entry(token).or_default().insert(mapped);
            }
        }
        self.builder.labels.add_batch(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Concurrency;
    use crate::idmap::PartialIdMap;
    use crate::labels::NodeLabel;
    use std::sync::Arc;

    fn pool() -> ImportPool {
        ImportPool::new(Concurrency::new(2).unwrap()).unwrap()
    }

    #[test]
    fn test_allocations_are_disjoint_and_dense() {
        let builder = IdMapBuilder::new(false);
        let a = builder.allocate(3);
        let b = builder.allocate(2);
        assert_eq!((a.start(), a.len()), (0, 3));
        assert_eq!((b.start(), b.len()), (3, 2));
        a.insert(&[100, 5, 7_000_000_000]);
        b.insert(&[42, 6]);

        let id_map = builder.build(&LabelRegistry::new(), &pool()).unwrap();
        assert_eq!(id_map.node_count(), 5);
        assert_eq!(id_map.highest_original_id(), 7_000_000_000);
        assert_eq!(id_map.to_mapped_node_id(7_000_000_000), 2);
        assert_eq!(id_map.to_original_node_id(3), Some(42));
        assert_eq!(id_map.to_mapped_node_id(8), NOT_FOUND);
        assert_eq!(id_map.root_node_count(), Some(5));
    }

    #[test]
    fn test_reverse_map_allocates_one_page_per_touched_range() {
        let builder = IdMapBuilder::new(false);
        let page = crate::collections::sparse_array::PAGE_SIZE as u64;
        builder.allocate(4).insert(&[1, 2, 3 * page, 1_000 * page + 7]);
        let id_map = builder.build(&LabelRegistry::new(), &pool()).unwrap();
        assert_eq!(id_map.original_to_mapped.page_count(), 3);
        assert_eq!(id_map.to_mapped_node_id(1_000 * page + 7), 3);
        assert_eq!(id_map.to_mapped_node_id(1_000 * page + 8), NOT_FOUND);
    }

    #[test]
    fn test_duplicate_original_keeps_last_allocation() {
        let builder = IdMapBuilder::new(false);
        builder.allocate(2).insert(&[9, 9]);
        builder.allocate(1).insert(&[9]);
        let id_map = builder.build(&LabelRegistry::new(), &pool()).unwrap();
        assert_eq!(id_map.node_count(), 3);
        assert_eq!(id_map.to_mapped_node_id(9), 2);
    }

    #[test]
    fn test_concurrent_allocation_from_many_lanes() {
        let builder = Arc::new(IdMapBuilder::new(false));
        let handles: Vec<_> = (0..8u64)
            .map(|lane| {
                let builder = Arc::clone(&builder);
                std::thread::spawn(move || {
                    for batch in 0..50u64 {
                        let ids: Vec<u64> =
                            (0..10).map(|i| lane * 1_000_000 + batch * 10 + i).collect();
                        builder.allocate(ids.len()).insert(&ids);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let id_map = builder.build(&LabelRegistry::new(), &pool()).unwrap();
        assert_eq!(id_map.node_count(), 4_000);
        for mapped in 0..4_000 {
            let original = id_map.to_original_node_id(mapped).unwrap();
            assert_eq!(id_map.to_mapped_node_id(original), mapped);
        }
    }

    #[test]
    fn test_labels_follow_allocated_range() {
        let registry = LabelRegistry::new();
        let a = registry.get_or_register(&NodeLabel::new("A"));
        let b = registry.get_or_register(&NodeLabel::new("B"));

        let builder = IdMapBuilder::new(true);
        let alloc = builder.allocate(2);
        alloc.insert(&[10, 20]);
        alloc.insert_labels([&[a][..], &[a, b][..]]);

        let id_map = builder.build(&registry, &pool()).unwrap();
        let m20 = id_map.to_mapped_node_id(20);
        assert!(id_map.has_label(m20, &NodeLabel::new("B")));
        assert!(!id_map.has_label(id_map.to_mapped_node_id(10), &NodeLabel::new("B")));
        assert_eq!(id_map.node_count_for(&NodeLabel::new("A")), 2);
    }
}
