//! Property tests: accumulator remap keeps exactly the non-default
//! values of mapped nodes, and the running maximum covers every value
//! ever set.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use proptest::prelude::*;
use rfdb_import::properties::{DoubleKind, LongKind, TypedAccumulator};
use rfdb_import::{
    Concurrency, DefaultValue, ImportPool, NodeInput, NodesBuilder, NodesBuilderConfig,
    PartialIdMap, PropertyValues, NOT_FOUND,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct MapIdMap(HashMap<u64, u64>);

impl PartialIdMap for MapIdMap {
    fn to_mapped_node_id(&self, original_id: u64) -> u64 {
        self.0.get(&original_id).copied().unwrap_or(NOT_FOUND)
    }

    fn root_node_count(&self) -> Option<u64> {
        Some(self.0.len() as u64)
    }
}

/// Maps every original id not divisible by 3, in descending order, so
/// mapped order differs from original order.
fn id_map_for(originals: &BTreeSet<u64>) -> MapIdMap {
    MapIdMap(
        originals
            .iter()
            .rev()
            .filter(|&&id| id % 3 != 0)
            .enumerate()
            .map(|(mapped, &original)| (original, mapped as u64))
            .collect(),
    )
}

fn same_double(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

fn double_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(0.0),
        Just(-0.0),
        -1.0e6..1.0e6f64,
    ]
}

fn pool() -> ImportPool {
    ImportPool::new(Concurrency::new(4).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Mapped ids read the last value set for their original id; unmapped
    /// originals and default values leave no trace.
    #[test]
    fn long_remap_keeps_last_non_default_value(
        writes in prop::collection::vec((0u64..200_000, -20i64..20), 0..400)
    ) {
        let acc = TypedAccumulator::<LongKind>::new("v", DefaultValue::of(0i64)).unwrap();
        let mut last = BTreeMap::new();
        for &(original, value) in &writes {
            acc.set(original, value);
            last.insert(original, value);
        }

        let originals: BTreeSet<u64> = last.keys().copied().collect();
        let id_map = id_map_for(&originals);
        let size = id_map.0.len() as u64;
        let store = acc.build(size, &id_map, 200_000, &pool()).unwrap();

        prop_assert_eq!(store.node_count(), size);
        let mut survivors = 0;
        for (&original, &value) in &last {
            let mapped = id_map.to_mapped_node_id(original);
            if mapped == NOT_FOUND {
                continue;
            }
            prop_assert_eq!(*store.value_at(mapped), value);
            if value != 0 {
                survivors += 1;
            }
        }
        prop_assert_eq!(store.is_empty(), survivors == 0);

        let expected_max = writes.iter().map(|&(_, v)| v).max();
        if survivors == 0 {
            prop_assert_eq!(store.max_value(), None);
        } else {
            prop_assert_eq!(store.max_value(), expected_max);
        }
    }

    /// Doubles compare by bit pattern: NaN survives a 0.0 default, -0.0
    /// does too, and NaN never becomes the maximum while a real value
    /// was set.
    #[test]
    fn double_remap_uses_full_precision_equality(
        writes in prop::collection::vec((0u64..50_000, double_value()), 1..300)
    ) {
        let acc = TypedAccumulator::<DoubleKind>::new("v", DefaultValue::of(0.0)).unwrap();
        let mut last = BTreeMap::new();
        for &(original, value) in &writes {
            acc.set(original, value);
            last.insert(original, value);
        }

        let reals: Vec<f64> = writes.iter().map(|&(_, v)| v).filter(|v| !v.is_nan()).collect();
        match acc.max_value() {
            Some(max) if reals.is_empty() => prop_assert!(max.is_nan()),
            Some(max) => {
                let expected = reals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(max == expected, "max {} != {}", max, expected);
            }
            None => prop_assert!(false, "max missing after writes"),
        }

        let originals: BTreeSet<u64> = last.keys().copied().collect();
        let id_map = id_map_for(&originals);
        let store = acc.build(id_map.0.len() as u64, &id_map, 50_000, &pool()).unwrap();

        for (&original, &value) in &last {
            let mapped = id_map.to_mapped_node_id(original);
            if mapped != NOT_FOUND {
                prop_assert!(same_double(*store.value_at(mapped), value));
            }
        }
        let survivors = last
            .iter()
            .filter(|&(&o, &v)| o % 3 != 0 && !same_double(v, 0.0))
            .count();
        prop_assert_eq!(store.is_empty(), survivors == 0);
    }

    /// With dedup on, the node count equals the number of distinct ids no
    /// matter how they are split across producers.
    #[test]
    fn dedup_counts_distinct_ids(
        ids in prop::collection::vec(0u64..5_000, 1..600),
        lanes in 1usize..4,
    ) {
        let builder = NodesBuilder::new(NodesBuilderConfig {
            concurrency: Concurrency::new(lanes).unwrap(),
            batch_capacity: 16,
            deduplicate_ids: true,
            max_original_id: Some(5_000),
            ..Default::default()
        })
        .unwrap();

        let chunk = ids.len().div_ceil(lanes);
        std::thread::scope(|s| {
            for part in ids.chunks(chunk) {
                let builder = &builder;
                s.spawn(move || {
                    for &id in part {
                        let props = PropertyValues::new().with("id", id as i64);
                        builder.add_node(id, NodeInput::from(props)).unwrap();
                    }
                });
            }
        });

        let distinct: BTreeSet<u64> = ids.iter().copied().collect();
        let nodes = builder.build().unwrap();
        prop_assert_eq!(nodes.node_count(), distinct.len() as u64);

        let values = nodes.property("id").unwrap();
        for &id in &distinct {
            let mapped = nodes.id_map().to_mapped_node_id(id);
            prop_assert_eq!(values.long_value(mapped), Some(id as i64));
        }
    }
}
