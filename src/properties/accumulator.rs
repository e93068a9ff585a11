//! Per-key property accumulators.
//!
//! During import values are written by original id into a sparse array,
//! from any lane. `build` consumes that array exactly once: its pages are
//! drained by `concurrency` tasks on the import pool, each value is
//! looked up in the id map, and non-default values of known nodes are
//! written by mapped id into a second sparse array.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::collections::sparse_array::PAGE_SIZE;
use crate::collections::{DrainingBatch, SparseArrayBuilder};
use crate::error::{GraphError, Result};
use crate::executor::ImportPool;
use crate::idmap::{PartialIdMap, NOT_FOUND};
use crate::properties::kind::{
    DoubleArrayKind, DoubleKind, FloatArrayKind, LongArrayKind, LongKind, PropertyKind,
};
use crate::properties::max::RunningMax;
use crate::properties::store::{NodePropertyValues, TypedPropertyValues};
use crate::values::{DefaultValue, PropertyValue, ValueType};

// ── Typed accumulator ──────────────────────────────────────────────

pub struct TypedAccumulator<K: PropertyKind> {
    key: String,
    declared_default: DefaultValue,
    default_value: K::Value,
    values: SparseArrayBuilder<K::Value>,
    max: K::Max,
}

impl<K: PropertyKind> TypedAccumulator<K> {
    /// Fails if `declared_default` cannot be converted to this kind.
    pub fn new(key: impl Into<String>, declared_default: DefaultValue) -> Result<Self> {
        let key = key.into();
        let default_value = K::default_of(&key, &declared_default)?;
        Ok(Self {
            values: SparseArrayBuilder::new(default_value.clone()),
            key,
            declared_default,
            default_value,
            max: K::Max::default(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn declared_default(&self) -> &DefaultValue {
        &self.declared_default
    }

    pub fn default_value(&self) -> &K::Value {
        &self.default_value
    }

    pub fn set(&self, original_id: u64, value: K::Value) {
        self.max.update(&value);
        self.values.set(original_id, value);
    }

    /// Convert `value` to this kind, then `set` it.
    pub fn set_value(&self, original_id: u64, value: &PropertyValue) -> Result<()> {
        let value = K::convert(&self.key, value)?;
        self.set(original_id, value);
        Ok(())
    }

    pub fn max_value(&self) -> Option<K::Value> {
        self.max.get()
    }

    /// Remap into a store of `size` nodes. Only original ids in
    /// `[0, highest_original_id]` are considered.
    pub fn build(
        self,
        size: u64,
        id_map: &dyn PartialIdMap,
        highest_original_id: u64,
        pool: &ImportPool,
    ) -> Result<TypedPropertyValues<K>> {
        let TypedAccumulator {
            key,
            default_value,
            values,
            max,
            ..
        } = self;

        let pages = values.build().drain();
        let mapped = SparseArrayBuilder::new(default_value.clone());
        let survivors = AtomicU64::new(0);
        let tasks = pool.concurrency().value();

        pool.install(|| {
            (0..tasks).into_par_iter().try_for_each(|_| -> Result<()> {
                let mut batch = DrainingBatch::new();
                let mut kept = 0u64;
                while pages.next_batch(&mut batch) {
                    let offset = batch.offset();
                    if offset > highest_original_id {
                        continue;
                    }
                    let end = (highest_original_id - offset + 1).min(PAGE_SIZE as u64) as usize;
                    for (slot_idx, slot) in batch.page_mut()[..end].iter_mut().enumerate() {
                        if K::default_equal(slot, &default_value) {
                            continue;
                        }
                        let mapped_id = id_map.to_mapped_node_id(offset + slot_idx as u64);
                        if mapped_id == NOT_FOUND {
                            continue;
                        }
                        if mapped_id >= size {
                            return Err(GraphError::MappedIdOutOfRange {
                                mapped: mapped_id,
                                node_count: size,
                            });
                        }
                        mapped.set(mapped_id, std::mem::replace(slot, default_value.clone()));
                        kept += 1;
                    }
                }
                survivors.fetch_add(kept, Ordering::Relaxed);
                Ok(())
            })
        })?;

        tracing::debug!(
            key = %key,
            survivors = survivors.load(Ordering::Relaxed),
            "Remapped property"
        );
        Ok(TypedPropertyValues::new(mapped.build(), size, max.get()))
    }
}

// ── Type-erased accumulator ────────────────────────────────────────

/// What the shared context stores per property key.
pub enum PropertyAccumulator {
    Long(TypedAccumulator<LongKind>),
    Double(TypedAccumulator<DoubleKind>),
    LongArray(TypedAccumulator<LongArrayKind>),
    FloatArray(TypedAccumulator<FloatArrayKind>),
    DoubleArray(TypedAccumulator<DoubleArrayKind>),
}

impl PropertyAccumulator {
    /// Accumulator of `value_type` for `key`. Strings are not storable.
    pub fn new(key: &str, value_type: ValueType, default_value: DefaultValue) -> Result<Self> {
        Ok(match value_type {
            ValueType::Long => PropertyAccumulator::Long(TypedAccumulator::new(key, default_value)?),
            ValueType::Double => {
                PropertyAccumulator::Double(TypedAccumulator::new(key, default_value)?)
            }
            ValueType::LongArray => {
                PropertyAccumulator::LongArray(TypedAccumulator::new(key, default_value)?)
            }
            ValueType::FloatArray => {
                PropertyAccumulator::FloatArray(TypedAccumulator::new(key, default_value)?)
            }
            ValueType::DoubleArray => {
                PropertyAccumulator::DoubleArray(TypedAccumulator::new(key, default_value)?)
            }
            ValueType::String => {
                return Err(GraphError::UnsupportedValueType {
                    key: key.to_string(),
                    actual: value_type,
                })
            }
        })
    }

    pub fn key(&self) -> &str {
        match self {
            PropertyAccumulator::Long(a) => a.key(),
            PropertyAccumulator::Double(a) => a.key(),
            PropertyAccumulator::LongArray(a) => a.key(),
            PropertyAccumulator::FloatArray(a) => a.key(),
            PropertyAccumulator::DoubleArray(a) => a.key(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyAccumulator::Long(_) => ValueType::Long,
            PropertyAccumulator::Double(_) => ValueType::Double,
            PropertyAccumulator::LongArray(_) => ValueType::LongArray,
            PropertyAccumulator::FloatArray(_) => ValueType::FloatArray,
            PropertyAccumulator::DoubleArray(_) => ValueType::DoubleArray,
        }
    }

    pub fn declared_default(&self) -> &DefaultValue {
        match self {
            PropertyAccumulator::Long(a) => a.declared_default(),
            PropertyAccumulator::Double(a) => a.declared_default(),
            PropertyAccumulator::LongArray(a) => a.declared_default(),
            PropertyAccumulator::FloatArray(a) => a.declared_default(),
            PropertyAccumulator::DoubleArray(a) => a.declared_default(),
        }
    }

    pub fn set_value(&self, original_id: u64, value: &PropertyValue) -> Result<()> {
        match self {
            PropertyAccumulator::Long(a) => a.set_value(original_id, value),
            PropertyAccumulator::Double(a) => a.set_value(original_id, value),
            PropertyAccumulator::LongArray(a) => a.set_value(original_id, value),
            PropertyAccumulator::FloatArray(a) => a.set_value(original_id, value),
            PropertyAccumulator::DoubleArray(a) => a.set_value(original_id, value),
        }
    }

    pub fn build(
        self,
        size: u64,
        id_map: &dyn PartialIdMap,
        highest_original_id: u64,
        pool: &ImportPool,
    ) -> Result<NodePropertyValues> {
        Ok(match self {
            PropertyAccumulator::Long(a) => {
                LongKind::into_node_values(a.build(size, id_map, highest_original_id, pool)?)
            }
            PropertyAccumulator::Double(a) => {
                DoubleKind::into_node_values(a.build(size, id_map, highest_original_id, pool)?)
            }
            PropertyAccumulator::LongArray(a) => {
                LongArrayKind::into_node_values(a.build(size, id_map, highest_original_id, pool)?)
            }
            PropertyAccumulator::FloatArray(a) => {
                FloatArrayKind::into_node_values(a.build(size, id_map, highest_original_id, pool)?)
            }
            PropertyAccumulator::DoubleArray(a) => {
                DoubleArrayKind::into_node_values(a.build(size, id_map, highest_original_id, pool)?)
            }
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::sparse_array::PAGE_SHIFT;
    use crate::config::Concurrency;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Id map backed by an explicit original → mapped table.
    struct FixedIdMap(HashMap<u64, u64>);

    impl PartialIdMap for FixedIdMap {
        fn to_mapped_node_id(&self, original_id: u64) -> u64 {
            self.0.get(&original_id).copied().unwrap_or(NOT_FOUND)
        }

        fn root_node_count(&self) -> Option<u64> {
            Some(self.0.len() as u64)
        }
    }

    fn id_map(pairs: &[(u64, u64)]) -> FixedIdMap {
        FixedIdMap(pairs.iter().copied().collect())
    }

    fn pool(threads: usize) -> ImportPool {
        ImportPool::new(Concurrency::new(threads).unwrap()).unwrap()
    }

    #[test]
    fn test_last_value_survives_when_non_default() {
        let acc = TypedAccumulator::<DoubleKind>::new("score", DefaultValue::of(0.0)).unwrap();
        acc.set(5, 0.0);
        acc.set(5, 3.5);

        let store = acc.build(3, &id_map(&[(5, 2)]), 5, &pool(2)).unwrap();
        assert_eq!(*store.value_at(2), 3.5);
        assert_eq!(*store.value_at(0), 0.0);
        assert_eq!(store.node_count(), 3);
    }

    #[test]
    fn test_nan_is_not_the_reported_maximum() {
        let acc = TypedAccumulator::<DoubleKind>::new("score", DefaultValue::of(0.0)).unwrap();
        acc.set(7, f64::NAN);
        acc.set(7, 1.0);

        let store = acc.build(1, &id_map(&[(7, 0)]), 7, &pool(1)).unwrap();
        assert_eq!(store.max_value(), Some(1.0));
    }

    #[test]
    fn test_default_equal_values_are_not_stored() {
        let acc = TypedAccumulator::<DoubleKind>::new("score", DefaultValue::of(0.0)).unwrap();
        acc.set(1, 0.0);
        acc.set(2, -0.0);

        let store = acc.build(2, &id_map(&[(1, 0), (2, 1)]), 2, &pool(2)).unwrap();
        assert_eq!(store.value_at(1).to_bits(), (-0.0f64).to_bits());
        assert!(!store.is_empty(), "-0.0 differs from a 0.0 default");
        assert_eq!(store.max_value(), Some(0.0));
    }

    #[test]
    fn test_unmapped_ids_are_dropped_and_max_absent_without_survivors() {
        let acc = TypedAccumulator::<LongKind>::new("age", DefaultValue::DEFAULT).unwrap();
        acc.set(10, 99);

        let store = acc.build(1, &id_map(&[(11, 0)]), 11, &pool(2)).unwrap();
        assert!(store.is_empty());
        assert_eq!(*store.value_at(0), i64::MIN);
        assert_eq!(store.max_value(), None);
    }

    #[test]
    fn test_values_above_highest_original_id_are_ignored() {
        let acc = TypedAccumulator::<LongKind>::new("age", DefaultValue::DEFAULT).unwrap();
        acc.set(3, 1);
        acc.set(100, 2);

        let store = acc.build(2, &id_map(&[(3, 0), (100, 1)]), 50, &pool(2)).unwrap();
        assert_eq!(*store.value_at(0), 1);
        assert_eq!(*store.value_at(1), i64::MIN);
    }

    #[test]
    fn test_mapped_id_outside_node_count_fails() {
        let acc = TypedAccumulator::<LongKind>::new("age", DefaultValue::DEFAULT).unwrap();
        acc.set(1, 5);
        let err = acc.build(1, &id_map(&[(1, 4)]), 1, &pool(2)).err().unwrap();
        assert!(matches!(err, GraphError::MappedIdOutOfRange { mapped: 4, node_count: 1 }));
    }

    #[test]
    fn test_parallel_remap_over_many_pages() {
        let acc = Arc::new(TypedAccumulator::<LongKind>::new("v", DefaultValue::of(0i64)).unwrap());
        let pages = 64u64;
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    for page in (t..pages).step_by(4) {
                        acc.set(page << PAGE_SHIFT, page as i64 + 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Reverse the order: original page p maps to pages - 1 - p.
        let pairs: Vec<(u64, u64)> = (0..pages).map(|p| (p << PAGE_SHIFT, pages - 1 - p)).collect();
        let acc = Arc::try_unwrap(acc).ok().unwrap();
        let highest = (pages - 1) << PAGE_SHIFT;
        let store = acc.build(pages, &id_map(&pairs), highest, &pool(4)).unwrap();

        for p in 0..pages {
            assert_eq!(*store.value_at(pages - 1 - p), p as i64 + 1);
        }
        assert_eq!(store.max_value(), Some(pages as i64));
    }

    #[test]
    fn test_array_accumulator_skips_null_default() {
        let acc = TypedAccumulator::<LongArrayKind>::new("tags", DefaultValue::DEFAULT).unwrap();
        acc.set_value(1, &PropertyValue::LongArray(vec![1, 2])).unwrap();
        acc.set(2, None);

        let store = acc.build(2, &id_map(&[(1, 0), (2, 1)]), 2, &pool(2)).unwrap();
        assert_eq!(store.value_at(0).as_deref(), Some(&[1, 2][..]));
        assert!(store.value_at(1).is_none());
    }

    #[test]
    fn test_set_value_reports_conversion_errors() {
        let acc = PropertyAccumulator::new("age", ValueType::Long, DefaultValue::DEFAULT).unwrap();
        let err = acc.set_value(1, &PropertyValue::from("thirty")).unwrap_err();
        match err {
            GraphError::TypeConversion { key, expected, actual } => {
                assert_eq!(key, "age");
                assert_eq!(expected, ValueType::Long);
                assert_eq!(actual, ValueType::String);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_string_accumulators_are_rejected() {
        let err = PropertyAccumulator::new("name", ValueType::String, DefaultValue::DEFAULT)
            .err()
            .unwrap();
        assert_eq!(err.code(), "UNSUPPORTED_VALUE_TYPE");
    }

    #[test]
    fn test_declared_default_of_wrong_kind_is_rejected() {
        let err = PropertyAccumulator::new("age", ValueType::Long, DefaultValue::of(vec![1i64]))
            .err()
            .unwrap();
        assert_eq!(err.code(), "TYPE_CONVERSION");
    }

    #[test]
    fn test_type_erased_build_keeps_kind() {
        let acc = PropertyAccumulator::new("w", ValueType::FloatArray, DefaultValue::DEFAULT).unwrap();
        acc.set_value(0, &PropertyValue::DoubleArray(vec![0.5])).unwrap();
        assert_eq!(acc.value_type(), ValueType::FloatArray);
        assert_eq!(acc.key(), "w");

        let store = acc.build(1, &id_map(&[(0, 0)]), 0, &pool(1)).unwrap();
        assert_eq!(store.value_type(), ValueType::FloatArray);
        assert_eq!(store.float_array_value(0).as_deref(), Some(&[0.5f32][..]));
    }
}
