//! Immutable per-key property stores, indexed by mapped id.

use std::sync::Arc;

use crate::collections::SparseArray;
use crate::properties::kind::{
    DoubleArrayKind, DoubleKind, FloatArrayKind, LongArrayKind, LongKind, PropertyKind,
};
use crate::values::{PropertyValue, ValueType};

/// Values of one property key after remap. Unset mapped ids read as the
/// declared default.
pub struct TypedPropertyValues<K: PropertyKind> {
    values: SparseArray<K::Value>,
    node_count: u64,
    max_value: Option<K::Value>,
}

pub type LongPropertyValues = TypedPropertyValues<LongKind>;
pub type DoublePropertyValues = TypedPropertyValues<DoubleKind>;
pub type LongArrayPropertyValues = TypedPropertyValues<LongArrayKind>;
pub type FloatArrayPropertyValues = TypedPropertyValues<FloatArrayKind>;
pub type DoubleArrayPropertyValues = TypedPropertyValues<DoubleArrayKind>;

impl<K: PropertyKind> TypedPropertyValues<K> {
    /// `max_value` is dropped when no value survived the remap.
    pub(crate) fn new(values: SparseArray<K::Value>, node_count: u64, max_value: Option<K::Value>) -> Self {
        let max_value = if values.is_empty() { None } else { max_value };
        Self {
            values,
            node_count,
            max_value,
        }
    }

    pub fn value_at(&self, mapped_id: u64) -> &K::Value {
        self.values.get(mapped_id)
    }

    pub fn default_value(&self) -> &K::Value {
        self.values.default_value()
    }

    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    pub fn value_type(&self) -> ValueType {
        K::VALUE_TYPE
    }

    /// Whether any mapped id holds a non-default value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl LongPropertyValues {
    /// Maximum over every value set during import; absent when no
    /// non-default value survived the remap.
    pub fn max_value(&self) -> Option<i64> {
        self.max_value
    }
}

impl DoublePropertyValues {
    /// Maximum over every value set during import; absent when no
    /// non-default value survived the remap.
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }
}

// ── Type-erased store ──────────────────────────────────────────────

pub enum NodePropertyValues {
    Long(LongPropertyValues),
    Double(DoublePropertyValues),
    LongArray(LongArrayPropertyValues),
    FloatArray(FloatArrayPropertyValues),
    DoubleArray(DoubleArrayPropertyValues),
}

impl NodePropertyValues {
    pub fn value_type(&self) -> ValueType {
        match self {
            NodePropertyValues::Long(_) => ValueType::Long,
            NodePropertyValues::Double(_) => ValueType::Double,
            NodePropertyValues::LongArray(_) => ValueType::LongArray,
            NodePropertyValues::FloatArray(_) => ValueType::FloatArray,
            NodePropertyValues::DoubleArray(_) => ValueType::DoubleArray,
        }
    }

    pub fn node_count(&self) -> u64 {
        match self {
            NodePropertyValues::Long(v) => v.node_count(),
            NodePropertyValues::Double(v) => v.node_count(),
            NodePropertyValues::LongArray(v) => v.node_count(),
            NodePropertyValues::FloatArray(v) => v.node_count(),
            NodePropertyValues::DoubleArray(v) => v.node_count(),
        }
    }

    pub fn long_value(&self, mapped_id: u64) -> Option<i64> {
        match self {
            NodePropertyValues::Long(v) => Some(*v.value_at(mapped_id)),
            _ => None,
        }
    }

    /// Longs are widened.
    pub fn double_value(&self, mapped_id: u64) -> Option<f64> {
        match self {
            NodePropertyValues::Double(v) => Some(*v.value_at(mapped_id)),
            NodePropertyValues::Long(v) => Some(*v.value_at(mapped_id) as f64),
            _ => None,
        }
    }

    /// `None` on a kind mismatch or a null array.
    pub fn long_array_value(&self, mapped_id: u64) -> Option<Arc<[i64]>> {
        match self {
            NodePropertyValues::LongArray(v) => v.value_at(mapped_id).clone(),
            _ => None,
        }
    }

    /// `None` on a kind mismatch or a null array.
    pub fn float_array_value(&self, mapped_id: u64) -> Option<Arc<[f32]>> {
        match self {
            NodePropertyValues::FloatArray(v) => v.value_at(mapped_id).clone(),
            _ => None,
        }
    }

    /// Float arrays are widened. `None` on a kind mismatch or a null array.
    pub fn double_array_value(&self, mapped_id: u64) -> Option<Arc<[f64]>> {
        match self {
            NodePropertyValues::DoubleArray(v) => v.value_at(mapped_id).clone(),
            NodePropertyValues::FloatArray(v) => v
                .value_at(mapped_id)
                .as_ref()
                .map(|floats| floats.iter().map(|&f| f as f64).collect()),
            _ => None,
        }
    }

    /// Value at `mapped_id` as an external value; `None` for a null array.
    pub fn value(&self, mapped_id: u64) -> Option<PropertyValue> {
        match self {
            NodePropertyValues::Long(v) => Some(PropertyValue::Long(*v.value_at(mapped_id))),
            NodePropertyValues::Double(v) => Some(PropertyValue::Double(*v.value_at(mapped_id))),
            NodePropertyValues::LongArray(v) => v
                .value_at(mapped_id)
                .as_ref()
                .map(|a| PropertyValue::LongArray(a.to_vec())),
            NodePropertyValues::FloatArray(v) => v
                .value_at(mapped_id)
                .as_ref()
                .map(|a| PropertyValue::FloatArray(a.to_vec())),
            NodePropertyValues::DoubleArray(v) => v
                .value_at(mapped_id)
                .as_ref()
                .map(|a| PropertyValue::DoubleArray(a.to_vec())),
        }
    }

    /// Running maximum of a scalar store.
    pub fn max_value(&self) -> Option<PropertyValue> {
        match self {
            NodePropertyValues::Long(v) => v.max_value().map(PropertyValue::Long),
            NodePropertyValues::Double(v) => v.max_value().map(PropertyValue::Double),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<&LongPropertyValues> {
        match self {
            NodePropertyValues::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<&DoublePropertyValues> {
        match self {
            NodePropertyValues::Double(v) => Some(v),
            _ => None,
        }
    }
}
