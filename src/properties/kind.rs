//! Value kinds an accumulator can hold.
//!
//! Each kind fixes the primitive stored per node, how the declared
//! default and external values convert into it, and when a stored value
//! counts as equal to the default. Default-equal values are dropped at
//! remap time.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::properties::max::{DoubleMax, LongMax, NoMax, RunningMax};
use crate::properties::store::{NodePropertyValues, TypedPropertyValues};
use crate::values::{conversion, DefaultValue, PropertyValue, ValueType};

pub trait PropertyKind: Sized + Send + Sync + 'static {
    type Value: Clone + Send + Sync + fmt::Debug;
    type Max: RunningMax<Self::Value>;

    const VALUE_TYPE: ValueType;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<Self::Value>;

    fn convert(key: &str, value: &PropertyValue) -> Result<Self::Value>;

    /// Full-precision equality used to skip defaults.
    fn default_equal(value: &Self::Value, default: &Self::Value) -> bool;

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues;
}

// ── Equality ───────────────────────────────────────────────────────

/// NaN equals NaN, -0.0 differs from +0.0.
#[inline]
pub fn double_equal(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

#[inline]
pub fn float_equal(a: f32, b: f32) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

/// Both null, or same length and element-wise equal.
pub fn array_equal<T>(
    a: &Option<Arc<[T]>>,
    b: &Option<Arc<[T]>>,
    eq: impl Fn(&T, &T) -> bool,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| eq(x, y)),
        _ => false,
    }
}

// ── Kinds ──────────────────────────────────────────────────────────

pub struct LongKind;

impl PropertyKind for LongKind {
    type Value = i64;
    type Max = LongMax;

    const VALUE_TYPE: ValueType = ValueType::Long;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<i64> {
        default_value.as_long(key)
    }

    fn convert(key: &str, value: &PropertyValue) -> Result<i64> {
        conversion::exact_long(key, value)
    }

    fn default_equal(value: &i64, default: &i64) -> bool {
        value == default
    }

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues {
        NodePropertyValues::Long(values)
    }
}

pub struct DoubleKind;

impl PropertyKind for DoubleKind {
    type Value = f64;
    type Max = DoubleMax;

    const VALUE_TYPE: ValueType = ValueType::Double;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<f64> {
        default_value.as_double(key)
    }

    fn convert(key: &str, value: &PropertyValue) -> Result<f64> {
        conversion::exact_double(key, value)
    }

    fn default_equal(value: &f64, default: &f64) -> bool {
        double_equal(*value, *default)
    }

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues {
        NodePropertyValues::Double(values)
    }
}

pub struct LongArrayKind;

impl PropertyKind for LongArrayKind {
    type Value = Option<Arc<[i64]>>;
    type Max = NoMax;

    const VALUE_TYPE: ValueType = ValueType::LongArray;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<Self::Value> {
        default_value.as_long_array(key)
    }

    fn convert(key: &str, value: &PropertyValue) -> Result<Self::Value> {
        conversion::long_array(key, value).map(Some)
    }

    fn default_equal(value: &Self::Value, default: &Self::Value) -> bool {
        array_equal(value, default, |a, b| a == b)
    }

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues {
        NodePropertyValues::LongArray(values)
    }
}

pub struct FloatArrayKind;

impl PropertyKind for FloatArrayKind {
    type Value = Option<Arc<[f32]>>;
    type Max = NoMax;

    const VALUE_TYPE: ValueType = ValueType::FloatArray;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<Self::Value> {
        default_value.as_float_array(key)
    }

    fn convert(key: &str, value: &PropertyValue) -> Result<Self::Value> {
        conversion::float_array(key, value).map(Some)
    }

    fn default_equal(value: &Self::Value, default: &Self::Value) -> bool {
        array_equal(value, default, |a, b| float_equal(*a, *b))
    }

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues {
        NodePropertyValues::FloatArray(values)
    }
}

pub struct DoubleArrayKind;

impl PropertyKind for DoubleArrayKind {
    type Value = Option<Arc<[f64]>>;
    type Max = NoMax;

    const VALUE_TYPE: ValueType = ValueType::DoubleArray;

    fn default_of(key: &str, default_value: &DefaultValue) -> Result<Self::Value> {
        default_value.as_double_array(key)
    }

    fn convert(key: &str, value: &PropertyValue) -> Result<Self::Value> {
        conversion::double_array(key, value).map(Some)
    }

    fn default_equal(value: &Self::Value, default: &Self::Value) -> bool {
        array_equal(value, default, |a, b| double_equal(*a, *b))
    }

    fn into_node_values(values: TypedPropertyValues<Self>) -> NodePropertyValues {
        NodePropertyValues::DoubleArray(values)
    }
}
