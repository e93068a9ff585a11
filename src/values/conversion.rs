//! Exact conversions from external values into accumulator primitives.
//!
//! A conversion either preserves the value exactly or fails. Kind
//! mismatches (a string into a long, an array into a scalar) fail with
//! `TypeConversion`; values of a compatible kind that cannot be
//! represented exactly (1.5 into a long, 2^60 into a double) fail with
//! `LossyConversion`.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::values::value::{PropertyValue, ValueType};

/// Largest magnitude an i64 can have and still be exact as an f64.
const MAX_EXACT_DOUBLE_INT: u64 = 1 << 53;

/// -2^63 and 2^63 as f64; `[MIN, MAX)` is the range `as i64` preserves.
const I64_MIN_AS_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_EXCLUSIVE_AS_F64: f64 = 9_223_372_036_854_775_808.0;

pub fn exact_long(key: &str, value: &PropertyValue) -> Result<i64> {
    match value {
        PropertyValue::Long(v) => Ok(*v),
        PropertyValue::Double(d) => double_to_long(*d)
            .ok_or_else(|| lossy(key, value, ValueType::Long)),
        other => Err(mismatch(key, ValueType::Long, other)),
    }
}

pub fn exact_double(key: &str, value: &PropertyValue) -> Result<f64> {
    match value {
        PropertyValue::Double(d) => Ok(*d),
        PropertyValue::Long(v) => long_to_double(*v)
            .ok_or_else(|| lossy(key, value, ValueType::Double)),
        other => Err(mismatch(key, ValueType::Double, other)),
    }
}

pub fn long_array(key: &str, value: &PropertyValue) -> Result<Arc<[i64]>> {
    match value {
        PropertyValue::LongArray(values) => Ok(Arc::from(values.as_slice())),
        other => Err(mismatch(key, ValueType::LongArray, other)),
    }
}

pub fn double_array(key: &str, value: &PropertyValue) -> Result<Arc<[f64]>> {
    match value {
        PropertyValue::DoubleArray(values) => Ok(Arc::from(values.as_slice())),
        PropertyValue::FloatArray(values) => {
            Ok(values.iter().map(|&f| f as f64).collect())
        }
        PropertyValue::LongArray(values) => values
            .iter()
            .map(|&v| long_to_double(v))
            .collect::<Option<Arc<[f64]>>>()
            .ok_or_else(|| lossy(key, value, ValueType::DoubleArray)),
        other => Err(mismatch(key, ValueType::DoubleArray, other)),
    }
}

pub fn float_array(key: &str, value: &PropertyValue) -> Result<Arc<[f32]>> {
    match value {
        PropertyValue::FloatArray(values) => Ok(Arc::from(values.as_slice())),
        PropertyValue::DoubleArray(values) => values
            .iter()
            .map(|&d| double_to_float(d))
            .collect::<Option<Arc<[f32]>>>()
            .ok_or_else(|| lossy(key, value, ValueType::FloatArray)),
        other => Err(mismatch(key, ValueType::FloatArray, other)),
    }
}

fn double_to_long(d: f64) -> Option<i64> {
    if d.is_finite() && d.fract() == 0.0 && d >= I64_MIN_AS_F64 && d < I64_MAX_EXCLUSIVE_AS_F64 {
        Some(d as i64)
    } else {
        None
    }
}

fn long_to_double(v: i64) -> Option<f64> {
    if v.unsigned_abs() <= MAX_EXACT_DOUBLE_INT {
        Some(v as f64)
    } else {
        None
    }
}

fn double_to_float(d: f64) -> Option<f32> {
    let f = d as f32;
    if d.is_nan() || f as f64 == d {
        Some(f)
    } else {
        None
    }
}

fn mismatch(key: &str, expected: ValueType, actual: &PropertyValue) -> GraphError {
    GraphError::TypeConversion {
        key: key.to_string(),
        expected,
        actual: actual.value_type(),
    }
}

fn lossy(key: &str, value: &PropertyValue, target: ValueType) -> GraphError {
    GraphError::LossyConversion {
        key: key.to_string(),
        value: value.to_string(),
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_accepts_integral_doubles_only() {
        assert_eq!(exact_long("k", &PropertyValue::Long(-7)).unwrap(), -7);
        assert_eq!(exact_long("k", &PropertyValue::Double(42.0)).unwrap(), 42);

        let err = exact_long("k", &PropertyValue::Double(1.5)).unwrap_err();
        assert!(matches!(err, GraphError::LossyConversion { target: ValueType::Long, .. }));

        assert!(exact_long("k", &PropertyValue::Double(f64::NAN)).is_err());
        assert!(exact_long("k", &PropertyValue::Double(f64::INFINITY)).is_err());
        assert!(exact_long("k", &PropertyValue::Double(1e19)).is_err());
    }

    #[test]
    fn test_long_rejects_other_kinds_with_both_types() {
        let err = exact_long("name", &PropertyValue::String("bob".into())).unwrap_err();
        match err {
            GraphError::TypeConversion { key, expected, actual } => {
                assert_eq!(key, "name");
                assert_eq!(expected, ValueType::Long);
                assert_eq!(actual, ValueType::String);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_double_from_long_within_53_bits() {
        assert_eq!(exact_double("k", &PropertyValue::Long(1 << 53)).unwrap(), 9007199254740992.0);
        assert!(exact_double("k", &PropertyValue::Long((1 << 53) + 1)).is_err());
        assert!(exact_double("k", &PropertyValue::Double(f64::NAN)).unwrap().is_nan());
    }

    #[test]
    fn test_array_widening_and_narrowing() {
        let widened = double_array("k", &PropertyValue::FloatArray(vec![0.5, 1.25])).unwrap();
        assert_eq!(&*widened, &[0.5, 1.25]);

        let from_longs = double_array("k", &PropertyValue::LongArray(vec![1, 2])).unwrap();
        assert_eq!(&*from_longs, &[1.0, 2.0]);

        let narrowed = float_array("k", &PropertyValue::DoubleArray(vec![0.5, f64::NAN])).unwrap();
        assert_eq!(narrowed[0], 0.5);
        assert!(narrowed[1].is_nan());

        assert!(float_array("k", &PropertyValue::DoubleArray(vec![0.1])).is_err());
        assert!(long_array("k", &PropertyValue::DoubleArray(vec![1.0])).is_err());
    }
}
