//! External property values and their type tags.

use std::fmt;

/// Type tag of a property value.
///
/// `String` never backs an accumulator. It only shows up as the actual
/// type in conversion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Long,
    Double,
    LongArray,
    FloatArray,
    DoubleArray,
    String,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Long => "Long",
            ValueType::Double => "Double",
            ValueType::LongArray => "LongArray",
            ValueType::FloatArray => "FloatArray",
            ValueType::DoubleArray => "DoubleArray",
            ValueType::String => "String",
        }
    }

    /// Whether an accumulator exists for this type.
    pub fn is_storable(&self) -> bool {
        !matches!(self, ValueType::String)
    }

    /// Scalar numeric kinds track a running maximum.
    pub fn is_scalar(&self) -> bool {
        matches!(self, ValueType::Long | ValueType::Double)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as supplied by a producer, before conversion into
/// the primitive kind of the target accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Long(i64),
    Double(f64),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    String(String),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Long(_) => ValueType::Long,
            PropertyValue::Double(_) => ValueType::Double,
            PropertyValue::LongArray(_) => ValueType::LongArray,
            PropertyValue::FloatArray(_) => ValueType::FloatArray,
            PropertyValue::DoubleArray(_) => ValueType::DoubleArray,
            PropertyValue::String(_) => ValueType::String,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Long(v) => write!(f, "{v}"),
            PropertyValue::Double(v) => write!(f, "{v}"),
            PropertyValue::LongArray(v) => write!(f, "{v:?}"),
            PropertyValue::FloatArray(v) => write!(f, "{v:?}"),
            PropertyValue::DoubleArray(v) => write!(f, "{v:?}"),
            PropertyValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Long(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Double(v as f64)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        PropertyValue::LongArray(v)
    }
}

impl From<Vec<f32>> for PropertyValue {
    fn from(v: Vec<f32>) -> Self {
        PropertyValue::FloatArray(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        PropertyValue::DoubleArray(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_of_each_variant() {
        assert_eq!(PropertyValue::from(3i64).value_type(), ValueType::Long);
        assert_eq!(PropertyValue::from(3i32).value_type(), ValueType::Long);
        assert_eq!(PropertyValue::from(1.5).value_type(), ValueType::Double);
        assert_eq!(PropertyValue::from(vec![1i64]).value_type(), ValueType::LongArray);
        assert_eq!(PropertyValue::from(vec![1f32]).value_type(), ValueType::FloatArray);
        assert_eq!(PropertyValue::from(vec![1f64]).value_type(), ValueType::DoubleArray);
        assert_eq!(PropertyValue::from("x").value_type(), ValueType::String);
    }

    #[test]
    fn test_storable_and_scalar_kinds() {
        assert!(!ValueType::String.is_storable());
        assert!(ValueType::FloatArray.is_storable());
        assert!(ValueType::Long.is_scalar());
        assert!(ValueType::Double.is_scalar());
        assert!(!ValueType::DoubleArray.is_scalar());
    }
}
