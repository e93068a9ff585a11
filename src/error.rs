//! Error types for the node import pipeline

use thiserror::Error;

use crate::values::ValueType;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot convert property '{key}' of type {actual} into {expected}")]
    TypeConversion {
        key: String,
        expected: ValueType,
        actual: ValueType,
    },

    #[error("Cannot safely convert {value} of property '{key}' into {target}")]
    LossyConversion {
        key: String,
        value: String,
        target: ValueType,
    },

    #[error("Property '{key}' has unsupported value type {actual}")]
    UnsupportedValueType { key: String, actual: ValueType },

    #[error("Property '{key}' is not declared in the node schema for labels {labels:?}")]
    UnknownProperty { key: String, labels: Vec<String> },

    #[error("Unknown property reference {0} in batch")]
    UnknownPropertyReference(usize),

    #[error("Original id {id} exceeds the maximum original id {max}")]
    OriginalIdOutOfRange { id: u64, max: u64 },

    #[error("Mapped id {mapped} is outside [0, {node_count})")]
    MappedIdOutOfRange { mapped: u64, node_count: u64 },

    #[error("Accumulator for property '{0}' is still referenced by an open lane")]
    AccumulatorInUse(String),

    #[error("Nodes builder is closed")]
    BuilderClosed,

    #[error("{0} lane(s) were neither closed nor dropped empty before build")]
    LanesOpen(usize),

    #[error("Thread pool error: {0}")]
    Pool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    /// Stable error code, for callers that report failures outside Rust.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::InvalidConfig(_) => "INVALID_CONFIG",
            GraphError::TypeConversion { .. } => "TYPE_CONVERSION",
            GraphError::LossyConversion { .. } => "LOSSY_CONVERSION",
            GraphError::UnsupportedValueType { .. } => "UNSUPPORTED_VALUE_TYPE",
            GraphError::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            GraphError::UnknownPropertyReference(_) => "UNKNOWN_PROPERTY_REFERENCE",
            GraphError::OriginalIdOutOfRange { .. } => "ORIGINAL_ID_OUT_OF_RANGE",
            GraphError::MappedIdOutOfRange { .. } => "MAPPED_ID_OUT_OF_RANGE",
            GraphError::AccumulatorInUse(_) => "ACCUMULATOR_IN_USE",
            GraphError::BuilderClosed => "BUILDER_CLOSED",
            GraphError::LanesOpen(_) => "LANES_OPEN",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Configuration errors are raised before any node is staged.
    pub fn is_config_error(&self) -> bool {
        matches!(self, GraphError::InvalidConfig(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_conversion_message_names_key_and_types() {
        let err = GraphError::TypeConversion {
            key: "age".to_string(),
            expected: ValueType::Long,
            actual: ValueType::String,
        };
        let msg = err.to_string();
        assert!(msg.contains("'age'"));
        assert!(msg.contains("String"));
        assert!(msg.contains("Long"));
        assert_eq!(err.code(), "TYPE_CONVERSION");
    }

    #[test]
    fn test_io_errors_map_to_internal_code() {
        let err: GraphError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(!err.is_config_error());
        assert!(GraphError::InvalidConfig("x".into()).is_config_error());
    }
}
