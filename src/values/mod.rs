//! Property value model: external values handed in by producers, the
//! primitive kinds accumulators store, default values and exact
//! conversions between them.

pub mod conversion;
pub mod default_value;
pub mod property_values;
pub mod value;

pub use default_value::DefaultValue;
pub use property_values::PropertyValues;
pub use value::{PropertyValue, ValueType};
