//! Default values for node properties.
//!
//! A default is either user-defined (declared in a schema) or the
//! per-kind fallback: `i64::MIN` for longs, `NaN` for doubles and a null
//! array for array kinds. A user-defined default is converted to the
//! requested kind with the same exact rules as any property value.

use std::sync::Arc;

use crate::error::Result;
use crate::values::conversion;
use crate::values::value::PropertyValue;

pub const LONG_DEFAULT_FALLBACK: i64 = i64::MIN;
pub const DOUBLE_DEFAULT_FALLBACK: f64 = f64::NAN;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultValue(Option<PropertyValue>);

impl DefaultValue {
    /// No user-defined default; accessors return the kind's fallback.
    pub const DEFAULT: DefaultValue = DefaultValue(None);

    pub fn of(value: impl Into<PropertyValue>) -> Self {
        Self(Some(value.into()))
    }

    pub fn is_user_defined(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        self.0.as_ref()
    }

    pub fn as_long(&self, key: &str) -> Result<i64> {
        match &self.0 {
            Some(value) => conversion::exact_long(key, value),
            None => Ok(LONG_DEFAULT_FALLBACK),
        }
    }

    pub fn as_double(&self, key: &str) -> Result<f64> {
        match &self.0 {
            Some(value) => conversion::exact_double(key, value),
            None => Ok(DOUBLE_DEFAULT_FALLBACK),
        }
    }

    pub fn as_long_array(&self, key: &str) -> Result<Option<Arc<[i64]>>> {
        self.0
            .as_ref()
            .map(|value| conversion::long_array(key, value))
            .transpose()
    }

    pub fn as_float_array(&self, key: &str) -> Result<Option<Arc<[f32]>>> {
        self.0
            .as_ref()
            .map(|value| conversion::float_array(key, value))
            .transpose()
    }

    pub fn as_double_array(&self, key: &str) -> Result<Option<Arc<[f64]>>> {
        self.0
            .as_ref()
            .map(|value| conversion::double_array(key, value))
            .transpose()
    }
}
