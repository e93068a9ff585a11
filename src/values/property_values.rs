//! The property map attached to one `add_node` call.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::values::value::PropertyValue;

/// Ordered mapping from property key to value. Read-only once handed to
/// a builder; the worker keeps it only until the next flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyValues {
    values: BTreeMap<String, PropertyValue>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A repeated key keeps the last value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, PropertyValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = PropertyValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

impl<'a> IntoIterator for &'a PropertyValues {
    type Item = (&'a String, &'a PropertyValue);
    type IntoIter = btree_map::Iter<'a, String, PropertyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
