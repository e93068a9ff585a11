//! Node property schema and the label → property key registry.
//!
//! Two modes:
//! - **Fixed**: the caller declares a `NodeSchema` up front. Every
//!   observed property key must be declared for at least one label of
//!   the node, and the declared type and default drive accumulator
//!   creation.
//! - **Lazy**: keys are recorded per label as they are observed; the
//!   value type of a key is taken from its first value.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::collections::{read, write};
use crate::error::{GraphError, Result};
use crate::labels::NodeLabel;
use crate::values::{DefaultValue, ValueType};

// ── Property schema ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    key: String,
    value_type: ValueType,
    default_value: DefaultValue,
}

impl PropertySchema {
    pub fn new(key: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            value_type,
            default_value: DefaultValue::DEFAULT,
        }
    }

    pub fn with_default(mut self, default_value: DefaultValue) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn default_value(&self) -> &DefaultValue {
        &self.default_value
    }
}

// ── Node schema ────────────────────────────────────────────────────

/// Label → (property key → schema).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSchema {
    entries: BTreeMap<NodeLabel, BTreeMap<String, PropertySchema>>,
}

impl NodeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<NodeLabel>) -> Self {
        self.add_label(label.into());
        self
    }

    pub fn with_property(mut self, label: impl Into<NodeLabel>, property: PropertySchema) -> Self {
        self.add_property(label.into(), property);
        self
    }

    pub fn add_label(&mut self, label: NodeLabel) {
        self.entries.entry(label).or_default();
    }

    pub fn add_property(&mut self, label: NodeLabel, property: PropertySchema) {
        self.entries
            .entry(label)
            .or_default()
            .insert(property.key.clone(), property);
    }

    pub fn labels(&self) -> impl Iterator<Item = &NodeLabel> {
        self.entries.keys()
    }

    pub fn has_label(&self, label: &NodeLabel) -> bool {
        self.entries.contains_key(label)
    }

    pub fn properties(&self, label: &NodeLabel) -> Option<&BTreeMap<String, PropertySchema>> {
        self.entries.get(label)
    }

    pub fn property_keys(&self, label: &NodeLabel) -> Vec<&str> {
        self.entries
            .get(label)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Schema of `key` for a node carrying `labels`: the first label (in
    /// label order) that declares it.
    pub fn property_for(&self, labels: &[NodeLabel], key: &str) -> Option<&PropertySchema> {
        labels
            .iter()
            .filter_map(|label| self.entries.get(label))
            .find_map(|props| props.get(key))
    }

    /// Every declared key across all labels. When labels disagree the
    /// first label in order wins.
    pub fn union_properties(&self) -> BTreeMap<String, PropertySchema> {
        let mut union = BTreeMap::new();
        for props in self.entries.values() {
            for (key, schema) in props {
                union.entry(key.clone()).or_insert_with(|| schema.clone());
            }
        }
        union
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Label → property keys ──────────────────────────────────────────

pub enum PropertyKeysByLabel {
    Lazy(RwLock<HashMap<NodeLabel, BTreeSet<String>>>),
    Fixed(NodeSchema),
}

impl PropertyKeysByLabel {
    pub fn lazy() -> Self {
        PropertyKeysByLabel::Lazy(RwLock::new(HashMap::new()))
    }

    pub fn fixed(schema: NodeSchema) -> Self {
        PropertyKeysByLabel::Fixed(schema)
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, PropertyKeysByLabel::Fixed(_))
    }

    /// Record (lazy) or validate (fixed) that nodes with `labels` carry
    /// property `key`.
    pub fn register(&self, labels: &[NodeLabel], key: &str) -> Result<()> {
        match self {
            PropertyKeysByLabel::Lazy(keys) => {
                let known = {
                    let keys = read(keys);
                    labels
                        .iter()
                        .all(|label| keys.get(label).is_some_and(|k| k.contains(key)))
                };
                if !known {
                    let mut keys = write(keys);
                    for label in labels {
                        keys.entry(label.clone()).or_default().insert(key.to_string());
                    }
                }
                Ok(())
            }
            PropertyKeysByLabel::Fixed(schema) => {
                schema.property_for(labels, key).map(|_| ()).ok_or_else(|| {
                    unknown_property(labels, key)
                })
            }
        }
    }

    /// Declared schema for `key` on `labels`; always `None` in lazy mode.
    pub fn declared(&self, labels: &[NodeLabel], key: &str) -> Option<&PropertySchema> {
        match self {
            PropertyKeysByLabel::Lazy(_) => None,
            PropertyKeysByLabel::Fixed(schema) => schema.property_for(labels, key),
        }
    }

    /// Assemble the final schema.
    ///
    /// `labels` are the labels present in the id map. `property_types`
    /// holds the type and default of every accumulator that was created
    /// (lazy mode only).
    pub fn build_schema(
        &self,
        labels: &[NodeLabel],
        property_types: &BTreeMap<String, (ValueType, DefaultValue)>,
    ) -> NodeSchema {
        match self {
            PropertyKeysByLabel::Fixed(schema) => {
                let mut schema = schema.clone();
                for label in labels {
                    schema.add_label(label.clone());
                }
                schema
            }
            PropertyKeysByLabel::Lazy(keys) => {
                let keys = read(keys);
                let mut schema = NodeSchema::new();
                for label in labels {
                    schema.add_label(label.clone());
                }
                for (label, label_keys) in keys.iter() {
                    for key in label_keys {
                        if let Some((value_type, default_value)) = property_types.get(key) {
                            schema.add_property(
                                label.clone(),
                                PropertySchema::new(key.clone(), *value_type)
                                    .with_default(default_value.clone()),
                            );
                        }
                    }
                }
                schema
            }
        }
    }
}

pub(crate) fn unknown_property(labels: &[NodeLabel], key: &str) -> GraphError {
    GraphError::UnknownProperty {
        key: key.to_string(),
        labels: labels.iter().map(|l| l.name().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> NodeLabel {
        NodeLabel::new("Person")
    }

    #[test]
    fn test_property_for_searches_all_node_labels() {
        let schema = NodeSchema::new()
            .with_property("Person", PropertySchema::new("age", ValueType::Long))
            .with_property("City", PropertySchema::new("population", ValueType::Long))
            .with_label("Empty");

        let labels = vec![NodeLabel::new("City"), person()];
        assert_eq!(schema.property_for(&labels, "age").unwrap().value_type(), ValueType::Long);
        assert!(schema.property_for(&[NodeLabel::new("Empty")], "age").is_none());
        assert_eq!(schema.property_keys(&person()), vec!["age"]);
        assert_eq!(schema.union_properties().len(), 2);
    }

    #[test]
    fn test_fixed_mode_rejects_undeclared_keys() {
        let keys = PropertyKeysByLabel::fixed(
            NodeSchema::new().with_property("Person", PropertySchema::new("age", ValueType::Long)),
        );
        assert!(keys.is_fixed());
        keys.register(&[person()], "age").unwrap();

        let err = keys.register(&[person()], "height").unwrap_err();
        match err {
            GraphError::UnknownProperty { key, labels } => {
                assert_eq!(key, "height");
                assert_eq!(labels, vec!["Person".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lazy_mode_records_keys_per_label() {
        let keys = PropertyKeysByLabel::lazy();
        keys.register(&[person()], "age").unwrap();
        keys.register(&[person(), NodeLabel::new("Admin")], "level").unwrap();

        let mut types = BTreeMap::new();
        types.insert("age".to_string(), (ValueType::Long, DefaultValue::DEFAULT));
        types.insert("level".to_string(), (ValueType::Double, DefaultValue::of(1.0)));

        let schema = keys.build_schema(&[person(), NodeLabel::new("Admin"), NodeLabel::new("City")], &types);
        assert_eq!(schema.property_keys(&person()), vec!["age", "level"]);
        assert_eq!(schema.property_keys(&NodeLabel::new("Admin")), vec!["level"]);
        assert!(schema.has_label(&NodeLabel::new("City")));
        assert_eq!(
            schema.properties(&NodeLabel::new("Admin")).unwrap()["level"].default_value(),
            &DefaultValue::of(1.0)
        );
    }
}
