//! Per-label node sets, keyed by mapped id.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use roaring::RoaringTreemap;

use crate::collections::lock;
use crate::labels::{LabelRegistry, NodeLabel};

// ── Builder ────────────────────────────────────────────────────────

/// Collects mapped ids per global label token during import.
pub struct LabelInformationBuilder {
    enabled: bool,
    by_token: Mutex<HashMap<u32, RoaringTreemap>>,
}

impl LabelInformationBuilder {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            by_token: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Merge one flush worth of assignments: global token → mapped ids.
    /// A no-op when label information is disabled.
    pub fn add_batch(&self, batch: HashMap<u32, RoaringTreemap>) {
        if !self.enabled || batch.is_empty() {
            return;
        }
        let mut by_token = lock(&self.by_token);
        for (token, ids) in batch {
            *by_token.entry(token).or_default() |= ids;
        }
    }

    /// Resolve tokens to labels, leaving the builder empty.
    pub fn take(&self, registry: &LabelRegistry) -> LabelInformation {
        let by_token = std::mem::take(&mut *lock(&self.by_token));
        if !self.enabled {
            return LabelInformation::AllNodes;
        }

        let mut by_label = BTreeMap::new();
        for (token, ids) in by_token {
            if let Some(label) = registry.label(token) {
                *by_label.entry(label).or_insert_with(RoaringTreemap::new) |= ids;
            }
        }

        // Only unlabeled nodes were imported.
        if by_label.keys().all(NodeLabel::is_all_nodes) {
            return LabelInformation::AllNodes;
        }
        LabelInformation::Multi(by_label)
    }
}

// ── Frozen label information ───────────────────────────────────────

pub enum LabelInformation {
    /// Every node carries exactly the implicit `__ALL__` label.
    AllNodes,
    /// Label → mapped ids. Unlabeled nodes are filed under `__ALL__`.
    Multi(BTreeMap<NodeLabel, RoaringTreemap>),
}

impl LabelInformation {
    pub fn has_label(&self, mapped_id: u64, label: &NodeLabel) -> bool {
        if label.is_all_nodes() {
            return true;
        }
        match self {
            LabelInformation::AllNodes => false,
            LabelInformation::Multi(by_label) => by_label
                .get(label)
                .is_some_and(|ids| ids.contains(mapped_id)),
        }
    }

    /// Labels of `mapped_id`, in label order.
    pub fn labels(&self, mapped_id: u64) -> Vec<NodeLabel> {
        match self {
            LabelInformation::AllNodes => vec![NodeLabel::all_nodes()],
            LabelInformation::Multi(by_label) => by_label
                .iter()
                .filter(|(_, ids)| ids.contains(mapped_id))
                .map(|(label, _)| label.clone())
                .collect(),
        }
    }

    /// Number of nodes carrying `label`; `__ALL__` counts every node.
    pub fn node_count_for(&self, label: &NodeLabel, node_count: u64) -> u64 {
        if label.is_all_nodes() {
            return node_count;
        }
        match self {
            LabelInformation::AllNodes => 0,
            LabelInformation::Multi(by_label) => by_label.get(label).map_or(0, |ids| ids.len()),
        }
    }

    pub fn available_labels(&self) -> Vec<NodeLabel> {
        match self {
            LabelInformation::AllNodes => vec![NodeLabel::all_nodes()],
            LabelInformation::Multi(by_label) => by_label.keys().cloned().collect(),
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, LabelInformation::Multi(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(u32, &[u64])]) -> HashMap<u32, RoaringTreemap> {
        entries
            .iter()
            .map(|(token, ids)| (*token, ids.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_batches_merge_per_label() {
        let registry = LabelRegistry::new();
        let person = registry.get_or_register(&NodeLabel::new("Person"));
        let city = registry.get_or_register(&NodeLabel::new("City"));

        let builder = LabelInformationBuilder::new(true);
        builder.add_batch(batch(&[(person, &[0, 1]), (city, &[2])]));
        builder.add_batch(batch(&[(person, &[3]), (city, &[1])]));

        let info = builder.take(&registry);
        assert!(info.is_multi());
        assert_eq!(info.node_count_for(&NodeLabel::new("Person"), 4), 3);
        assert_eq!(
            info.labels(1),
            vec![NodeLabel::new("City"), NodeLabel::new("Person")]
        );
        assert!(info.has_label(2, &NodeLabel::new("City")));
        assert!(!info.has_label(2, &NodeLabel::new("Person")));
        assert!(info.has_label(2, &NodeLabel::all_nodes()));
        assert_eq!(info.node_count_for(&NodeLabel::new("Missing"), 4), 0);
    }

    #[test]
    fn test_only_unlabeled_nodes_collapse_to_all_nodes() {
        let registry = LabelRegistry::new();
        let all = registry.get_or_register(&NodeLabel::all_nodes());
        let builder = LabelInformationBuilder::new(true);
        builder.add_batch(batch(&[(all, &[0, 1, 2])]));

        let info = builder.take(&registry);
        assert!(!info.is_multi());
        assert_eq!(info.labels(0), vec![NodeLabel::all_nodes()]);
        assert_eq!(info.node_count_for(&NodeLabel::all_nodes(), 3), 3);
    }

    #[test]
    fn test_disabled_builder_ignores_batches() {
        let registry = LabelRegistry::new();
        let token = registry.get_or_register(&NodeLabel::new("Person"));
        let builder = LabelInformationBuilder::new(false);
        builder.add_batch(batch(&[(token, &[0])]));
        let info = builder.take(&registry);
        assert_eq!(info.available_labels(), vec![NodeLabel::all_nodes()]);
        assert!(!info.has_label(0, &NodeLabel::new("Person")));
    }
}
