//! Node labels and label tokens.
//!
//! A `NodeLabelToken` is the label set a producer attaches to one node.
//! Each lane interns the distinct tokens it sees into small local ids
//! (`LocalLabelTokens`); at flush time those resolve to global label
//! tokens from the shared `LabelRegistry`.

pub mod registry;

pub use registry::{LabelMapping, LabelRegistry, LocalLabelTokens, ResolvedLabels};

use std::fmt;
use std::sync::Arc;

/// Name of the implicit label carried by nodes imported without labels.
pub const ALL_NODES_NAME: &str = "__ALL__";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeLabel(Arc<str>);

impl NodeLabel {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn all_nodes() -> Self {
        Self::new(ALL_NODES_NAME)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_all_nodes(&self) -> bool {
        &*self.0 == ALL_NODES_NAME
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeLabel {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A set of zero or more labels. Sorted and deduplicated on
/// construction, so two tokens are equal iff their label sets are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodeLabelToken {
    labels: Vec<NodeLabel>,
}

impl NodeLabelToken {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(label: impl Into<NodeLabel>) -> Self {
        Self::of([label])
    }

    pub fn of<L: Into<NodeLabel>>(labels: impl IntoIterator<Item = L>) -> Self {
        let mut labels: Vec<NodeLabel> = labels.into_iter().map(Into::into).collect();
        labels.sort_unstable();
        labels.dedup();
        // `[__ALL__]` resolves exactly like the empty set.
        if labels.len() == 1 && labels[0].is_all_nodes() {
            labels.clear();
        }
        Self { labels }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[NodeLabel] {
        &self.labels
    }

    /// Labels as seen by the id map: an empty token means `__ALL__`.
    pub fn resolved(&self) -> Vec<NodeLabel> {
        if self.labels.is_empty() {
            vec![NodeLabel::all_nodes()]
        } else {
            self.labels.clone()
        }
    }
}

impl From<NodeLabel> for NodeLabelToken {
    fn from(label: NodeLabel) -> Self {
        Self::single(label)
    }
}

impl From<&str> for NodeLabelToken {
    fn from(label: &str) -> Self {
        Self::single(label)
    }
}
