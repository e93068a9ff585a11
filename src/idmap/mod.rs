//! Original id ↔ dense mapped id.
//!
//! Original ids are caller-supplied, sparse and up to 63 bits wide.
//! Mapped ids are dense in `[0, node_count)` and assigned in allocation
//! order by `IdMapBuilder`.

pub mod builder;
pub mod labels;

pub use builder::{IdMapAllocator, IdMapBuilder};
pub use labels::{LabelInformation, LabelInformationBuilder};

use crate::collections::SparseArray;
use crate::labels::NodeLabel;

/// Returned for an original id outside the graph.
pub const NOT_FOUND: u64 = u64::MAX;

/// The lookup an accumulator needs to remap its values.
pub trait PartialIdMap: Sync {
    /// Mapped id of `original_id`, or `NOT_FOUND`.
    fn to_mapped_node_id(&self, original_id: u64) -> u64;

    /// Node count of the root id map, if known.
    fn root_node_count(&self) -> Option<u64>;
}

pub struct IdMap {
    pub(crate) node_count: u64,
    pub(crate) highest_original_id: u64,
    pub(crate) mapped_to_original: SparseArray<u64>,
    pub(crate) original_to_mapped: SparseArray<u64>,
    pub(crate) labels: LabelInformation,
}

impl IdMap {
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Largest original id ever inserted; 0 for an empty map.
    pub fn highest_original_id(&self) -> u64 {
        self.highest_original_id
    }

    pub fn to_original_node_id(&self, mapped_id: u64) -> Option<u64> {
        if mapped_id >= self.node_count {
            return None;
        }
        match *self.mapped_to_original.get(mapped_id) {
            NOT_FOUND => None,
            original => Some(original),
        }
    }

    pub fn contains_original_id(&self, original_id: u64) -> bool {
        self.to_mapped_node_id(original_id) != NOT_FOUND
    }

    pub fn labels(&self, mapped_id: u64) -> Vec<NodeLabel> {
        self.labels.labels(mapped_id)
    }

    pub fn has_label(&self, mapped_id: u64, label: &NodeLabel) -> bool {
        mapped_id < self.node_count && self.labels.has_label(mapped_id, label)
    }

    pub fn node_count_for(&self, label: &NodeLabel) -> u64 {
        self.labels.node_count_for(label, self.node_count)
    }

    pub fn available_labels(&self) -> Vec<NodeLabel> {
        self.labels.available_labels()
    }

    pub fn label_information(&self) -> &LabelInformation {
        &self.labels
    }
}

impl PartialIdMap for IdMap {
    fn to_mapped_node_id(&self, original_id: u64) -> u64 {
        *self.original_to_mapped.get(original_id)
    }

    fn root_node_count(&self) -> Option<u64> {
        Some(self.node_count)
    }
}
