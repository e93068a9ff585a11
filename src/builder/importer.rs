//! Flushes a batch buffer into the id map and the accumulators.

use std::sync::Arc;

use crate::builder::batch_buffer::{NodesBatchBuffer, NO_PROPERTY};
use crate::error::Result;
use crate::idmap::IdMapBuilder;
use crate::labels::LabelMapping;

/// Aggregate counts of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Nodes registered in the id map.
    pub nodes: u64,
    /// Property values written into accumulators.
    pub properties: u64,
}

pub struct NodeImporter {
    id_map: Arc<IdMapBuilder>,
}

impl NodeImporter {
    pub fn new(id_map: Arc<IdMapBuilder>) -> Self {
        Self { id_map }
    }

    pub fn id_map(&self) -> &IdMapBuilder {
        &self.id_map
    }

    /// Import every entry of `buffer`.
    ///
    /// `write_properties(original_id, local_label_token, property_ref)` runs
    /// once per entry carrying properties and returns the number of values
    /// it wrote. All callbacks run before any id is registered: if one
    /// fails, the error is returned and no node of the batch reaches the
    /// id map.
    pub fn import_nodes<F>(
        &self,
        buffer: &NodesBatchBuffer,
        labels: LabelMapping<'_>,
        mut write_properties: F,
    ) -> Result<ImportStats>
    where
        F: FnMut(u64, u32, usize) -> Result<u64>,
    {
        if buffer.is_empty() {
            return Ok(ImportStats::default());
        }

        let mut properties = 0;
        for (original_id, property_ref, label_token) in buffer.entries() {
            if property_ref != NO_PROPERTY {
                properties += write_properties(original_id, label_token, property_ref)?;
            }
        }

        let allocator = self.id_map.allocate(buffer.len());
        allocator.insert(buffer.original_ids());
        allocator.insert_labels(
            buffer
                .label_tokens()
                .iter()
                .map(|&token| labels.global_tokens(token)),
        );

        Ok(ImportStats {
            nodes: buffer.len() as u64,
            properties,
        })
    }
}
