//! One lane's construction worker.
//!
//! Owns a batch buffer and the property maps of the buffered entries.
//! Not shared: every method takes `&mut self`, and a worker is driven by
//! one thread at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::builder::batch_buffer::{NodesBatchBuffer, NO_PROPERTY};
use crate::builder::context::{LocalContext, NodesBuilderContext};
use crate::builder::importer::ImportStats;
use crate::builder::nodes_builder::NodeInput;
use crate::error::{GraphError, Result};
use crate::properties::PropertyAccumulator;
use crate::schema::unknown_property;
use crate::values::PropertyValues;

pub struct LocalNodesBuilder {
    lane: usize,
    context: Arc<NodesBuilderContext>,
    local: LocalContext,
    buffer: NodesBatchBuffer,
    batch_properties: Vec<PropertyValues>,
    closed: bool,
}

impl LocalNodesBuilder {
    pub(crate) fn new(context: Arc<NodesBuilderContext>, batch_capacity: usize) -> Self {
        Self {
            lane: context.open_lane(),
            local: context.local_context(),
            buffer: NodesBatchBuffer::new(batch_capacity),
            batch_properties: Vec::new(),
            closed: false,
            context,
        }
    }

    pub fn lane(&self) -> usize {
        self.lane
    }

    /// Entries staged but not yet flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stage one node; flushes when the buffer fills.
    ///
    /// A duplicate id (with deduplication enabled) is a silent no-op:
    /// its labels and properties are never looked at. The id is marked
    /// only after its property keys registered, so a call that fails
    /// there leaves the id free. Two racing calls for the same new id
    /// may both register keys; only one stages the node.
    pub fn add_node(&mut self, original_id: u64, input: impl Into<NodeInput>) -> Result<()> {
        if self.closed || self.context.is_closed() {
            return Err(GraphError::BuilderClosed);
        }
        if !self.context.check_id(original_id)? {
            return Ok(());
        }
        let (labels, properties) = input.into().into_parts();

        let (label_token, properties) = match properties {
            Some(properties) if !properties.is_empty() => {
                if !self.context.has_properties() {
                    return Err(GraphError::InvalidConfig(
                        "node properties supplied but has_properties is false".to_string(),
                    ));
                }
                let token = self.context.label_token_with_properties(
                    &mut self.local,
                    &labels,
                    &properties,
                )?;
                (token, Some(properties))
            }
            _ => (self.context.label_token(&mut self.local, &labels), None),
        };

        if !self.context.admit(original_id)? {
            return Ok(());
        }

        let property_ref = match properties {
            Some(properties) => {
                self.batch_properties.push(properties);
                self.batch_properties.len() - 1
            }
            None => NO_PROPERTY,
        };

        if self.buffer.add(original_id, property_ref, label_token) {
            self.flush()?;
        }
        Ok(())
    }

    /// Import the buffered entries, then reset the buffer.
    ///
    /// Property values are written before any id of the batch is
    /// registered. On error nothing of this batch is counted or added to
    /// the id map; values already written stay keyed by their original id
    /// and are dropped at remap unless another batch imports that id.
    /// The batch is discarded either way, never replayed.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let result = self.import_buffer();
        let staged = self.buffer.len();
        self.buffer.reset();
        self.batch_properties.clear();

        match result {
            Ok(stats) => {
                let elapsed = started.elapsed();
                self.context.record_flush(stats, elapsed);
                tracing::debug!(
                    lane = self.lane,
                    nodes = stats.nodes,
                    properties = stats.properties,
                    elapsed_us = elapsed.as_micros() as u64,
                    "Flushed node batch"
                );
                Ok(())
            }
            Err(e) => {
                self.context.metrics().record_failed_flush();
                tracing::debug!(lane = self.lane, discarded = staged, error = %e, "Node batch failed");
                Err(e)
            }
        }
    }

    fn import_buffer(&self) -> Result<ImportStats> {
        let context = &self.context;
        let batch_properties = &self.batch_properties;
        let local = &self.local;
        let mut accumulators: HashMap<&str, Arc<PropertyAccumulator>> = HashMap::new();

        context
            .importer()
            .import_nodes(&self.buffer, local.mapping(), |original_id, label_token, property_ref| {
                let properties = batch_properties
                    .get(property_ref)
                    .ok_or(GraphError::UnknownPropertyReference(property_ref))?;
                let mut written = 0;
                for (key, value) in properties {
                    if !accumulators.contains_key(key.as_str()) {
                        let acc = context
                            .accumulator(key)
                            .ok_or_else(|| unknown_property(local.labels(label_token), key))?;
                        accumulators.insert(key.as_str(), acc);
                    }
                    accumulators[key.as_str()].set_value(original_id, value)?;
                    written += 1;
                }
                Ok(written)
            })
    }

    /// Flush remaining entries. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.context.release_lane();
        self.flush()
    }
}

impl Drop for LocalNodesBuilder {
    /// An empty worker releases its lane. One dropped with staged entries
    /// stays open, so the builder's `build` fails instead of losing them.
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if self.buffer.is_empty() {
            self.context.release_lane();
        } else {
            tracing::warn!(
                lane = self.lane,
                discarded = self.buffer.len(),
                "Local nodes builder dropped with unflushed entries"
            );
        }
    }
}
