//! State shared by every lane of one import job, and the per-lane view
//! of it.
//!
//! Cross-lane communication goes only through the structures held here:
//! the label registry, the property key → accumulator map, the dedup
//! predicate, the id map builder and the counters. Everything in
//! `LocalContext` belongs to exactly one lane.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::builder::dedup::SeenIds;
use crate::builder::importer::{ImportStats, NodeImporter};
use crate::collections::sparse_array::MAX_INDEX;
use crate::collections::{read, write};
use crate::config::NodesBuilderConfig;
use crate::error::{GraphError, Result};
use crate::idmap::IdMapBuilder;
use crate::labels::{LabelMapping, LabelRegistry, LocalLabelTokens, NodeLabel, NodeLabelToken};
use crate::metrics::ImportMetrics;
use crate::properties::PropertyAccumulator;
use crate::schema::PropertyKeysByLabel;
use crate::values::{DefaultValue, PropertyValue, PropertyValues, ValueType};

pub struct NodesBuilderContext {
    registry: Arc<LabelRegistry>,
    property_keys: PropertyKeysByLabel,
    accumulators: RwLock<HashMap<String, Arc<PropertyAccumulator>>>,
    id_map: Arc<IdMapBuilder>,
    importer: NodeImporter,
    seen: Option<SeenIds>,
    max_original_id: u64,
    has_properties: bool,
    imported_nodes: AtomicU64,
    imported_properties: AtomicU64,
    metrics: ImportMetrics,
    next_lane: AtomicUsize,
    open_lanes: AtomicUsize,
    closed: AtomicBool,
}

impl NodesBuilderContext {
    pub fn new(config: &NodesBuilderConfig, property_keys: PropertyKeysByLabel) -> Self {
        let id_map = Arc::new(IdMapBuilder::new(config.has_label_information));
        Self {
            registry: Arc::new(LabelRegistry::new()),
            property_keys,
            accumulators: RwLock::new(HashMap::new()),
            importer: NodeImporter::new(Arc::clone(&id_map)),
            id_map,
            seen: config
                .deduplicate_ids
                .then(|| SeenIds::new(config.max_original_id)),
            max_original_id: config.max_original_id.unwrap_or(MAX_INDEX),
            has_properties: config.has_properties,
            imported_nodes: AtomicU64::new(0),
            imported_properties: AtomicU64::new(0),
            metrics: ImportMetrics::new(),
            next_lane: AtomicUsize::new(0),
            open_lanes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    // -- Lanes ----------------------------------------------------------------

    pub fn local_context(&self) -> LocalContext {
        LocalContext {
            tokens: LocalLabelTokens::new(Arc::clone(&self.registry)),
            registered_keys: HashMap::new(),
        }
    }

    /// Register a new worker and return its lane id. The lane counts as
    /// open until `release_lane`.
    pub(crate) fn open_lane(&self) -> usize {
        self.open_lanes.fetch_add(1, Ordering::AcqRel);
        self.next_lane.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn release_lane(&self) {
        self.open_lanes.fetch_sub(1, Ordering::AcqRel);
    }

    /// Workers neither closed nor dropped empty.
    pub fn open_lanes(&self) -> usize {
        self.open_lanes.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn has_properties(&self) -> bool {
        self.has_properties
    }

    // -- Ids ------------------------------------------------------------------

    /// Validate `original_id` and consult the dedup predicate without
    /// marking. Returns false if the id was already seen and must be
    /// skipped.
    pub fn check_id(&self, original_id: u64) -> Result<bool> {
        self.check_bound(original_id)?;
        match &self.seen {
            Some(seen) if seen.contains(original_id) => {
                self.metrics.record_deduplicated();
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Mark `original_id` as seen. Returns false if another call marked
    /// it first, in which case the node must be skipped.
    pub fn admit(&self, original_id: u64) -> Result<bool> {
        self.check_bound(original_id)?;
        match &self.seen {
            Some(seen) if !seen.mark(original_id) => {
                self.metrics.record_deduplicated();
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    fn check_bound(&self, original_id: u64) -> Result<()> {
        if original_id > self.max_original_id {
            return Err(GraphError::OriginalIdOutOfRange {
                id: original_id,
                max: self.max_original_id,
            });
        }
        Ok(())
    }

    // -- Labels and properties ------------------------------------------------

    /// Fast path: local token of a node without properties.
    pub fn label_token(&self, local: &mut LocalContext, labels: &NodeLabelToken) -> u32 {
        local.tokens.token_for(labels)
    }

    /// Slow path: local token of a node with properties. Each key is
    /// registered for the node's labels and gets its accumulator the
    /// first time this lane sees it under that label set.
    pub fn label_token_with_properties(
        &self,
        local: &mut LocalContext,
        labels: &NodeLabelToken,
        properties: &PropertyValues,
    ) -> Result<u32> {
        let token = local.tokens.token_for(labels);
        let resolved = local.tokens.mapping().labels(token);
        let registered = local.registered_keys.entry(token).or_default();
        for (key, value) in properties {
            if registered.contains(key) {
                continue;
            }
            self.accumulator_for(resolved, key, value)?;
            registered.insert(key.clone());
        }
        Ok(token)
    }

    /// Accumulator for `key`, created on first sight. In lazy mode the
    /// value type comes from `first_value`; in fixed mode from the schema.
    pub fn accumulator_for(
        &self,
        labels: &[NodeLabel],
        key: &str,
        first_value: &PropertyValue,
    ) -> Result<Arc<PropertyAccumulator>> {
        self.property_keys.register(labels, key)?;
        if let Some(acc) = read(&self.accumulators).get(key) {
            return Ok(Arc::clone(acc));
        }

        let (value_type, default_value) = match self.property_keys.declared(labels, key) {
            Some(schema) => (schema.value_type(), schema.default_value().clone()),
            None => (first_value.value_type(), DefaultValue::DEFAULT),
        };

        let mut accumulators = write(&self.accumulators);
        if let Some(acc) = accumulators.get(key) {
            return Ok(Arc::clone(acc));
        }
        let acc = Arc::new(PropertyAccumulator::new(key, value_type, default_value)?);
        accumulators.insert(key.to_string(), Arc::clone(&acc));
        self.metrics.record_accumulator_created();
        tracing::debug!(key, value_type = %value_type, "Created property accumulator");
        Ok(acc)
    }

    pub fn accumulator(&self, key: &str) -> Option<Arc<PropertyAccumulator>> {
        read(&self.accumulators).get(key).cloned()
    }

    pub fn property_keys(&self) -> &PropertyKeysByLabel {
        &self.property_keys
    }

    // -- Flush bookkeeping ----------------------------------------------------

    pub fn importer(&self) -> &NodeImporter {
        &self.importer
    }

    pub(crate) fn record_flush(&self, stats: ImportStats, elapsed: Duration) {
        self.imported_nodes.fetch_add(stats.nodes, Ordering::AcqRel);
        self.imported_properties
            .fetch_add(stats.properties, Ordering::AcqRel);
        self.metrics
            .record_flush(elapsed.as_micros() as u64, stats.nodes, stats.properties);
    }

    pub fn imported_nodes(&self) -> u64 {
        self.imported_nodes.load(Ordering::Acquire)
    }

    pub fn imported_properties(&self) -> u64 {
        self.imported_properties.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &ImportMetrics {
        &self.metrics
    }

    // -- Build ----------------------------------------------------------------

    pub(crate) fn registry(&self) -> &LabelRegistry {
        &self.registry
    }

    pub(crate) fn id_map(&self) -> &IdMapBuilder {
        &self.id_map
    }

    /// Move every accumulator out, in key order. Fails if a lane still
    /// holds one, i.e. a flush is running concurrently.
    pub(crate) fn take_accumulators(&self) -> Result<Vec<PropertyAccumulator>> {
        let mut accumulators: Vec<_> = std::mem::take(&mut *write(&self.accumulators))
            .into_iter()
            .collect();
        accumulators.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        accumulators
            .into_iter()
            .map(|(key, acc)| Arc::try_unwrap(acc).map_err(|_| GraphError::AccumulatorInUse(key)))
            .collect()
    }
}

/// Type and declared default of every accumulator, for schema assembly.
pub(crate) fn property_types(
    accumulators: &[PropertyAccumulator],
) -> BTreeMap<String, (ValueType, DefaultValue)> {
    accumulators
        .iter()
        .map(|acc| {
            (
                acc.key().to_string(),
                (acc.value_type(), acc.declared_default().clone()),
            )
        })
        .collect()
}

// ── Per-lane view ──────────────────────────────────────────────────

/// Constructed once per lane, never shared.
pub struct LocalContext {
    tokens: LocalLabelTokens,
    registered_keys: HashMap<u32, BTreeSet<String>>,
}

impl LocalContext {
    pub fn mapping(&self) -> LabelMapping<'_> {
        self.tokens.mapping()
    }

    pub fn labels(&self, local_token: u32) -> &[NodeLabel] {
        self.tokens.mapping().labels(local_token)
    }
}
