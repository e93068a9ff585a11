//! Top-level node import job.
//!
//! A `NodesBuilder` is shared by reference between producer threads.
//! Each `add_node` is routed to a local worker; `build` closes every
//! worker, freezes the id map and remaps every property accumulator
//! into dense-id stores.
//!
//! ```
//! use rfdb_import::{NodeInput, NodeLabelToken, NodesBuilder, NodesBuilderConfig, PropertyValues};
//!
//! let builder = NodesBuilder::new(NodesBuilderConfig::default()).unwrap();
//! builder.add_node(42, NodeInput::labeled("Person")).unwrap();
//! builder
//!     .add_node(
//!         7,
//!         NodeInput::with_properties(
//!             NodeLabelToken::single("Person"),
//!             PropertyValues::new().with("age", 30i64),
//!         ),
//!     )
//!     .unwrap();
//!
//! let nodes = builder.build().unwrap();
//! assert_eq!(nodes.node_count(), 2);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::builder::context::{property_types, NodesBuilderContext};
use crate::builder::local::LocalNodesBuilder;
use crate::builder::provider::LocalBuilderProvider;
use crate::config::NodesBuilderConfig;
use crate::error::{GraphError, Result};
use crate::executor::ImportPool;
use crate::idmap::IdMap;
use crate::labels::{NodeLabel, NodeLabelToken};
use crate::metrics::MetricsSnapshot;
use crate::properties::NodePropertyValues;
use crate::schema::{NodeSchema, PropertyKeysByLabel};
use crate::values::PropertyValues;

// ── Node input ─────────────────────────────────────────────────────

/// Everything one `add_node` call attaches to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeInput {
    Plain(NodeLabelToken),
    WithProperties(NodeLabelToken, PropertyValues),
}

impl NodeInput {
    pub fn unlabeled() -> Self {
        NodeInput::Plain(NodeLabelToken::empty())
    }

    pub fn labeled(labels: impl Into<NodeLabelToken>) -> Self {
        NodeInput::Plain(labels.into())
    }

    pub fn with_properties(labels: impl Into<NodeLabelToken>, properties: PropertyValues) -> Self {
        NodeInput::WithProperties(labels.into(), properties)
    }

    pub fn labels(&self) -> &NodeLabelToken {
        match self {
            NodeInput::Plain(labels) | NodeInput::WithProperties(labels, _) => labels,
        }
    }

    pub fn into_parts(self) -> (NodeLabelToken, Option<PropertyValues>) {
        match self {
            NodeInput::Plain(labels) => (labels, None),
            NodeInput::WithProperties(labels, properties) => (labels, Some(properties)),
        }
    }
}

impl Default for NodeInput {
    fn default() -> Self {
        NodeInput::unlabeled()
    }
}

impl From<NodeLabelToken> for NodeInput {
    fn from(labels: NodeLabelToken) -> Self {
        NodeInput::Plain(labels)
    }
}

impl From<NodeLabel> for NodeInput {
    fn from(label: NodeLabel) -> Self {
        NodeInput::Plain(NodeLabelToken::single(label))
    }
}

impl From<&str> for NodeInput {
    fn from(label: &str) -> Self {
        NodeInput::Plain(NodeLabelToken::single(label))
    }
}

impl From<PropertyValues> for NodeInput {
    fn from(properties: PropertyValues) -> Self {
        NodeInput::WithProperties(NodeLabelToken::empty(), properties)
    }
}

// ── Builder ────────────────────────────────────────────────────────

pub struct NodesBuilder {
    config: NodesBuilderConfig,
    context: Arc<NodesBuilderContext>,
    provider: LocalBuilderProvider,
    pool: ImportPool,
}

impl NodesBuilder {
    /// Builder that discovers property keys and their types while
    /// importing.
    pub fn new(config: NodesBuilderConfig) -> Result<Self> {
        Self::create(config, PropertyKeysByLabel::lazy())
    }

    /// Builder that accepts only the properties declared in `schema`.
    pub fn with_schema(config: NodesBuilderConfig, schema: NodeSchema) -> Result<Self> {
        let declares_properties = schema
            .labels()
            .any(|label| schema.properties(label).is_some_and(|props| !props.is_empty()));
        if declares_properties && !config.has_properties {
            return Err(GraphError::InvalidConfig(
                "node schema declares properties but has_properties is false".to_string(),
            ));
        }
        Self::create(config, PropertyKeysByLabel::fixed(schema))
    }

    fn create(config: NodesBuilderConfig, property_keys: PropertyKeysByLabel) -> Result<Self> {
        config.validate()?;
        let pool = ImportPool::new(config.concurrency)?;
        let context = Arc::new(NodesBuilderContext::new(&config, property_keys));
        let provider = LocalBuilderProvider::new(
            config.provider,
            &context,
            config.concurrency.value(),
            config.batch_capacity,
        );
        Ok(Self {
            config,
            context,
            provider,
            pool,
        })
    }

    pub fn config(&self) -> &NodesBuilderConfig {
        &self.config
    }

    /// Add one node. Safe to call from many threads at once.
    pub fn add_node(&self, original_id: u64, input: impl Into<NodeInput>) -> Result<()> {
        let input = input.into();
        self.provider
            .with(move |worker| worker.add_node(original_id, input))
    }

    /// A dedicated worker, outside the builder's routing.
    ///
    /// It shares this builder's id map, accumulators and dedup set. The
    /// caller must `close()` it, or drop it empty, before `build()`;
    /// otherwise `build()` fails with `LanesOpen`.
    pub fn lane(&self) -> LocalNodesBuilder {
        LocalNodesBuilder::new(Arc::clone(&self.context), self.config.batch_capacity)
    }

    /// Nodes registered by completed flushes.
    pub fn imported_nodes(&self) -> u64 {
        self.context.imported_nodes()
    }

    pub fn imported_properties(&self) -> u64 {
        self.context.imported_properties()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.context.metrics().snapshot()
    }

    /// Close every worker, then assemble the id map, the property stores
    /// and the schema.
    ///
    /// Fails with `LanesOpen` if a worker from `lane()` is still open or
    /// was dropped with staged entries. Those entries are not imported,
    /// and every remaining lane is closed to further nodes.
    pub fn build(self) -> Result<Nodes> {
        let started = Instant::now();
        tracing::info!(
            imported_nodes = self.imported_nodes(),
            concurrency = self.config.concurrency.value(),
            "Building nodes"
        );

        self.provider.close_all()?;
        self.context.close();

        let open_lanes = self.context.open_lanes();
        if open_lanes > 0 {
            tracing::error!(open_lanes, "Lanes still open at build");
            return Err(GraphError::LanesOpen(open_lanes));
        }

        let id_map = self
            .context
            .id_map()
            .build(self.context.registry(), &self.pool)?;

        let accumulators = self.context.take_accumulators()?;
        let types = property_types(&accumulators);

        let node_count = id_map.node_count();
        let highest_original_id = id_map.highest_original_id();
        let pool = &self.pool;
        let id_map_ref = &id_map;
        let properties = pool.install(|| {
            accumulators
                .into_par_iter()
                .map(|acc| {
                    let key = acc.key().to_string();
                    let values = acc.build(node_count, id_map_ref, highest_original_id, pool)?;
                    Ok((key, values))
                })
                .collect::<Result<BTreeMap<String, NodePropertyValues>>>()
        })?;

        let schema = self
            .context
            .property_keys()
            .build_schema(&id_map.available_labels(), &types);

        tracing::info!(
            node_count,
            property_keys = properties.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built nodes"
        );

        Ok(Nodes {
            schema,
            id_map,
            properties,
        })
    }
}

// ── Result ─────────────────────────────────────────────────────────

/// The outcome of an import: node schema, id map and one dense property
/// store per key.
pub struct Nodes {
    schema: NodeSchema,
    id_map: IdMap,
    properties: BTreeMap<String, NodePropertyValues>,
}

impl Nodes {
    pub fn schema(&self) -> &NodeSchema {
        &self.schema
    }

    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    pub fn node_count(&self) -> u64 {
        self.id_map.node_count()
    }

    pub fn properties(&self) -> &BTreeMap<String, NodePropertyValues> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&NodePropertyValues> {
        self.properties.get(key)
    }

    pub fn into_parts(self) -> (NodeSchema, IdMap, BTreeMap<String, NodePropertyValues>) {
        (self.schema, self.id_map, self.properties)
    }
}
