//! RFDB bulk node import.
//!
//! Many producer threads add nodes keyed by sparse original ids, each
//! with labels and typed properties. Nodes are staged per lane and
//! flushed in batches into a shared id map and per-key property
//! accumulators. `NodesBuilder::build` assigns dense mapped ids and
//! remaps every accumulator into a dense, default-sparse property store.

pub mod builder;
pub mod collections;
pub mod config;
pub mod error;
pub mod executor;
pub mod idmap;
pub mod labels;
pub mod metrics;
pub mod properties;
pub mod resource;
pub mod schema;
pub mod values;

pub use builder::{LocalNodesBuilder, NodeInput, Nodes, NodesBuilder};
pub use config::{Concurrency, NodesBuilderConfig, ProviderMode};
pub use error::{GraphError, Result};
pub use executor::ImportPool;
pub use idmap::{IdMap, PartialIdMap, NOT_FOUND};
pub use labels::{NodeLabel, NodeLabelToken};
pub use metrics::{ImportMetrics, MetricsSnapshot};
pub use properties::NodePropertyValues;
pub use resource::{ResourceManager, SystemResources, TuningProfile};
pub use schema::{NodeSchema, PropertySchema};
pub use values::{DefaultValue, PropertyValue, PropertyValues, ValueType};
