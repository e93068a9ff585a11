//! Concurrent node import: batching lanes, shared context and the
//! top-level `NodesBuilder`.

pub mod batch_buffer;
pub mod context;
pub mod dedup;
pub mod importer;
pub mod local;
pub mod nodes_builder;
pub mod provider;

pub use batch_buffer::{NodesBatchBuffer, NO_PROPERTY};
pub use context::{LocalContext, NodesBuilderContext};
pub use dedup::SeenIds;
pub use importer::{ImportStats, NodeImporter};
pub use local::LocalNodesBuilder;
pub use nodes_builder::{NodeInput, Nodes, NodesBuilder};
pub use provider::LocalBuilderProvider;
