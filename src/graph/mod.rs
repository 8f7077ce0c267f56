//! In-memory knowledge graph: a derived, rebuildable view over the log.

pub mod builder;
pub mod cache;
pub mod knowledge_graph;
pub mod traversal;

pub use builder::GraphBuilder;
pub use cache::GraphCache;
pub use knowledge_graph::{GraphNode, GraphStats, KnowledgeGraph};
pub use traversal::{
    bfs_traverse, extract_network, Network, NetworkEdge, TraversalDirection, TraversalResult,
};
