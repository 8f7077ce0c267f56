//! Process memory: an append-only log of knowledge entries with a derived,
//! traversable link graph.
//!
//! Entries (decisions, milestones, learnings) are stored one JSON object per
//! line. The knowledge graph is rebuilt from the log on demand and answers
//! "what does X rely on" and "what relies on X".

pub mod cli;
pub mod config;
pub mod engine;
pub mod graph;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::StoreConfig;
pub use engine::{ContextOptions, ImportFormat, ImportReport, QueryEngine, WriteEngine};
pub use graph::{
    GraphBuilder, GraphCache, GraphNode, GraphStats, KnowledgeGraph, Network, TraversalDirection,
};
pub use store::{EntryStore, LogReader, LogWriter, ScanReport, SearchFilter, SearchResult};
pub use types::{
    now_timestamp, CorruptLine, Entry, EntryBuilder, EntrySummary, PmemError, PmemResult,
    Resolved, Versioned, DEFAULT_DEPTH,
};
