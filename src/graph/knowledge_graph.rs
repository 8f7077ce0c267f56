//! Core graph structure: an arena of nodes with forward and reverse
//! adjacency, derived wholesale from the entry store.

use std::collections::HashMap;

use serde::Serialize;

use crate::store::{latest_by_id, EntryStore, Snapshot};
use crate::types::{Entry, PmemResult, Resolved};

use super::traversal::{bfs_traverse, TraversalDirection};

/// One node per distinct id seen in the log, either as an entry or only as
/// a link target.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// The entry id.
    pub id: String,
    /// Latest record for the id; `None` for a dangling link target.
    pub entry: Option<Entry>,
}

impl GraphNode {
    /// Whether no record backs this node.
    pub fn is_dangling(&self) -> bool {
        self.entry.is_none()
    }

    /// Resolve to the payload or a dangling reference.
    pub fn resolve(&self) -> Resolved {
        match &self.entry {
            Some(entry) => Resolved::Entry(entry.clone()),
            None => Resolved::Dangling {
                id: self.id.clone(),
            },
        }
    }
}

/// Summary statistics about a built graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub dangling_nodes: usize,
    pub max_outgoing_links: usize,
    pub max_incoming_links: usize,
}

/// Directed graph over entry ids. An edge A -> B exists when A's latest
/// record lists B in `links`.
///
/// The graph is immutable once built; a fresh view is a fresh build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    /// All nodes, in order of first observation.
    nodes: Vec<GraphNode>,
    /// id -> position in `nodes`.
    index: HashMap<String, usize>,
    /// Outgoing neighbours per node, in link declaration order.
    forward: Vec<Vec<usize>>,
    /// Incoming neighbours per node, in file order of the linking entries.
    reverse: Vec<Vec<usize>>,
    /// Number of log lines skipped while reading the source snapshot.
    corrupt_lines: usize,
}

impl KnowledgeGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full scan of the store and derivation of a new graph.
    pub fn build(store: &EntryStore) -> PmemResult<Self> {
        let snapshot = store.snapshot()?;
        let graph = Self::from_snapshot(snapshot);
        log::debug!(
            "built graph from {}: {} nodes, {} edges",
            store.path().display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Derive a graph from a latest-wins snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut graph = Self::from_latest(snapshot.entries);
        graph.corrupt_lines = snapshot.corrupt_lines;
        graph
    }

    /// Derive a graph from raw records; repeated ids collapse to their last
    /// record before any edge is added.
    pub fn from_entries(records: Vec<Entry>) -> Self {
        Self::from_latest(latest_by_id(records))
    }

    fn from_latest(entries: Vec<Entry>) -> Self {
        let mut graph = Self::new();

        // Real entries first so their positions follow file order.
        for entry in entries {
            let idx = graph.intern(&entry.id);
            graph.nodes[idx].entry = Some(entry);
        }

        for source in 0..graph.nodes.len() {
            let links = match &graph.nodes[source].entry {
                Some(entry) => entry.links.clone(),
                None => continue,
            };
            for target_id in links {
                let target = graph.intern(&target_id);
                if !graph.forward[source].contains(&target) {
                    graph.forward[source].push(target);
                    graph.reverse[target].push(source);
                }
            }
        }

        graph
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(GraphNode {
            id: id.to_string(),
            entry: None,
        });
        self.forward.push(Vec::new());
        self.reverse.push(Vec::new());
        self.index.insert(id.to_string(), idx);
        idx
    }

    /// Number of nodes, dangling placeholders included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct (source, target) edges.
    pub fn edge_count(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    /// Number of placeholder nodes.
    pub fn dangling_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_dangling()).count()
    }

    /// Lines skipped while reading the log this graph was built from.
    pub fn corrupt_lines(&self) -> usize {
        self.corrupt_lines
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// All nodes (immutable slice).
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// All edges as (source, target) id pairs.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.forward
            .iter()
            .enumerate()
            .flat_map(|(src, targets)| {
                targets
                    .iter()
                    .map(move |&dst| (self.nodes[src].id.as_str(), self.nodes[dst].id.as_str()))
            })
            .collect()
    }

    /// Ids that `id` links to.
    pub fn links_from(&self, id: &str) -> Vec<&str> {
        self.neighbour_ids(id, &self.forward)
    }

    /// Ids that link to `id`.
    pub fn links_to(&self, id: &str) -> Vec<&str> {
        self.neighbour_ids(id, &self.reverse)
    }

    fn neighbour_ids<'a>(&'a self, id: &str, adjacency: &'a [Vec<usize>]) -> Vec<&'a str> {
        match self.index.get(id) {
            Some(&idx) => adjacency[idx]
                .iter()
                .map(|&n| self.nodes[n].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: usize) -> &GraphNode {
        &self.nodes[idx]
    }

    pub(crate) fn outgoing(&self, idx: usize) -> &[usize] {
        &self.forward[idx]
    }

    pub(crate) fn incoming(&self, idx: usize) -> &[usize] {
        &self.reverse[idx]
    }

    /// Nodes within `depth` hops of `id` (the start itself excluded), via
    /// outgoing edges and, if `include_reverse`, incoming ones too.
    ///
    /// An unknown id yields an empty result.
    pub fn get_related(&self, id: &str, depth: u32, include_reverse: bool) -> Vec<Resolved> {
        let direction = TraversalDirection::from_reverse_flag(include_reverse);
        self.resolve_all(&bfs_traverse(self, id, direction, depth).visited)
    }

    /// Everything `id` relies on, transitively.
    pub fn dependencies(&self, id: &str) -> Vec<Resolved> {
        self.resolve_all(&bfs_traverse(self, id, TraversalDirection::Forward, u32::MAX).visited)
    }

    /// Entries that link directly to `id`.
    pub fn dependents(&self, id: &str) -> Vec<Resolved> {
        self.resolve_all(&bfs_traverse(self, id, TraversalDirection::Backward, 1).visited)
    }

    fn resolve_all(&self, ids: &[String]) -> Vec<Resolved> {
        ids.iter()
            .filter_map(|id| self.node(id))
            .map(GraphNode::resolve)
            .collect()
    }

    /// Summary statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            dangling_nodes: self.dangling_count(),
            max_outgoing_links: self.forward.iter().map(Vec::len).max().unwrap_or(0),
            max_incoming_links: self.reverse.iter().map(Vec::len).max().unwrap_or(0),
        }
    }
}
