//! Graph traversal algorithms (BFS) and neighbourhood extraction.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::types::Entry;

use super::KnowledgeGraph;

/// Direction for graph traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// Follow outgoing edges: what does X rely on.
    Forward,
    /// Follow incoming edges: what relies on X.
    Backward,
    /// Follow edges in both directions.
    Both,
}

impl TraversalDirection {
    /// Forward only, or both directions when reverse edges are requested.
    pub fn from_reverse_flag(include_reverse: bool) -> Self {
        if include_reverse {
            Self::Both
        } else {
            Self::Forward
        }
    }

    fn forward(self) -> bool {
        matches!(self, Self::Forward | Self::Both)
    }

    fn backward(self) -> bool {
        matches!(self, Self::Backward | Self::Both)
    }
}

/// Result of a traversal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalResult {
    /// Reached node ids in BFS order, start excluded.
    pub visited: Vec<String>,
    /// Hop count at which each node was first reached.
    pub depths: HashMap<String, u32>,
}

/// Breadth-first traversal from `start_id`, up to `max_depth` hops.
///
/// Each node is counted once, at the lowest depth it is reached, which also
/// bounds the walk on cyclic graphs. Outgoing neighbours are expanded before
/// incoming ones.
pub fn bfs_traverse(
    graph: &KnowledgeGraph,
    start_id: &str,
    direction: TraversalDirection,
    max_depth: u32,
) -> TraversalResult {
    let mut result = TraversalResult::default();
    let start = match graph.position(start_id) {
        Some(idx) => idx,
        None => return result,
    };

    let mut visited: HashSet<usize> = HashSet::new();
    let mut queue: VecDeque<(usize, u32)> = VecDeque::new();
    visited.insert(start);
    queue.push_back((start, 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }

        let outgoing: &[usize] = if direction.forward() {
            graph.outgoing(current)
        } else {
            &[]
        };
        let incoming: &[usize] = if direction.backward() {
            graph.incoming(current)
        } else {
            &[]
        };

        for &neighbour in outgoing.iter().chain(incoming) {
            if !visited.insert(neighbour) {
                continue;
            }
            let id = graph.node_at(neighbour).id.clone();
            result.depths.insert(id.clone(), depth + 1);
            result.visited.push(id);
            queue.push_back((neighbour, depth + 1));
        }
    }

    result
}

/// A directed edge between two entries of a [`Network`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
}

/// The neighbourhood of an entry, for visualisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Network {
    pub nodes: Vec<Entry>,
    pub edges: Vec<NetworkEdge>,
}

/// Extract the live entries within `max_depth` hops of `center_id` in either
/// direction, the centre first, with every edge among them.
///
/// Dangling targets and deprecated entries are left out.
pub fn extract_network(graph: &KnowledgeGraph, center_id: &str, max_depth: u32) -> Network {
    let reached = bfs_traverse(graph, center_id, TraversalDirection::Both, max_depth);

    let nodes: Vec<Entry> = std::iter::once(center_id)
        .chain(reached.visited.iter().map(String::as_str))
        .filter_map(|id| graph.node(id)?.entry.as_ref())
        .filter(|e| !e.is_deprecated())
        .cloned()
        .collect();

    let members: HashSet<&str> = nodes.iter().map(|e| e.id.as_str()).collect();
    let edges = nodes
        .iter()
        .flat_map(|e| {
            graph
                .links_from(&e.id)
                .into_iter()
                .filter(|to| members.contains(to))
                .map(|to| NetworkEdge {
                    from: e.id.clone(),
                    to: to.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Network { nodes, edges }
}
