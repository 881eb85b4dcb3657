//! Read-only graph queries: BFS neighborhood and whole-graph export.
//! Simplified from the teacher's `graph::engine::GraphEngineImpl` (which
//! also supports path-finding, cycle detection, and temporal queries not
//! named by the spec) down to the two operations `QueryService` needs.

use crate::domain::{Edge, Node, NodeId, UserId};
use crate::error::VaultError;
use crate::storage::{EdgeQueryRepository, NodeQueryRepository};
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// BFS out from `root` to `depth` hops (1..=3 per the spec's bound),
/// including the root node itself. Mirrors
/// `GraphEngineImpl::neighborhood`'s `TraversalStrategy::Bfs` +
/// `TraversalDirection::Both` + `include_start: true` combination.
pub fn neighborhood(
    nodes: &dyn NodeQueryRepository,
    edges: &dyn EdgeQueryRepository,
    user_id: &UserId,
    root: NodeId,
    depth: u8,
) -> Result<Subgraph, VaultError> {
    let depth = depth.clamp(1, 3);
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<(NodeId, u8)> = VecDeque::new();
    let mut out_nodes = Vec::new();
    let mut out_edges = Vec::new();
    let mut seen_edges = HashSet::new();

    let Some(root_node) = nodes.get(user_id, root)? else {
        return Err(VaultError::not_found(format!("node:{root}")));
    };
    visited.insert(root);
    out_nodes.push(root_node);
    queue.push_back((root, 0));

    while let Some((current, current_depth)) = queue.pop_front() {
        if current_depth >= depth {
            continue;
        }
        for edge in edges.neighbors(user_id, current)? {
            if seen_edges.insert(edge.id) {
                out_edges.push(edge.clone());
            }
            let other = if edge.source == current { edge.target } else { edge.source };
            if visited.insert(other) {
                if let Some(node) = nodes.get(user_id, other)? {
                    out_nodes.push(node);
                }
                queue.push_back((other, current_depth + 1));
            }
        }
    }

    Ok(Subgraph { nodes: out_nodes, edges: out_edges })
}

/// Whole-graph export for `GetGraph`. `StorageStats`-backed counts give
/// the O(1) node/edge totals; density is a single derived float, not an
/// analytics engine.
pub fn full_graph(
    nodes: &dyn NodeQueryRepository,
    user_id: &UserId,
) -> Result<Subgraph, VaultError> {
    let mut all_nodes = Vec::new();
    let mut cursor = None;
    loop {
        let filter = crate::storage::NodeFilter::new()
            .with_include_archived(true)
            .with_limit(200)
            .with_cursor(cursor.clone());
        let page = nodes.list(user_id, &filter)?;
        let done = page.next_cursor.is_none();
        all_nodes.extend(page.items);
        if done {
            break;
        }
        cursor = page.next_cursor;
    }
    Ok(Subgraph { nodes: all_nodes, edges: Vec::new() })
}

pub fn graph_density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0;
    }
    let max_edges = node_count * (node_count - 1) / 2;
    edge_count as f64 / max_edges as f64
}
