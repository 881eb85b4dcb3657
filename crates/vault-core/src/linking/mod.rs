//! Candidate discovery. Pure function of the query repository it's handed —
//! it never issues its own writes, the caller enqueues whatever it returns.
//! Simplified from the teacher's `linker::auto_linker` (no embeddings, no
//! background cycle, no decay/dedup passes): one metric, run synchronously
//! on node creation.

use crate::domain::{Edge, Node, UserId, Weight};
use crate::error::VaultError;
use crate::storage::NodeQueryRepository;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub threshold: f64,
    pub max_connections: usize,
    /// Whether `update_node` re-runs discovery. Left as a switch per the
    /// spec's own open question — default off.
    pub rediscover_on_update: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            threshold: 0.2,
            max_connections: 20,
            rediscover_on_update: false,
        }
    }
}

pub struct ConnectionEngine {
    config: ConnectionConfig,
}

impl ConnectionEngine {
    pub fn new(config: ConnectionConfig) -> Self {
        ConnectionEngine { config }
    }

    /// Find candidate nodes to connect `new_node` to, via keyword overlap.
    /// `|K ∩ K_candidate| / |K|` where `K` is `new_node`'s own keyword set.
    pub fn discover(
        &self,
        repo: &dyn NodeQueryRepository,
        new_node: &Node,
    ) -> Result<Vec<Edge>, VaultError> {
        if new_node.keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: HashMap<crate::domain::NodeId, (Node, f64)> = HashMap::new();
        for keyword in new_node.keywords.iter() {
            for candidate in repo.find_by_keyword(&new_node.user_id, keyword)? {
                if candidate.id == new_node.id || candidate.archived {
                    continue;
                }
                let score = new_node.keywords.overlap_ratio(&candidate.keywords);
                scored.entry(candidate.id).or_insert((candidate, score));
            }
        }

        let mut ranked: Vec<(Node, f64)> = scored
            .into_values()
            .filter(|(_, score)| *score >= self.config.threshold)
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.updated_at.cmp(&a.0.updated_at))
        });
        ranked.truncate(self.config.max_connections);

        ranked
            .into_iter()
            .map(|(candidate, score)| {
                // Canonical form per §8: source = min(A, B). This is not
                // just a storage-key detail — the persisted/returned edge
                // itself must carry the canonical endpoints.
                let (source, target) = if new_node.id <= candidate.id {
                    (new_node.id, candidate.id)
                } else {
                    (candidate.id, new_node.id)
                };
                Edge::create(
                    new_node.user_id.clone(),
                    source,
                    target,
                    Weight::clamped(score as f32),
                    HashMap::new(),
                )
            })
            .collect()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TagSet;
    use crate::storage::RedbStore;
    use tempfile::NamedTempFile;

    fn store() -> RedbStore {
        let file = NamedTempFile::new().unwrap();
        RedbStore::open(file.path()).unwrap()
    }

    fn uid() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn no_keywords_means_no_candidates() {
        let store = store();
        let engine = ConnectionEngine::new(ConnectionConfig::default());
        let node = Node::create(uid(), "aaa bb cc", TagSet::default()).unwrap();
        let edges = engine.discover(&store, &node).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn finds_overlapping_node_above_threshold() {
        let store = store();
        let user = uid();
        let existing = Node::create(user.clone(), "graph theory and algorithms", TagSet::default()).unwrap();
        let txn = store.begin_write().unwrap();
        crate::storage::NodeRepository::put(&store, &txn, &existing).unwrap();
        txn.commit().unwrap();

        let new_node = Node::create(user, "graph theory notes today", TagSet::default()).unwrap();
        let engine = ConnectionEngine::new(ConnectionConfig::default());
        let edges = engine.discover(&store, &new_node).unwrap();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].source < edges[0].target, "canonical form requires source = min(A, B)");
        assert!(
            (edges[0].source == existing.id && edges[0].target == new_node.id)
                || (edges[0].source == new_node.id && edges[0].target == existing.id)
        );
    }

    #[test]
    fn respects_max_connections_cap() {
        let store = store();
        let user = uid();
        let txn = store.begin_write().unwrap();
        for i in 0..5 {
            let n = Node::create(user.clone(), format!("shared keyword topic number {i}"), TagSet::default()).unwrap();
            crate::storage::NodeRepository::put(&store, &txn, &n).unwrap();
        }
        txn.commit().unwrap();

        let new_node = Node::create(user, "shared keyword topic arrival", TagSet::default()).unwrap();
        let engine = ConnectionEngine::new(ConnectionConfig { max_connections: 2, ..Default::default() });
        let edges = engine.discover(&store, &new_node).unwrap();
        assert!(edges.len() <= 2);
    }
}
