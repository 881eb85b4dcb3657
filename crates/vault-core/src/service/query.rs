use crate::context::OperationContext;
use crate::domain::UserId;
use crate::error::VaultError;
use crate::graph;
use crate::service::dto::*;
use crate::storage::{EdgeQueryRepository, NodeFilter, NodeQueryRepository, RedbStore};
use std::sync::Arc;
use uuid::Uuid;

/// Never opens a [`crate::uow::UnitOfWork`] — every method here is a pure
/// read against the current committed state.
pub struct QueryService {
    storage: Arc<RedbStore>,
}

impl QueryService {
    pub fn new(storage: Arc<RedbStore>) -> Self {
        QueryService { storage }
    }

    pub fn get_node(&self, ctx: &OperationContext, user_id: UserId, node_id: Uuid) -> Result<NodeDto, VaultError> {
        ctx.check_cancelled()?;
        let node = self
            .storage
            .get(&user_id, node_id)?
            .ok_or_else(|| VaultError::not_found(format!("node:{node_id}")))?;
        Ok(NodeDto::from(&node))
    }

    pub fn list_nodes(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        request: ListNodesRequest,
    ) -> Result<ListNodesResult, VaultError> {
        ctx.check_cancelled()?;
        let filter = NodeFilter::new()
            .with_tags(request.tags)
            .with_include_archived(request.include_archived)
            .with_limit(request.limit.unwrap_or(50))
            .with_cursor(request.cursor);

        let page = self.storage.list(&user_id, &filter)?;
        Ok(ListNodesResult {
            nodes: page.items.iter().map(NodeDto::from).collect(),
            has_more: page.next_cursor.is_some(),
            next_cursor: page.next_cursor,
            total_count: page.total_count,
        })
    }

    pub fn get_node_neighborhood(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        node_id: Uuid,
        depth: u8,
    ) -> Result<NeighborhoodResult, VaultError> {
        ctx.check_cancelled()?;
        let sub = graph::neighborhood(
            self.storage.as_ref(),
            self.storage.as_ref(),
            &user_id,
            node_id,
            depth,
        )?;
        Ok(NeighborhoodResult {
            nodes: sub.nodes.iter().map(NodeDto::from).collect(),
            edges: sub.edges.iter().map(EdgeDto::from).collect(),
        })
    }

    pub fn get_graph(&self, ctx: &OperationContext, user_id: UserId) -> Result<GraphDto, VaultError> {
        ctx.check_cancelled()?;
        let sub = graph::full_graph(self.storage.as_ref(), &user_id)?;

        let mut edges = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for node in &sub.nodes {
            for edge in EdgeQueryRepository::neighbors(self.storage.as_ref(), &user_id, node.id)? {
                if seen.insert(edge.id) {
                    edges.push(edge);
                }
            }
        }

        let stats = GraphStats {
            node_count: sub.nodes.len(),
            edge_count: edges.len(),
            density: graph::graph_density(sub.nodes.len(), edges.len()),
        };

        Ok(GraphDto {
            nodes: sub.nodes.iter().map(NodeDto::from).collect(),
            edges: edges.iter().map(EdgeDto::from).collect(),
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TagSet;
    use crate::domain::Node;
    use tempfile::NamedTempFile;

    fn svc() -> (QueryService, Arc<RedbStore>) {
        let file = NamedTempFile::new().unwrap();
        let storage = Arc::new(RedbStore::open(file.path()).unwrap());
        (QueryService::new(storage.clone()), storage)
    }

    fn uid() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn get_node_not_found() {
        let (svc, _storage) = svc();
        let ctx = OperationContext::new("r1");
        let err = svc.get_node(&ctx, uid(), Uuid::now_v7()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn list_nodes_empty_store() {
        let (svc, _storage) = svc();
        let ctx = OperationContext::new("r2");
        let result = svc.list_nodes(&ctx, uid(), ListNodesRequest::default()).unwrap();
        assert!(result.nodes.is_empty());
        assert!(result.next_cursor.is_none());
    }

    #[test]
    fn get_node_returns_persisted_node() {
        let (svc, storage) = svc();
        let node = Node::create(uid(), "persisted content here", TagSet::default()).unwrap();
        let txn = storage.begin_write().unwrap();
        crate::storage::NodeRepository::put(storage.as_ref(), &txn, &node).unwrap();
        txn.commit().unwrap();

        let ctx = OperationContext::new("r3");
        let dto = svc.get_node(&ctx, uid(), node.id).unwrap();
        assert_eq!(dto.id, node.id);
    }
}
