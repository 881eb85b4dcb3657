use crate::context::OperationContext;
use crate::domain::{Node, TagSet, UserId};
use crate::error::VaultError;
use crate::events::EventBus;
use crate::idempotency::{
    fingerprint, fingerprint_with_client_key, Claim, IdempotencyReconstruct, IdempotencyStore, DEFAULT_TTL,
};
use crate::linking::ConnectionEngine;
use crate::moderation::{ContentModerator, NoopModerator};
use crate::service::dto::*;
use crate::storage::{NodeQueryRepository, RedbStore};
use crate::uow::UnitOfWork;
use std::sync::Arc;

pub struct CommandService {
    storage: Arc<RedbStore>,
    event_bus: Arc<dyn EventBus>,
    idempotency: Arc<dyn IdempotencyStore>,
    connection_engine: ConnectionEngine,
    moderator: Arc<dyn ContentModerator>,
}

impl CommandService {
    pub fn new(
        storage: Arc<RedbStore>,
        event_bus: Arc<dyn EventBus>,
        idempotency: Arc<dyn IdempotencyStore>,
        connection_engine: ConnectionEngine,
    ) -> Self {
        CommandService { storage, event_bus, idempotency, connection_engine, moderator: Arc::new(NoopModerator) }
    }

    pub fn with_moderator(mut self, moderator: Arc<dyn ContentModerator>) -> Self {
        self.moderator = moderator;
        self
    }

    /// `idempotency_key` stands in for a client-supplied `Idempotency-Key`
    /// header: when present it scopes the fingerprint instead of the request
    /// payload, so a retried call with a legitimately-changed payload still
    /// dedupes against the original attempt.
    pub fn create_node(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        request: CreateNodeRequest,
        idempotency_key: Option<&str>,
    ) -> Result<CreateNodeResult, VaultError> {
        ctx.check_cancelled()?;
        let request_json = serde_json::to_value(&request).map_err(|e| VaultError::internal(e.to_string()))?;

        let fp = match idempotency_key {
            Some(key) => fingerprint_with_client_key(user_id.as_str(), "create_node", key),
            None => fingerprint(user_id.as_str(), "create_node", &request_json),
        };

        match self.idempotency.claim_or_get(&fp, DEFAULT_TTL)? {
            Claim::Hit(bytes) => {
                if let Some(cached) = CreateNodeResult::reconstruct_from_bytes(&bytes) {
                    return Ok(cached);
                }
            }
            Claim::Claimed => {}
        }

        let outcome = (|| -> Result<CreateNodeResult, VaultError> {
            self.moderator.check(&request.content)?;
            let tags = TagSet::new(request.tags);
            let mut node = Node::create(user_id.clone(), request.content, tags)?;

            let mut edges = self.connection_engine.discover(self.storage.as_ref(), &node)?;

            let mut uow = UnitOfWork::new(self.storage.clone(), self.event_bus.clone());
            uow.begin();
            uow.enqueue_node(&mut node)?;
            for edge in edges.iter_mut() {
                uow.enqueue_edge(edge)?;
            }
            uow.commit()?;

            Ok(CreateNodeResult {
                node: NodeDto::from(&node),
                edges_created: edges.iter().map(EdgeDto::from).collect(),
            })
        })();

        match outcome {
            Ok(result) => {
                let bytes = serde_json::to_vec(&result).map_err(|e| VaultError::internal(e.to_string()))?;
                self.idempotency.complete(&fp, bytes)?;
                Ok(result)
            }
            Err(err) => {
                self.idempotency.abort(&fp)?;
                Err(err)
            }
        }
    }

    pub fn update_node(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        node_id: uuid::Uuid,
        request: UpdateNodeRequest,
        idempotency_key: Option<&str>,
    ) -> Result<UpdateNodeResult, VaultError> {
        ctx.check_cancelled()?;
        let request_json = serde_json::to_value(serde_json::json!({ "node_id": node_id, "request": &request }))
            .map_err(|e| VaultError::internal(e.to_string()))?;

        let fp = match idempotency_key {
            Some(key) => fingerprint_with_client_key(user_id.as_str(), "update_node", key),
            None => fingerprint(user_id.as_str(), "update_node", &request_json),
        };

        match self.idempotency.claim_or_get(&fp, DEFAULT_TTL)? {
            Claim::Hit(bytes) => {
                if let Some(cached) = UpdateNodeResult::reconstruct_from_bytes(&bytes) {
                    return Ok(cached);
                }
            }
            Claim::Claimed => {}
        }

        let outcome = (|| -> Result<UpdateNodeResult, VaultError> {
            let mut node = self
                .storage
                .get(&user_id, node_id)?
                .ok_or_else(|| VaultError::not_found(format!("node:{node_id}")))?;

            if let Some(content) = request.content.clone() {
                self.moderator.check(&content)?;
                node.update_content(content)?;
            }
            if let Some(tags) = request.tags.clone() {
                node.update_tags(TagSet::new(tags));
            }

            let mut uow = UnitOfWork::new(self.storage.clone(), self.event_bus.clone());
            uow.begin();
            uow.enqueue_node(&mut node)?;

            if self.connection_engine.config().rediscover_on_update {
                let mut new_edges = self.connection_engine.discover(self.storage.as_ref(), &node)?;
                for edge in new_edges.iter_mut() {
                    uow.enqueue_edge(edge)?;
                }
            }
            uow.commit()?;

            Ok(UpdateNodeResult { node: NodeDto::from(&node) })
        })();

        match outcome {
            Ok(result) => {
                let bytes = serde_json::to_vec(&result).map_err(|e| VaultError::internal(e.to_string()))?;
                self.idempotency.complete(&fp, bytes)?;
                Ok(result)
            }
            Err(err) => {
                self.idempotency.abort(&fp)?;
                Err(err)
            }
        }
    }

    /// Removing a node also removes every edge incident to it — a dangling
    /// edge would otherwise point at a node that no longer exists, breaking
    /// the commit-time invariant that every edge's endpoints exist.
    pub fn delete_node(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        node_id: uuid::Uuid,
        idempotency_key: Option<&str>,
    ) -> Result<DeleteNodeResult, VaultError> {
        ctx.check_cancelled()?;
        let request_json = serde_json::json!({ "node_id": node_id });

        let fp = match idempotency_key {
            Some(key) => fingerprint_with_client_key(user_id.as_str(), "delete_node", key),
            None => fingerprint(user_id.as_str(), "delete_node", &request_json),
        };

        match self.idempotency.claim_or_get(&fp, DEFAULT_TTL)? {
            Claim::Hit(bytes) => {
                if let Some(cached) = DeleteNodeResult::reconstruct_from_bytes(&bytes) {
                    return Ok(cached);
                }
            }
            Claim::Claimed => {}
        }

        let outcome = (|| -> Result<DeleteNodeResult, VaultError> {
            let incident = crate::storage::EdgeQueryRepository::neighbors(self.storage.as_ref(), &user_id, node_id)?;

            let mut uow = UnitOfWork::new(self.storage.clone(), self.event_bus.clone());
            uow.begin();
            for edge in &incident {
                uow.enqueue_delete_edge(user_id.clone(), edge.source, edge.target)?;
            }
            uow.enqueue_delete_node(user_id.clone(), node_id)?;
            uow.commit()?;

            Ok(DeleteNodeResult { id: node_id })
        })();

        match outcome {
            Ok(result) => {
                let bytes = serde_json::to_vec(&result).map_err(|e| VaultError::internal(e.to_string()))?;
                self.idempotency.complete(&fp, bytes)?;
                Ok(result)
            }
            Err(err) => {
                self.idempotency.abort(&fp)?;
                Err(err)
            }
        }
    }

    /// Packs ids into unit-of-work-sized batches bounded by total mutation
    /// count (one `DeleteNode` plus one `DeleteEdge` per incident edge), not
    /// by id count — a node with many edges can alone approach
    /// `MAX_MUTATIONS_PER_COMMIT`. A batch that fails to commit is recorded
    /// as a failed outcome for every id it held; per spec, ids in batches
    /// that were never attempted are left out of the response entirely
    /// rather than guessed at.
    pub fn bulk_delete_nodes(
        &self,
        ctx: &OperationContext,
        user_id: UserId,
        request: BulkDeleteNodesRequest,
        idempotency_key: Option<&str>,
    ) -> Result<BulkDeleteNodesResult, VaultError> {
        ctx.check_cancelled()?;
        let request_json = serde_json::to_value(&request).map_err(|e| VaultError::internal(e.to_string()))?;

        let fp = match idempotency_key {
            Some(key) => fingerprint_with_client_key(user_id.as_str(), "bulk_delete_nodes", key),
            None => fingerprint(user_id.as_str(), "bulk_delete_nodes", &request_json),
        };

        match self.idempotency.claim_or_get(&fp, DEFAULT_TTL)? {
            Claim::Hit(bytes) => {
                if let Some(cached) = BulkDeleteNodesResult::reconstruct_from_bytes(&bytes) {
                    return Ok(cached);
                }
            }
            Claim::Claimed => {}
        }

        let outcome = (|| -> Result<BulkDeleteNodesResult, VaultError> {
            let mut outcomes = Vec::with_capacity(request.ids.len());
            let mut ids = request.ids.into_iter().peekable();

            'batches: loop {
                let mut uow = UnitOfWork::new(self.storage.clone(), self.event_bus.clone());
                uow.begin();
                let mut batch_ids: Vec<uuid::Uuid> = Vec::new();

                while let Some(&id) = ids.peek() {
                    let incident =
                        crate::storage::EdgeQueryRepository::neighbors(self.storage.as_ref(), &user_id, id)?;
                    let needed = incident.len() + 1;

                    if needed > crate::uow::MAX_MUTATIONS_PER_COMMIT {
                        ids.next();
                        outcomes.push(DeleteOutcome {
                            id,
                            success: false,
                            error: Some(format!(
                                "node {id} has too many incident edges to delete in a single commit"
                            )),
                        });
                        continue;
                    }

                    if !batch_ids.is_empty() && uow.mutation_count() + needed > crate::uow::MAX_MUTATIONS_PER_COMMIT {
                        break;
                    }

                    ids.next();
                    for edge in &incident {
                        uow.enqueue_delete_edge(user_id.clone(), edge.source, edge.target)?;
                    }
                    uow.enqueue_delete_node(user_id.clone(), id)?;
                    batch_ids.push(id);
                }

                if batch_ids.is_empty() {
                    break 'batches;
                }

                match uow.commit() {
                    Ok(()) => {
                        for id in batch_ids {
                            outcomes.push(DeleteOutcome { id, success: true, error: None });
                        }
                    }
                    Err(err) => {
                        for id in batch_ids {
                            outcomes.push(DeleteOutcome {
                                id,
                                success: false,
                                error: Some(err.to_string()),
                            });
                        }
                        // Later ids are left untried entirely, per spec.
                        break 'batches;
                    }
                }
            }

            Ok(BulkDeleteNodesResult { outcomes })
        })();

        match outcome {
            Ok(result) => {
                let bytes = serde_json::to_vec(&result).map_err(|e| VaultError::internal(e.to_string()))?;
                self.idempotency.complete(&fp, bytes)?;
                Ok(result)
            }
            Err(err) => {
                self.idempotency.abort(&fp)?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventBus;
    use crate::idempotency::RedbIdempotencyStore;
    use crate::moderation::StubWordListModerator;
    use crate::service::query::QueryService;
    use tempfile::NamedTempFile;

    fn svc() -> CommandService {
        let file = NamedTempFile::new().unwrap();
        let storage = Arc::new(RedbStore::open(file.path()).unwrap());
        CommandService::new(
            storage.clone(),
            Arc::new(NoopEventBus),
            Arc::new(RedbIdempotencyStore::new(storage)),
            ConnectionEngine::new(Default::default()),
        )
    }

    fn uid() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn ctx() -> OperationContext {
        OperationContext::new("r1")
    }

    #[test]
    fn create_node_persists_and_returns_dto() {
        let svc = svc();
        let request = CreateNodeRequest { content: "graph theory notes".into(), tags: vec!["math".into()] };
        let result = svc.create_node(&ctx(), uid(), request, None).unwrap();
        assert_eq!(result.node.content, "graph theory notes");
        assert!(result.edges_created.is_empty());
    }

    #[test]
    fn repeated_payload_fingerprint_returns_cached_result() {
        let svc = svc();
        let request = CreateNodeRequest { content: "idempotent content here".into(), tags: vec![] };
        let first = svc.create_node(&ctx(), uid(), request.clone(), None).unwrap();
        let second = svc.create_node(&ctx(), uid(), request, None).unwrap();
        assert_eq!(first.node.id, second.node.id);
    }

    #[test]
    fn client_idempotency_key_dedupes_even_with_changed_payload() {
        let svc = svc();
        let first = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "first attempt".into(), tags: vec![] }, Some("key-1"))
            .unwrap();
        let second = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "second attempt".into(), tags: vec![] }, Some("key-1"))
            .unwrap();
        assert_eq!(first.node.id, second.node.id);
        assert_eq!(second.node.content, "first attempt");
    }

    #[test]
    fn moderator_rejects_blocked_content() {
        let file = NamedTempFile::new().unwrap();
        let storage = Arc::new(RedbStore::open(file.path()).unwrap());
        let svc = CommandService::new(
            storage.clone(),
            Arc::new(NoopEventBus),
            Arc::new(RedbIdempotencyStore::new(storage)),
            ConnectionEngine::new(Default::default()),
        )
        .with_moderator(Arc::new(StubWordListModerator::new(vec!["blocked".into()])));

        let request = CreateNodeRequest { content: "this is blocked content".into(), tags: vec![] };
        let err = svc.create_node(&ctx(), uid(), request, None).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn update_node_changes_content_and_bumps_version() {
        let svc = svc();
        let created = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "original content".into(), tags: vec![] }, None)
            .unwrap();
        let updated = svc
            .update_node(
                &ctx(),
                uid(),
                created.node.id,
                UpdateNodeRequest { content: Some("revised content".into()), tags: None },
                None,
            )
            .unwrap();
        assert_eq!(updated.node.content, "revised content");
        assert_eq!(updated.node.version, 1);
    }

    #[test]
    fn repeated_update_with_same_idempotency_key_is_not_reapplied() {
        let svc = svc();
        let created = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "original content".into(), tags: vec![] }, None)
            .unwrap();
        let first = svc
            .update_node(
                &ctx(),
                uid(),
                created.node.id,
                UpdateNodeRequest { content: Some("first revision".into()), tags: None },
                Some("update-key"),
            )
            .unwrap();
        let second = svc
            .update_node(
                &ctx(),
                uid(),
                created.node.id,
                UpdateNodeRequest { content: Some("second revision".into()), tags: None },
                Some("update-key"),
            )
            .unwrap();
        assert_eq!(first.node.version, second.node.version);
        assert_eq!(second.node.content, "first revision");
    }

    #[test]
    fn delete_node_then_get_is_not_found() {
        let svc = svc();
        let created = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "will be deleted".into(), tags: vec![] }, None)
            .unwrap();
        svc.delete_node(&ctx(), uid(), created.node.id, None).unwrap();

        let queries = QueryService::new(svc.storage.clone());
        let err = queries.get_node(&ctx(), uid(), created.node.id).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn delete_node_also_removes_incident_edges() {
        let svc = svc();
        let a = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "graph theory notes".into(), tags: vec![] }, None)
            .unwrap();
        let b = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "graph theory basics".into(), tags: vec![] }, None)
            .unwrap();
        assert!(!b.edges_created.is_empty(), "overlapping keywords should have connected a and b");

        svc.delete_node(&ctx(), uid(), a.node.id, None).unwrap();

        let neighbors =
            crate::storage::EdgeQueryRepository::neighbors(svc.storage.as_ref(), &uid(), b.node.id).unwrap();
        assert!(neighbors.is_empty(), "deleting a should have removed its edge to b");
    }

    #[test]
    fn bulk_delete_reports_per_id_outcomes() {
        let svc = svc();
        let created = svc
            .create_node(&ctx(), uid(), CreateNodeRequest { content: "bulk delete me".into(), tags: vec![] }, None)
            .unwrap();
        let missing_id = uuid::Uuid::now_v7();

        let result = svc
            .bulk_delete_nodes(
                &ctx(),
                uid(),
                BulkDeleteNodesRequest { ids: vec![created.node.id, missing_id] },
                None,
            )
            .unwrap();
        assert_eq!(result.outcomes.len(), 2);
        assert!(result.outcomes.iter().all(|o| o.success));
    }
}
