//! Bounded, atomic multi-item commit. Generalizes the teacher's
//! single-`WriteTransaction`-per-call batching
//! (`RedbStorage::put_nodes_batch`/`put_edges_batch`) into an explicit,
//! capped queue with deferred event publication once the transaction lands.

use crate::domain::{DomainEvent, Edge, EventAggregate, Node};
use crate::error::VaultError;
use crate::events::EventBus;
use crate::storage::{EdgeRepository, NodeRepository, RedbStore};
use std::sync::Arc;

pub const MAX_MUTATIONS_PER_COMMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UowState {
    NotStarted,
    Active,
    Committed,
    RolledBack,
}

enum Mutation {
    PutNode(Node),
    DeleteNode(crate::domain::UserId, crate::domain::NodeId),
    PutEdge(Edge),
    DeleteEdge(crate::domain::UserId, crate::domain::NodeId, crate::domain::NodeId),
}

/// A single bounded, atomic commit. `begin` → any number of `enqueue_*`
/// calls (at most [`MAX_MUTATIONS_PER_COMMIT`]) → `commit` or `rollback`.
/// Calling out of order is a programming error, not a domain error —
/// it panics, the way misusing a transaction handle would in the
/// teacher's redb usage.
pub struct UnitOfWork {
    storage: Arc<RedbStore>,
    event_bus: Arc<dyn EventBus>,
    mutations: Vec<Mutation>,
    pending_events: Vec<DomainEvent>,
    state: UowState,
}

impl UnitOfWork {
    pub fn new(storage: Arc<RedbStore>, event_bus: Arc<dyn EventBus>) -> Self {
        UnitOfWork {
            storage,
            event_bus,
            mutations: Vec::new(),
            pending_events: Vec::new(),
            state: UowState::NotStarted,
        }
    }

    pub fn begin(&mut self) {
        if self.state != UowState::NotStarted {
            panic!("UnitOfWork::begin called twice on the same instance");
        }
        self.state = UowState::Active;
    }

    fn require_active(&self) {
        if self.state != UowState::Active {
            panic!("UnitOfWork mutation enqueued while not active");
        }
    }

    fn check_capacity(&self) -> Result<(), VaultError> {
        if self.mutations.len() >= MAX_MUTATIONS_PER_COMMIT {
            return Err(VaultError::validation(format!(
                "unit of work cannot hold more than {MAX_MUTATIONS_PER_COMMIT} mutations"
            )));
        }
        Ok(())
    }

    pub fn enqueue_node(&mut self, node: &mut Node) -> Result<(), VaultError> {
        self.require_active();
        self.check_capacity()?;
        self.pending_events.extend(node.uncommitted_events().iter().cloned());
        node.mark_events_committed();
        self.mutations.push(Mutation::PutNode(node.clone()));
        Ok(())
    }

    pub fn enqueue_delete_node(&mut self, user_id: crate::domain::UserId, id: crate::domain::NodeId) -> Result<(), VaultError> {
        self.require_active();
        self.check_capacity()?;
        self.mutations.push(Mutation::DeleteNode(user_id, id));
        Ok(())
    }

    pub fn enqueue_edge(&mut self, edge: &mut Edge) -> Result<(), VaultError> {
        self.require_active();
        self.check_capacity()?;
        self.pending_events.extend(edge.uncommitted_events().iter().cloned());
        edge.mark_events_committed();
        self.mutations.push(Mutation::PutEdge(edge.clone()));
        Ok(())
    }

    pub fn enqueue_delete_edge(
        &mut self,
        user_id: crate::domain::UserId,
        source: crate::domain::NodeId,
        target: crate::domain::NodeId,
    ) -> Result<(), VaultError> {
        self.require_active();
        self.check_capacity()?;
        self.mutations.push(Mutation::DeleteEdge(user_id, source, target));
        Ok(())
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }

    /// Apply every queued mutation in one redb write transaction, then
    /// publish events in enqueue order. A publish failure is logged but
    /// never rolls back the already-committed storage write — the
    /// transaction boundary is storage-only, per the unit-of-work contract.
    pub fn commit(mut self) -> Result<(), VaultError> {
        self.require_active();
        self.state = UowState::Committed;

        let txn = self.storage.begin_write()?;
        for mutation in &self.mutations {
            match mutation {
                Mutation::PutNode(node) => NodeRepository::put(self.storage.as_ref(), &txn, node)?,
                Mutation::DeleteNode(user_id, id) => {
                    NodeRepository::delete(self.storage.as_ref(), &txn, user_id, *id)?
                }
                Mutation::PutEdge(edge) => EdgeRepository::put(self.storage.as_ref(), &txn, edge)?,
                Mutation::DeleteEdge(user_id, source, target) => {
                    EdgeRepository::delete(self.storage.as_ref(), &txn, user_id, *source, *target)?
                }
            }
        }
        txn.commit()?;

        for event in self.pending_events.drain(..) {
            if let Err(err) = self.event_bus.publish(&event) {
                log::warn!("event publish failed after successful commit: {err}");
            }
        }

        Ok(())
    }

    pub fn rollback(mut self) {
        self.require_active();
        self.state = UowState::RolledBack;
        self.mutations.clear();
        self.pending_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TagSet, UserId};
    use crate::events::NoopEventBus;
    use crate::storage::NodeQueryRepository;
    use tempfile::NamedTempFile;

    fn store() -> Arc<RedbStore> {
        let file = NamedTempFile::new().unwrap();
        Arc::new(RedbStore::open(file.path()).unwrap())
    }

    #[test]
    #[should_panic]
    fn enqueue_before_begin_panics() {
        let mut uow = UnitOfWork::new(store(), Arc::new(NoopEventBus));
        let mut node = Node::create(UserId::new("alice").unwrap(), "hello there friend", TagSet::default()).unwrap();
        uow.enqueue_node(&mut node).unwrap();
    }

    #[test]
    fn commit_persists_and_drains_events() {
        let store = store();
        let mut uow = UnitOfWork::new(store.clone(), Arc::new(NoopEventBus));
        uow.begin();
        let mut node = Node::create(UserId::new("alice").unwrap(), "hello there friend", TagSet::default()).unwrap();
        let id = node.id;
        uow.enqueue_node(&mut node).unwrap();
        assert!(node.uncommitted_events().is_empty());
        uow.commit().unwrap();

        let fetched = NodeQueryRepository::get(store.as_ref(), &UserId::new("alice").unwrap(), id).unwrap();
        assert!(fetched.is_some());
    }

    #[test]
    fn exceeding_capacity_is_a_validation_error() {
        let mut uow = UnitOfWork::new(store(), Arc::new(NoopEventBus));
        uow.begin();
        for _ in 0..MAX_MUTATIONS_PER_COMMIT {
            let mut node = Node::create(UserId::new("alice").unwrap(), "filler content text", TagSet::default()).unwrap();
            uow.enqueue_node(&mut node).unwrap();
        }
        let mut one_more = Node::create(UserId::new("alice").unwrap(), "one too many", TagSet::default()).unwrap();
        let err = uow.enqueue_node(&mut one_more).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn rollback_discards_queued_mutations() {
        let mut uow = UnitOfWork::new(store(), Arc::new(NoopEventBus));
        uow.begin();
        let mut node = Node::create(UserId::new("alice").unwrap(), "will be discarded", TagSet::default()).unwrap();
        uow.enqueue_node(&mut node).unwrap();
        assert_eq!(uow.mutation_count(), 1);
        uow.rollback();
    }
}
