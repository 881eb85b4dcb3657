use crate::domain::{NodeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields common to every domain event, factored out of the event enum
/// rather than an inheritance hierarchy — a tagged variant per event type
/// plus one shared header, instead of a base class every event extends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHeader {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub user_id: UserId,
    pub timestamp: DateTime<Utc>,
    pub aggregate_version: u64,
}

impl EventHeader {
    pub fn new(aggregate_id: Uuid, user_id: UserId, aggregate_version: u64) -> Self {
        EventHeader {
            event_id: Uuid::now_v7(),
            aggregate_id,
            user_id,
            timestamp: Utc::now(),
            aggregate_version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    NodeCreated { header: EventHeader, content: String },
    NodeContentUpdated { header: EventHeader, content: String },
    NodeTagsUpdated { header: EventHeader, tags: Vec<String> },
    NodeArchived { header: EventHeader },
    NodeDeleted { header: EventHeader },
    EdgeCreated { header: EventHeader, source: NodeId, target: NodeId, weight: f32 },
    EdgeWeightUpdated { header: EventHeader, weight: f32 },
    EdgeDeleted { header: EventHeader },
}

impl DomainEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            DomainEvent::NodeCreated { header, .. }
            | DomainEvent::NodeContentUpdated { header, .. }
            | DomainEvent::NodeTagsUpdated { header, .. }
            | DomainEvent::NodeArchived { header }
            | DomainEvent::NodeDeleted { header }
            | DomainEvent::EdgeCreated { header, .. }
            | DomainEvent::EdgeWeightUpdated { header, .. }
            | DomainEvent::EdgeDeleted { header } => header,
        }
    }
}

/// Capability held solely by aggregates (`Node`, `Edge`) — no base class,
/// no secondary local-event buffer to fall back to and forget about.
pub trait EventAggregate {
    fn uncommitted_events(&self) -> &[DomainEvent];
    fn mark_events_committed(&mut self);
}
