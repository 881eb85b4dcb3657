use crate::domain::events::{DomainEvent, EventAggregate, EventHeader};
use crate::domain::node::NodeId;
use crate::domain::UserId;
use crate::error::VaultError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type EdgeId = Uuid;

/// Relationship strength, clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Weight(f32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightBand {
    Weak,
    Medium,
    Strong,
}

impl Weight {
    pub fn new(value: f32) -> Result<Self, VaultError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(VaultError::validation(format!(
                "weight {value} out of range [0.0, 1.0]"
            )));
        }
        Ok(Weight(value))
    }

    pub fn clamped(value: f32) -> Self {
        Weight(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn band(self) -> WeightBand {
        if self.0 < 0.3 {
            WeightBand::Weak
        } else if self.0 < 0.7 {
            WeightBand::Medium
        } else {
            WeightBand::Strong
        }
    }
}

/// A typed, directed connection between two nodes belonging to the same user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub user_id: UserId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: Weight,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,

    #[serde(skip)]
    uncommitted: Vec<DomainEvent>,
}

impl Edge {
    pub fn create(
        user_id: UserId,
        source: NodeId,
        target: NodeId,
        weight: Weight,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Self, VaultError> {
        if source == target {
            return Err(VaultError::validation("an edge cannot connect a node to itself"));
        }

        let now = Utc::now();
        let id = Uuid::now_v7();

        let mut edge = Edge {
            id,
            user_id: user_id.clone(),
            source,
            target,
            weight,
            metadata,
            created_at: now,
            updated_at: now,
            version: 0,
            uncommitted: Vec::new(),
        };

        edge.uncommitted.push(DomainEvent::EdgeCreated {
            header: EventHeader::new(id, user_id, 0),
            source,
            target,
            weight: weight.value(),
        });

        Ok(edge)
    }

    pub fn update_weight(&mut self, weight: Weight) {
        self.weight = weight;
        self.version += 1;
        self.updated_at = Utc::now();

        self.uncommitted.push(DomainEvent::EdgeWeightUpdated {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
            weight: weight.value(),
        });
    }

    pub fn mark_deleted(&mut self) {
        self.version += 1;
        self.uncommitted.push(DomainEvent::EdgeDeleted {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
        });
    }
}

impl EventAggregate for Edge {
    fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted
    }

    fn mark_events_committed(&mut self) {
        self.uncommitted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn rejects_self_edge() {
        let n = Uuid::now_v7();
        let err = Edge::create(uid(), n, n, Weight::clamped(0.5), HashMap::new()).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
    }

    #[test]
    fn weight_rejects_out_of_range() {
        assert!(Weight::new(1.5).is_err());
        assert!(Weight::new(-0.1).is_err());
        assert!(Weight::new(0.5).is_ok());
    }

    #[test]
    fn weight_bands() {
        assert_eq!(Weight::clamped(0.1).band(), WeightBand::Weak);
        assert_eq!(Weight::clamped(0.5).band(), WeightBand::Medium);
        assert_eq!(Weight::clamped(0.9).band(), WeightBand::Strong);
    }

    #[test]
    fn weight_bands_at_boundaries() {
        assert_eq!(Weight::clamped(0.29).band(), WeightBand::Weak);
        assert_eq!(Weight::clamped(0.3).band(), WeightBand::Medium);
        assert_eq!(Weight::clamped(0.32).band(), WeightBand::Medium);
        assert_eq!(Weight::clamped(0.69).band(), WeightBand::Medium);
        assert_eq!(Weight::clamped(0.7).band(), WeightBand::Strong);
        assert_eq!(Weight::clamped(0.68).band(), WeightBand::Medium);
    }

    #[test]
    fn create_emits_edge_created() {
        let edge = Edge::create(
            uid(),
            Uuid::now_v7(),
            Uuid::now_v7(),
            Weight::clamped(0.3),
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(edge.uncommitted_events().len(), 1);
    }
}
