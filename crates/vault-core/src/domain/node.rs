use crate::domain::events::{DomainEvent, EventAggregate, EventHeader};
use crate::domain::{KeywordSet, TagSet, UserId};
use crate::error::VaultError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NodeId = Uuid;

const MAX_CONTENT_LEN: usize = 20_000;

/// A knowledge node. Constructors reject invalid input — there is no path
/// to an invalid `Node` in memory, only a `Result` that never resolved one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub user_id: UserId,
    pub content: String,
    pub keywords: KeywordSet,
    pub tags: TagSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub archived: bool,

    #[serde(skip)]
    uncommitted: Vec<DomainEvent>,
}

impl Node {
    pub fn create(user_id: UserId, content: impl Into<String>, tags: TagSet) -> Result<Self, VaultError> {
        let content = content.into();
        validate_content(&content)?;

        let now = Utc::now();
        let id = Uuid::now_v7();
        let keywords = KeywordSet::extract(&content);

        let mut node = Node {
            id,
            user_id: user_id.clone(),
            content,
            keywords,
            tags,
            created_at: now,
            updated_at: now,
            version: 0,
            archived: false,
            uncommitted: Vec::new(),
        };

        node.uncommitted.push(DomainEvent::NodeCreated {
            header: EventHeader::new(id, user_id, 0),
            content: node.content.clone(),
        });

        Ok(node)
    }

    pub fn update_content(&mut self, content: impl Into<String>) -> Result<(), VaultError> {
        let content = content.into();
        validate_content(&content)?;

        self.content = content;
        self.keywords = KeywordSet::extract(&self.content);
        self.version += 1;
        self.updated_at = Utc::now();

        self.uncommitted.push(DomainEvent::NodeContentUpdated {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
            content: self.content.clone(),
        });
        Ok(())
    }

    pub fn update_tags(&mut self, tags: TagSet) {
        self.tags = tags;
        self.version += 1;
        self.updated_at = Utc::now();

        self.uncommitted.push(DomainEvent::NodeTagsUpdated {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
            tags: self.tags.iter().cloned().collect(),
        });
    }

    pub fn archive(&mut self) {
        if self.archived {
            return;
        }
        self.archived = true;
        self.version += 1;
        self.updated_at = Utc::now();

        self.uncommitted.push(DomainEvent::NodeArchived {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
        });
    }

    pub fn mark_deleted(&mut self) {
        self.version += 1;
        self.uncommitted.push(DomainEvent::NodeDeleted {
            header: EventHeader::new(self.id, self.user_id.clone(), self.version),
        });
    }
}

fn validate_content(content: &str) -> Result<(), VaultError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(VaultError::validation("node content must not be empty"));
    }
    if trimmed.chars().count() > MAX_CONTENT_LEN {
        return Err(VaultError::validation(format!(
            "node content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

impl EventAggregate for Node {
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
    fn create_rejects_empty_content() {
        assert!(Node::create(uid(), "   ", TagSet::default()).is_err());
    }

    #[test]
    fn create_rejects_oversized_content() {
        let huge = "a".repeat(MAX_CONTENT_LEN + 1);
        assert!(Node::create(uid(), huge, TagSet::default()).is_err());
    }

    #[test]
    fn create_extracts_keywords_and_emits_event() {
        let node = Node::create(uid(), "graph theory and sets", TagSet::default()).unwrap();
        assert!(node.keywords.contains("graph"));
        assert_eq!(node.uncommitted_events().len(), 1);
        assert!(matches!(node.uncommitted_events()[0], DomainEvent::NodeCreated { .. }));
    }

    #[test]
    fn update_content_bumps_version_and_keywords() {
        let mut node = Node::create(uid(), "initial content here", TagSet::default()).unwrap();
        node.mark_events_committed();
        node.update_content("completely different wording now").unwrap();
        assert_eq!(node.version, 1);
        assert!(node.keywords.contains("completely"));
        assert_eq!(node.uncommitted_events().len(), 1);
    }

    #[test]
    fn archive_is_idempotent_on_event_emission() {
        let mut node = Node::create(uid(), "some content", TagSet::default()).unwrap();
        node.mark_events_committed();
        node.archive();
        node.archive();
        assert_eq!(node.uncommitted_events().len(), 1);
        assert!(node.archived);
    }
}
