//! Pluggable content moderation, invoked by the command layer before a
//! node's content is accepted — not baked into `Node::create` itself, since
//! the domain constructor stays a pure function of its inputs and
//! moderation policy is an external, swappable collaborator (the way
//! `EventBus` is injected rather than hardwired into the aggregates).

use crate::error::VaultError;

pub trait ContentModerator: Send + Sync {
    fn check(&self, content: &str) -> Result<(), VaultError>;
}

/// Case-insensitive blocklist match. A real deployment would swap this for
/// a call to a moderation API; this stands in for one.
pub struct StubWordListModerator {
    blocked: Vec<String>,
}

impl StubWordListModerator {
    pub fn new(blocked: Vec<String>) -> Self {
        StubWordListModerator { blocked: blocked.into_iter().map(|w| w.to_lowercase()).collect() }
    }
}

impl Default for StubWordListModerator {
    fn default() -> Self {
        StubWordListModerator::new(Vec::new())
    }
}

impl ContentModerator for StubWordListModerator {
    fn check(&self, content: &str) -> Result<(), VaultError> {
        let lowered = content.to_lowercase();
        for word in &self.blocked {
            if lowered.contains(word.as_str()) {
                return Err(VaultError::validation(format!("content contains blocked term \"{word}\"")));
            }
        }
        Ok(())
    }
}

/// Always accepts. Default when no blocklist is configured.
pub struct NoopModerator;

impl ContentModerator for NoopModerator {
    fn check(&self, _content: &str) -> Result<(), VaultError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_rejects_case_insensitively() {
        let moderator = StubWordListModerator::new(vec!["forbidden".to_string()]);
        assert!(moderator.check("this is FORBIDDEN content").is_err());
    }

    #[test]
    fn blocklist_allows_clean_content() {
        let moderator = StubWordListModerator::new(vec!["forbidden".to_string()]);
        assert!(moderator.check("perfectly fine content").is_ok());
    }

    #[test]
    fn noop_moderator_always_accepts() {
        assert!(NoopModerator.check("anything at all").is_ok());
    }
}
