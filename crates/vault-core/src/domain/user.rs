use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owning user identifier. Every node and edge belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, VaultError> {
        let trimmed = raw.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(VaultError::validation("user id must not be empty"));
        }
        if trimmed.chars().count() > 100 {
            return Err(VaultError::validation("user id exceeds 100 characters"));
        }
        Ok(UserId(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty() {
        assert!(UserId::new("   ").is_err());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(UserId::new("  alice  ").unwrap().as_str(), "alice");
    }

    #[test]
    fn rejects_over_100_chars() {
        let long = "a".repeat(101);
        assert!(UserId::new(long).is_err());
    }
}
