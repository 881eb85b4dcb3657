use crate::error::VaultError;
use crate::storage::RedbStore;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use redb::{ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

const IDEMPOTENCY: TableDefinition<&str, &[u8]> = TableDefinition::new("idempotency");

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
enum RecordState {
    InFlight,
    Completed { payload: Vec<u8> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    state: RecordState,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Record {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of [`IdempotencyStore::claim_or_get`].
#[derive(Debug)]
pub enum Claim {
    /// No prior completed result exists for this fingerprint; the caller
    /// owns the claim and must eventually call `complete` or `abort`.
    Claimed,
    /// A previously completed result exists — return it verbatim instead
    /// of re-executing the operation.
    Hit(Vec<u8>),
}

/// `fingerprint = sha256(user_id || operation || canonical_json(payload))`.
/// `serde_json::to_string` on a value built from already-sorted map keys
/// (callers should pass a `BTreeMap`-backed `Value` or a struct with a
/// stable field order) stands in for "canonical JSON" here.
pub fn fingerprint(user_id: &str, operation: &str, payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(operation.as_bytes());
    hasher.update(b"\0");
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fingerprint scoped by a client-supplied `Idempotency-Key` header rather
/// than the request payload — lets a caller dedupe retries of requests
/// whose payload legitimately changes between attempts.
pub fn fingerprint_with_client_key(user_id: &str, operation: &str, client_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(operation.as_bytes());
    hasher.update(b"\0");
    hasher.update(b"client-key\0");
    hasher.update(client_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub trait IdempotencyStore: Send + Sync {
    fn claim_or_get(&self, fingerprint: &str, ttl: Duration) -> Result<Claim, VaultError>;
    fn complete(&self, fingerprint: &str, payload: Vec<u8>) -> Result<(), VaultError>;
    fn abort(&self, fingerprint: &str) -> Result<(), VaultError>;
}

pub struct RedbIdempotencyStore {
    store: std::sync::Arc<RedbStore>,
}

impl RedbIdempotencyStore {
    pub fn new(store: std::sync::Arc<RedbStore>) -> Self {
        RedbIdempotencyStore { store }
    }
}

impl IdempotencyStore for RedbIdempotencyStore {
    fn claim_or_get(&self, fp: &str, ttl: Duration) -> Result<Claim, VaultError> {
        let txn = self.store.begin_write()?;
        let now = Utc::now();
        let result = {
            let mut table = txn.open_table(IDEMPOTENCY)?;
            let existing = table
                .get(fp)?
                .map(|v| bincode::deserialize::<Record>(v.value()))
                .transpose()?;

            match existing {
                Some(record) if !record.expired(now) => match record.state {
                    RecordState::Completed { payload } => Claim::Hit(payload),
                    RecordState::InFlight => {
                        return Err(VaultError::conflict(
                            "an identical operation is already in flight",
                        ))
                    }
                },
                _ => {
                    let record = Record {
                        state: RecordState::InFlight,
                        created_at: now,
                        expires_at: now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::days(1)),
                    };
                    table.insert(fp, bincode::serialize(&record)?.as_slice())?;
                    Claim::Claimed
                }
            }
        };
        txn.commit()?;
        Ok(result)
    }

    fn complete(&self, fp: &str, payload: Vec<u8>) -> Result<(), VaultError> {
        let txn = self.store.begin_write()?;
        {
            let mut table = txn.open_table(IDEMPOTENCY)?;
            let now = Utc::now();
            let ttl = ChronoDuration::from_std(DEFAULT_TTL).unwrap_or(ChronoDuration::days(1));
            let record = Record {
                state: RecordState::Completed { payload },
                created_at: now,
                expires_at: now + ttl,
            };
            table.insert(fp, bincode::serialize(&record)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn abort(&self, fp: &str) -> Result<(), VaultError> {
        let txn = self.store.begin_write()?;
        {
            let mut table = txn.open_table(IDEMPOTENCY)?;
            table.remove(fp)?;
        }
        txn.commit()?;
        Ok(())
    }
}

/// Tolerant reconstruction of a cached DTO: absorbs unknown or missing
/// fields rather than failing outright, since the cached JSON may predate
/// a field added after it was written.
pub trait IdempotencyReconstruct: Sized {
    fn reconstruct_from_bytes(bytes: &[u8]) -> Option<Self>;
}

impl<T: DeserializeOwned> IdempotencyReconstruct for T {
    fn reconstruct_from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn store() -> RedbIdempotencyStore {
        let file = NamedTempFile::new().unwrap();
        RedbIdempotencyStore::new(std::sync::Arc::new(RedbStore::open(file.path()).unwrap()))
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let payload = serde_json::json!({"a": 1, "b": 2});
        let f1 = fingerprint("alice", "create_node", &payload);
        let f2 = fingerprint("alice", "create_node", &payload);
        assert_eq!(f1, f2);
    }

    #[test]
    fn fingerprint_differs_by_user() {
        let payload = serde_json::json!({"a": 1});
        assert_ne!(
            fingerprint("alice", "create_node", &payload),
            fingerprint("bob", "create_node", &payload)
        );
    }

    #[test]
    fn claim_then_complete_then_hit() {
        let store = store();
        let fp = "fp-1";
        assert!(matches!(store.claim_or_get(fp, DEFAULT_TTL).unwrap(), Claim::Claimed));
        store.complete(fp, b"result-bytes".to_vec()).unwrap();
        match store.claim_or_get(fp, DEFAULT_TTL).unwrap() {
            Claim::Hit(bytes) => assert_eq!(bytes, b"result-bytes"),
            Claim::Claimed => panic!("expected a cache hit"),
        }
    }

    #[test]
    fn concurrent_in_flight_claim_is_conflict() {
        let store = store();
        let fp = "fp-2";
        store.claim_or_get(fp, DEFAULT_TTL).unwrap();
        let err = store.claim_or_get(fp, DEFAULT_TTL).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Conflict);
    }

    #[test]
    fn abort_allows_reclaim() {
        let store = store();
        let fp = "fp-3";
        store.claim_or_get(fp, DEFAULT_TTL).unwrap();
        store.abort(fp).unwrap();
        assert!(matches!(store.claim_or_get(fp, DEFAULT_TTL).unwrap(), Claim::Claimed));
    }
}
