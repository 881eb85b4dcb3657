use crate::error::VaultError;
use redb::{Database, ReadableTable, TableDefinition, MultimapTableDefinition};
use std::path::Path;
use std::sync::Arc;

/// Bumped whenever the on-disk item envelope shape changes in a
/// non-backward-compatible way.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Single-table item store: composite `PK#SK` string key → bincode-encoded
/// item envelope. Mirrors the teacher's per-entity `NODES`/`EDGES` tables
/// collapsed into one table, the way a DynamoDB-style design collapses
/// multiple entity types into one table distinguished by key shape.
pub(crate) const ITEMS: TableDefinition<&str, &[u8]> = TableDefinition::new("items");

/// Inverted keyword index: `USER#<uid>#KEYWORD#<kw>` → node item key.
/// redb's multimap table gives this for free — no GSI simulation needed
/// beyond the key naming convention itself.
pub(crate) const KEYWORD_INDEX: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("keyword_index");

/// Adjacency index: node item key → edge item key, one entry per endpoint,
/// so a neighborhood query never has to scan every edge in the table.
pub(crate) const EDGES_BY_NODE: MultimapTableDefinition<&str, &str> =
    MultimapTableDefinition::new("edges_by_node");

pub(crate) const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Thin wrapper around an open redb database. Repositories borrow either a
/// `&redb::WriteTransaction` (inside a [`crate::uow::UnitOfWork`]) or this
/// store directly for read-only queries that never need a unit of work.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let db = Database::create(path)?;
        let store = RedbStore { db: Arc::new(db) };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), VaultError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut meta = write_txn.open_table(META)?;
            if meta.get("schema_version")?.is_none() {
                meta.insert("schema_version", CURRENT_SCHEMA_VERSION.to_le_bytes().as_slice())?;
            }
            // Touch every table so later reads never hit a missing-table error.
            write_txn.open_table(ITEMS)?;
            write_txn.open_multimap_table(KEYWORD_INDEX)?;
            write_txn.open_multimap_table(EDGES_BY_NODE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32, VaultError> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META)?;
        let raw = meta
            .get("schema_version")?
            .map(|v| v.value().to_vec())
            .unwrap_or_default();
        if raw.len() == 4 {
            Ok(u32::from_le_bytes(raw.try_into().unwrap()))
        } else {
            Ok(0)
        }
    }

    pub fn begin_write(&self) -> Result<redb::WriteTransaction, VaultError> {
        Ok(self.db.begin_write()?)
    }

    pub fn begin_read(&self) -> Result<redb::ReadTransaction, VaultError> {
        Ok(self.db.begin_read()?)
    }

    pub fn stats(&self) -> Result<crate::storage::StorageStats, VaultError> {
        let read_txn = self.db.begin_read()?;
        let items = read_txn.open_table(ITEMS)?;
        let mut node_count = 0u64;
        let mut edge_count = 0u64;
        for entry in items.iter()? {
            let (key, _) = entry?;
            let key = key.value();
            if key.contains("#NODE#") {
                node_count += 1;
            } else if key.contains("#EDGE#") {
                edge_count += 1;
            }
        }
        Ok(crate::storage::StorageStats { node_count, edge_count })
    }
}

impl Clone for RedbStore {
    fn clone(&self) -> Self {
        RedbStore { db: self.db.clone() }
    }
}
