use crate::domain::{Edge, Node, NodeId, UserId};
use crate::error::VaultError;
use crate::storage::keys::{edge_key, keyword_index_key, node_key, node_prefix};
use crate::storage::redb_store::{RedbStore, EDGES_BY_NODE, ITEMS, KEYWORD_INDEX};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    pub node_count: u64,
    pub edge_count: u64,
}

/// Filter + cursor for `ListNodes`. The cursor is the opaque item key of
/// the last node returned by the previous page.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub tags: Vec<String>,
    pub include_archived: bool,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl NodeFilter {
    pub fn new() -> Self {
        NodeFilter { limit: 50, ..Default::default() }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_include_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    /// Count of all items matching the filter, independent of the current
    /// page's cursor/limit.
    pub total_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
enum StoredItem {
    Node(Node),
    Edge(Edge),
}

fn encode_node(node: &Node) -> Result<Vec<u8>, VaultError> {
    Ok(bincode::serialize(&StoredItem::Node(node.clone()))?)
}

fn encode_edge(edge: &Edge) -> Result<Vec<u8>, VaultError> {
    Ok(bincode::serialize(&StoredItem::Edge(edge.clone()))?)
}

fn decode_node(bytes: &[u8]) -> Result<Node, VaultError> {
    match bincode::deserialize(bytes)? {
        StoredItem::Node(n) => Ok(n),
        StoredItem::Edge(_) => Err(VaultError::internal("expected node item, found edge item")),
    }
}

fn decode_edge(bytes: &[u8]) -> Result<Edge, VaultError> {
    match bincode::deserialize(bytes)? {
        StoredItem::Edge(e) => Ok(e),
        StoredItem::Node(_) => Err(VaultError::internal("expected edge item, found node item")),
    }
}

/// Write-side node access. Every method is called with a transaction the
/// caller already owns — the repository never opens or commits its own,
/// since writes belong to exactly one [`crate::uow::UnitOfWork`].
pub trait NodeRepository {
    fn put(&self, txn: &redb::WriteTransaction, node: &Node) -> Result<(), VaultError>;
    fn delete(&self, txn: &redb::WriteTransaction, user_id: &UserId, id: NodeId) -> Result<(), VaultError>;
}

pub trait EdgeRepository {
    fn put(&self, txn: &redb::WriteTransaction, edge: &Edge) -> Result<(), VaultError>;
    fn delete(&self, txn: &redb::WriteTransaction, user_id: &UserId, source: NodeId, target: NodeId) -> Result<(), VaultError>;
}

pub trait NodeQueryRepository {
    fn get(&self, user_id: &UserId, id: NodeId) -> Result<Option<Node>, VaultError>;
    fn list(&self, user_id: &UserId, filter: &NodeFilter) -> Result<ListPage<Node>, VaultError>;
    fn find_by_keyword(&self, user_id: &UserId, keyword: &str) -> Result<Vec<Node>, VaultError>;
}

pub trait EdgeQueryRepository {
    fn neighbors(&self, user_id: &UserId, node_id: NodeId) -> Result<Vec<Edge>, VaultError>;
}

/// redb has no native conditional-put, so optimistic-concurrency is
/// implemented as an explicit read-then-compare inside the caller's write
/// transaction: the stored version must equal `incoming_version - 1` (the
/// version the aggregate had when the caller read it), or the write is a
/// lost-update race and must fail with `Conflict` rather than silently
/// clobbering a concurrent change.
fn check_expected_version(
    items: &redb::Table<'_, &str, &[u8]>,
    key: &str,
    incoming_version: u64,
    decode: impl FnOnce(&[u8]) -> Result<u64, VaultError>,
) -> Result<(), VaultError> {
    let stored_version = items.get(key)?.map(|v| decode(v.value())).transpose()?;
    match (stored_version, incoming_version) {
        (None, 0) => Ok(()),
        (None, _) => Err(VaultError::conflict(format!("item {key} was deleted by a concurrent write"))),
        (Some(stored), incoming) if incoming > 0 && stored == incoming - 1 => Ok(()),
        (Some(stored), incoming) => Err(VaultError::conflict(format!(
            "optimistic lock failed for {key}: stored version {stored}, expected {}",
            incoming.saturating_sub(1)
        ))),
    }
}

impl NodeRepository for RedbStore {
    fn put(&self, txn: &redb::WriteTransaction, node: &Node) -> Result<(), VaultError> {
        let key = node_key(&node.user_id, node.id);
        let bytes = encode_node(node)?;
        {
            let mut items = txn.open_table(ITEMS)?;
            check_expected_version(&items, key.as_str(), node.version, |b| Ok(decode_node(b)?.version))?;
            items.insert(key.as_str(), bytes.as_slice())?;
        }
        let mut keyword_index = txn.open_multimap_table(KEYWORD_INDEX)?;
        for kw in node.keywords.iter() {
            let idx_key = keyword_index_key(&node.user_id, kw);
            keyword_index.insert(idx_key.as_str(), key.as_str())?;
        }
        Ok(())
    }

    fn delete(&self, txn: &redb::WriteTransaction, user_id: &UserId, id: NodeId) -> Result<(), VaultError> {
        let key = node_key(user_id, id);
        let existing = {
            let items = txn.open_table(ITEMS)?;
            let value = items.get(key.as_str())?.map(|v| v.value().to_vec());
            value
        };
        if let Some(bytes) = existing {
            let node = decode_node(&bytes)?;
            let mut keyword_index = txn.open_multimap_table(KEYWORD_INDEX)?;
            for kw in node.keywords.iter() {
                let idx_key = keyword_index_key(user_id, kw);
                keyword_index.remove(idx_key.as_str(), key.as_str())?;
            }
        }
        let mut items = txn.open_table(ITEMS)?;
        items.remove(key.as_str())?;
        Ok(())
    }
}

impl EdgeRepository for RedbStore {
    fn put(&self, txn: &redb::WriteTransaction, edge: &Edge) -> Result<(), VaultError> {
        let (owner, other, key) = edge_key(&edge.user_id, edge.source, edge.target);
        let bytes = encode_edge(edge)?;
        {
            let mut items = txn.open_table(ITEMS)?;
            check_expected_version(&items, key.as_str(), edge.version, |b| Ok(decode_edge(b)?.version))?;
            items.insert(key.as_str(), bytes.as_slice())?;
        }
        let mut by_node = txn.open_multimap_table(EDGES_BY_NODE)?;
        let owner_key = node_key(&edge.user_id, owner);
        let other_key = node_key(&edge.user_id, other);
        by_node.insert(owner_key.as_str(), key.as_str())?;
        by_node.insert(other_key.as_str(), key.as_str())?;
        Ok(())
    }

    fn delete(&self, txn: &redb::WriteTransaction, user_id: &UserId, source: NodeId, target: NodeId) -> Result<(), VaultError> {
        let (owner, other, key) = edge_key(user_id, source, target);
        let mut items = txn.open_table(ITEMS)?;
        items.remove(key.as_str())?;
        let mut by_node = txn.open_multimap_table(EDGES_BY_NODE)?;
        let owner_key = node_key(user_id, owner);
        let other_key = node_key(user_id, other);
        by_node.remove(owner_key.as_str(), key.as_str())?;
        by_node.remove(other_key.as_str(), key.as_str())?;
        Ok(())
    }
}

impl NodeQueryRepository for RedbStore {
    fn get(&self, user_id: &UserId, id: NodeId) -> Result<Option<Node>, VaultError> {
        let key = node_key(user_id, id);
        let read_txn = self.begin_read()?;
        let items = read_txn.open_table(ITEMS)?;
        match items.get(key.as_str())? {
            Some(v) => Ok(Some(decode_node(v.value())?)),
            None => Ok(None),
        }
    }

    fn list(&self, user_id: &UserId, filter: &NodeFilter) -> Result<ListPage<Node>, VaultError> {
        let prefix = node_prefix(user_id);
        let read_txn = self.begin_read()?;
        let items = read_txn.open_table(ITEMS)?;

        let passes_filter = |node: &Node| {
            (filter.include_archived || !node.archived)
                && (filter.tags.is_empty() || filter.tags.iter().any(|t| node.tags.contains(t)))
        };

        // Counted separately from pagination: the page only walks as far as
        // `limit` past the cursor, but `totalCount` covers every matching
        // item regardless of where the page starts or ends.
        let mut total_count = 0usize;
        for entry in items.range(prefix.as_str()..)? {
            let (key, value) = entry?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            if passes_filter(&decode_node(value.value())?) {
                total_count += 1;
            }
        }

        let mut matched = Vec::new();
        let mut past_cursor = filter.cursor.is_none();

        for entry in items.range(prefix.as_str()..)? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(&prefix) {
                break;
            }
            if !past_cursor {
                if Some(key) == filter.cursor.as_deref() {
                    past_cursor = true;
                }
                continue;
            }

            let node = decode_node(value.value())?;
            if !passes_filter(&node) {
                continue;
            }
            matched.push((key.to_string(), node));
            if matched.len() > filter.limit {
                break;
            }
        }

        let next_cursor = if matched.len() > filter.limit {
            matched.pop().map(|(k, _)| k)
        } else {
            None
        };

        Ok(ListPage {
            items: matched.into_iter().map(|(_, n)| n).collect(),
            next_cursor,
            total_count,
        })
    }

    fn find_by_keyword(&self, user_id: &UserId, keyword: &str) -> Result<Vec<Node>, VaultError> {
        let idx_key = keyword_index_key(user_id, keyword);
        let read_txn = self.begin_read()?;
        let keyword_index = read_txn.open_multimap_table(KEYWORD_INDEX)?;
        let items = read_txn.open_table(ITEMS)?;

        let mut nodes = Vec::new();
        for entry in keyword_index.get(idx_key.as_str())? {
            let node_key = entry?;
            if let Some(v) = items.get(node_key.value())? {
                nodes.push(decode_node(v.value())?);
            }
        }
        Ok(nodes)
    }
}

impl EdgeQueryRepository for RedbStore {
    fn neighbors(&self, user_id: &UserId, node_id: NodeId) -> Result<Vec<Edge>, VaultError> {
        let key = node_key(user_id, node_id);
        let read_txn = self.begin_read()?;
        let by_node = read_txn.open_multimap_table(EDGES_BY_NODE)?;
        let items = read_txn.open_table(ITEMS)?;

        let mut edges = Vec::new();
        for entry in by_node.get(key.as_str())? {
            let edge_key = entry?;
            if let Some(v) = items.get(edge_key.value())? {
                edges.push(decode_edge(v.value())?);
            }
        }
        Ok(edges)
    }
}
