//! Composite key encoding for the single-table layout. redb's table key
//! type is a plain `&str`; PK and SK are concatenated with `#` the way a
//! DynamoDB-style single-table design encodes its partition/sort key pair
//! into one string for engines without native composite keys.

use crate::domain::{NodeId, UserId};

pub fn node_prefix(user_id: &UserId) -> String {
    format!("USER#{user_id}#NODE#")
}

pub fn node_key(user_id: &UserId, node_id: NodeId) -> String {
    format!("{}{}", node_prefix(user_id), node_id)
}

/// Canonical bidirectional edge key: the lexicographically-smaller of the
/// two endpoints always owns the record, so `(a, b)` and `(b, a)`
/// materialize to the same item.
pub fn edge_key(user_id: &UserId, a: NodeId, b: NodeId) -> (NodeId, NodeId, String) {
    let (owner, other) = if a <= b { (a, b) } else { (b, a) };
    (owner, other, format!("USER#{user_id}#EDGE#{owner}#{other}"))
}

pub fn keyword_index_key(user_id: &UserId, keyword: &str) -> String {
    format!("USER#{user_id}#KEYWORD#{keyword}")
}

/// Recover `(owner, other)` node ids from an edge key produced by [`edge_key`].
pub fn parse_edge_key(key: &str) -> Option<(NodeId, NodeId)> {
    let mut parts = key.rsplitn(3, '#');
    let other = parts.next()?;
    let owner = parts.next()?;
    Some((owner.parse().ok()?, other.parse().ok()?))
}
