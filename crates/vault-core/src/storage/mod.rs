mod keys;
mod redb_store;
mod repositories;

pub use keys::{edge_key, keyword_index_key, node_key, node_prefix, parse_edge_key};
pub use redb_store::{RedbStore, CURRENT_SCHEMA_VERSION};
pub use repositories::{
    EdgeQueryRepository, EdgeRepository, ListPage, NodeFilter, NodeQueryRepository,
    NodeRepository, StorageStats,
};
