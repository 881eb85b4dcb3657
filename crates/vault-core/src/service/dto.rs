use crate::domain::{Edge, Node, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TITLE_LEN: usize = 80;

/// Nodes carry no separate title field — the wire contract's `title` is an
/// excerpt of `content`, truncated at a char boundary.
fn derive_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or(content).trim();
    match first_line.char_indices().nth(TITLE_LEN) {
        Some((byte_idx, _)) => format!("{}…", &first_line[..byte_idx]),
        None => first_line.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    pub archived: bool,
}

impl From<&Node> for NodeDto {
    fn from(n: &Node) -> Self {
        NodeDto {
            id: n.id,
            user_id: n.user_id.clone(),
            title: derive_title(&n.content),
            content: n.content.clone(),
            keywords: n.keywords.iter().cloned().collect(),
            tags: n.tags.iter().cloned().collect(),
            created_at: n.created_at,
            updated_at: n.updated_at,
            version: n.version,
            archived: n.archived,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeDto {
    pub id: Uuid,
    pub user_id: UserId,
    pub source_node_id: Uuid,
    pub target_node_id: Uuid,
    pub weight: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Edge> for EdgeDto {
    fn from(e: &Edge) -> Self {
        EdgeDto {
            id: e.id,
            user_id: e.user_id.clone(),
            source_node_id: e.source,
            target_node_id: e.target,
            weight: e.weight.value(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeResult {
    pub node: NodeDto,
    pub edges_created: Vec<EdgeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNodeRequest {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNodeResult {
    pub node: NodeDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNodeResult {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteNodesRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub id: Uuid,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDeleteNodesResult {
    pub outcomes: Vec<DeleteOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNodesRequest {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub include_archived: bool,
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNodesResult {
    pub nodes: Vec<NodeDto>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborhoodResult {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
    pub stats: GraphStats,
}
