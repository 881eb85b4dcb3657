use super::{AppError, AppResult, AppState, JsonResponse};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;
use vault_core::{
    service::dto::{
        BulkDeleteNodesRequest, BulkDeleteNodesResult, CreateNodeRequest, CreateNodeResult, DeleteNodeResult,
        GraphDto, ListNodesRequest, ListNodesResult, NeighborhoodResult, UpdateNodeRequest, UpdateNodeResult,
    },
    OperationContext, UserId,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_ID_HEADER: &str = "x-user-id";
const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/nodes", post(create_node).get(list_nodes))
        .route("/nodes/bulk-delete", post(bulk_delete_nodes))
        .route("/nodes/:id", get(get_node).patch(update_node).delete(delete_node))
        .route("/nodes/:id/neighborhood", get(get_neighborhood))
        .route("/graph", get(get_graph))
        .with_state(state)
}

fn request_context() -> OperationContext {
    OperationContext::new(Uuid::now_v7().to_string()).with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

/// Every authenticated route requires an `X-User-Id` header — this exercise
/// has no session/auth layer of its own, so the header stands in for one.
fn user_id_from_headers(headers: &HeaderMap) -> AppResult<UserId> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::from(vault_core::VaultError::unauthorized("missing X-User-Id header")))?;
    UserId::new(raw).map_err(AppError::from)
}

fn idempotency_key_from_headers(headers: &HeaderMap) -> Option<String> {
    headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// `vault-core` is synchronous (redb blocks the calling thread), so every
/// call into it is bounced onto the blocking pool rather than run inline on
/// the async reactor thread.
async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, vault_core::VaultError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(AppError::from),
        Err(join_err) => Err(AppError::from(vault_core::VaultError::internal(join_err.to_string()))),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    healthy: bool,
    version: String,
    uptime_seconds: u64,
}

async fn health(State(state): State<AppState>) -> Json<JsonResponse<HealthResponse>> {
    Json(JsonResponse::ok(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    }))
}

async fn create_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateNodeRequest>,
) -> AppResult<Json<JsonResponse<CreateNodeResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let idempotency_key = idempotency_key_from_headers(&headers);
    let ctx = request_context();
    let commands = state.commands.clone();
    let result =
        run_blocking(move || commands.create_node(&ctx, user_id, request, idempotency_key.as_deref())).await?;
    Ok(Json(JsonResponse::ok(result)))
}

async fn update_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateNodeRequest>,
) -> AppResult<Json<JsonResponse<UpdateNodeResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let idempotency_key = idempotency_key_from_headers(&headers);
    let ctx = request_context();
    let commands = state.commands.clone();
    let result =
        run_blocking(move || commands.update_node(&ctx, user_id, id, request, idempotency_key.as_deref())).await?;
    Ok(Json(JsonResponse::ok(result)))
}

async fn delete_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JsonResponse<DeleteNodeResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let idempotency_key = idempotency_key_from_headers(&headers);
    let ctx = request_context();
    let commands = state.commands.clone();
    let result = run_blocking(move || commands.delete_node(&ctx, user_id, id, idempotency_key.as_deref())).await?;
    Ok(Json(JsonResponse::ok(result)))
}

async fn bulk_delete_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkDeleteNodesRequest>,
) -> AppResult<Json<JsonResponse<BulkDeleteNodesResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let idempotency_key = idempotency_key_from_headers(&headers);
    let ctx = request_context();
    let commands = state.commands.clone();
    let result =
        run_blocking(move || commands.bulk_delete_nodes(&ctx, user_id, request, idempotency_key.as_deref())).await?;
    Ok(Json(JsonResponse::ok(result)))
}

async fn get_node(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JsonResponse<vault_core::service::dto::NodeDto>>> {
    let user_id = user_id_from_headers(&headers)?;
    let ctx = request_context();
    let queries = state.queries.clone();
    let node = run_blocking(move || queries.get_node(&ctx, user_id, id)).await?;
    Ok(Json(JsonResponse::ok(node)))
}

#[derive(Debug, Deserialize)]
struct ListNodesQuery {
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    include_archived: bool,
    limit: Option<usize>,
    cursor: Option<String>,
}

async fn list_nodes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListNodesQuery>,
) -> AppResult<Json<JsonResponse<ListNodesResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let ctx = request_context();
    let request = ListNodesRequest {
        tags: query.tags.map(|t| t.split(',').map(str::to_string).collect()).unwrap_or_default(),
        include_archived: query.include_archived,
        limit: query.limit,
        cursor: query.cursor,
    };
    let queries = state.queries.clone();
    let result = run_blocking(move || queries.list_nodes(&ctx, user_id, request)).await?;
    Ok(Json(JsonResponse::ok(result)))
}

#[derive(Debug, Deserialize)]
struct NeighborhoodQuery {
    #[serde(default = "default_depth")]
    depth: u8,
}

fn default_depth() -> u8 {
    1
}

async fn get_neighborhood(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<NeighborhoodQuery>,
) -> AppResult<Json<JsonResponse<NeighborhoodResult>>> {
    let user_id = user_id_from_headers(&headers)?;
    let ctx = request_context();
    let queries = state.queries.clone();
    let result = run_blocking(move || queries.get_node_neighborhood(&ctx, user_id, id, query.depth)).await?;
    Ok(Json(JsonResponse::ok(result)))
}

async fn get_graph(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<JsonResponse<GraphDto>>> {
    let user_id = user_id_from_headers(&headers)?;
    let ctx = request_context();
    let queries = state.queries.clone();
    let result = run_blocking(move || queries.get_graph(&ctx, user_id)).await?;
    Ok(Json(JsonResponse::ok(result)))
}
