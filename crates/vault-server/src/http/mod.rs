mod routes;

pub use routes::create_router;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use vault_core::{CommandService, QueryService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<CommandService>,
    pub queries: Arc<QueryService>,
    pub start_time: Instant,
}

/// JSON response envelope — identical shape regardless of success.
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> JsonResponse<()> {
        JsonResponse { success: false, data: None, error: Some(msg.into()) }
    }
}

/// Wraps a [`vault_core::VaultError`] for the `?` operator in handlers,
/// mapping it to its real HTTP status instead of the teacher's blanket 500.
pub struct AppError(vault_core::VaultError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(JsonResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

impl From<vault_core::VaultError> for AppError {
    fn from(err: vault_core::VaultError) -> Self {
        AppError(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;
