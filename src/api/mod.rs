pub mod routes;
pub mod tracking;
pub mod ws;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::providers::backend::{BackendClient, BackendError};
use crate::tracking::{LiveTracker, SharedPositionSource};

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<BackendClient>,
    pub tracker: Arc<LiveTracker>,
    pub position_source: Arc<SharedPositionSource>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/routes", routes::router(state.clone()))
        .nest("/tracking", tracking::router(state.clone()))
        .route("/ws", get(ws::ws_handler).with_state(state))
}

/// Map a backend failure to an HTTP error response. Only backend CRUD
/// failures surface as blocking errors; pipeline failures degrade inside
/// the render model instead.
pub fn backend_error(error: BackendError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &error {
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        BackendError::Network(_) => StatusCode::BAD_GATEWAY,
        BackendError::Api(_) | BackendError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
