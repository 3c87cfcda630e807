use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::{backend_error, AppState, ErrorResponse};
use crate::models::RenderModel;

/// Load a route and run the rendering pipeline for it.
///
/// The returned model carries everything the map surface needs: resolved
/// stops, the road itinerary (when the routing service answered), styled
/// segments, the dashed straight-line fallback, and the viewport. Read-only:
/// the tracker's active route is not changed. Use the activate endpoint to
/// start receiving live updates for a route.
#[utoipa::path(
    get,
    path = "/api/routes/{id}/map",
    params(("id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "Render model for the route", body = RenderModel),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn get_route_map(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderModel>, (StatusCode, Json<ErrorResponse>)> {
    let route = state.backend.fetch_route(&id).await.map_err(backend_error)?;
    let model = state.tracker.preview(&route).await;
    Ok(Json(model))
}

/// Make a route the tracker's active route. Subsequent position fixes
/// re-render it and push the updated model to WebSocket subscribers.
#[utoipa::path(
    post,
    path = "/api/routes/{id}/activate",
    params(("id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "Render model for the activated route", body = RenderModel),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn activate_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderModel>, (StatusCode, Json<ErrorResponse>)> {
    let route = state.backend.fetch_route(&id).await.map_err(backend_error)?;

    state.tracker.set_route(route).await;

    let model = state.tracker.model().await.ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Render model unavailable".to_string(),
            }),
        )
    })?;

    Ok(Json(model))
}

/// Invoke the backend's opaque route optimization and re-render the result
#[utoipa::path(
    post,
    path = "/api/routes/{id}/optimize",
    params(("id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "Render model for the optimized route", body = RenderModel),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn optimize_route(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RenderModel>, (StatusCode, Json<ErrorResponse>)> {
    let route = state
        .backend
        .optimize_route(&id)
        .await
        .map_err(backend_error)?;

    state.tracker.set_route(route).await;

    let model = state.tracker.model().await.ok_or_else(|| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Render model unavailable".to_string(),
            }),
        )
    })?;

    Ok(Json(model))
}
