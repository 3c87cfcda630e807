//! Manual stop-sequencing endpoints.
//!
//! Each operation loads the route, applies the sequencing change, persists
//! the new ordering to the backend, and reloads the tracker so the map
//! reflects the change immediately.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::{backend_error, AppState, ErrorResponse};
use crate::models::Route;
use crate::services::sequence;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReorderRequest {
    /// Index of the point being moved
    pub from: usize,
    /// Index it is moved to
    pub to: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointFlagRequest {
    /// Delivery point the flag is toggled on
    pub point_id: String,
}

/// Move a point up or down and renumber the whole sequence
#[utoipa::path(
    put,
    path = "/api/routes/{id}/sequence/reorder",
    params(("id" = String, Path, description = "Route identifier")),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Route with the updated ordering", body = Route),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "sequence"
)]
pub async fn reorder_sequence(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)> {
    apply_sequence_op(&state, &id, |points| {
        sequence::reorder(points, request.from, request.to);
    })
    .await
}

/// Toggle the start-point flag; at most one point holds it at a time
#[utoipa::path(
    put,
    path = "/api/routes/{id}/sequence/start",
    params(("id" = String, Path, description = "Route identifier")),
    request_body = PointFlagRequest,
    responses(
        (status = 200, description = "Route with the updated start point", body = Route),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "sequence"
)]
pub async fn set_start_point(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PointFlagRequest>,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)> {
    apply_sequence_op(&state, &id, |points| {
        sequence::set_start(points, &request.point_id);
    })
    .await
}

/// Toggle the end-point flag; at most one point holds it at a time
#[utoipa::path(
    put,
    path = "/api/routes/{id}/sequence/end",
    params(("id" = String, Path, description = "Route identifier")),
    request_body = PointFlagRequest,
    responses(
        (status = 200, description = "Route with the updated end point", body = Route),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "sequence"
)]
pub async fn set_end_point(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PointFlagRequest>,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)> {
    apply_sequence_op(&state, &id, |points| {
        sequence::set_end(points, &request.point_id);
    })
    .await
}

/// Restore the original ordering and clear start/end flags
#[utoipa::path(
    put,
    path = "/api/routes/{id}/sequence/reset",
    params(("id" = String, Path, description = "Route identifier")),
    responses(
        (status = 200, description = "Route with the original ordering", body = Route),
        (status = 404, description = "Route not found", body = ErrorResponse),
        (status = 502, description = "Backend unreachable", body = ErrorResponse)
    ),
    tag = "sequence"
)]
pub async fn reset_sequence(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)> {
    apply_sequence_op(&state, &id, sequence::reset).await
}

async fn apply_sequence_op<F>(
    state: &AppState,
    route_id: &str,
    op: F,
) -> Result<Json<Route>, (StatusCode, Json<ErrorResponse>)>
where
    F: FnOnce(&mut [crate::models::DeliveryPoint]),
{
    let mut route = state
        .backend
        .fetch_route(route_id)
        .await
        .map_err(backend_error)?;

    op(&mut route.delivery_points);

    let payload = sequence::persistable_payload(&route.delivery_points);
    state
        .backend
        .save_sequence(route_id, &payload)
        .await
        .map_err(backend_error)?;

    state.tracker.set_route(route.clone()).await;

    Ok(Json(route))
}
