//! Live-tracking endpoints.
//!
//! The browser's geolocation watch reports position-changed events here;
//! geolocation failures are reported as recoverable notices and never block
//! rendering.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{LatLng, Viewport};
use crate::tracking::TrackingState;

use super::{AppState, ErrorResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/position", post(report_position))
        .route("/recenter", post(recenter))
        .route("/state", get(get_tracking_state))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStateResponse {
    /// "idle" before the first fix, "tracking" afterwards
    pub state: String,
    #[schema(value_type = Option<Vec<f64>>)]
    pub driver_position: Option<LatLng>,
    /// Last recoverable geolocation notice, if any
    pub last_notice: Option<String>,
}

/// Accept a position fix from the map surface's geolocation watch. Triggers
/// an itinerary and segment recalculation; the updated render model is
/// pushed to WebSocket subscribers.
#[utoipa::path(
    post,
    path = "/api/tracking/position",
    request_body = PositionReport,
    responses((status = 204, description = "Position accepted")),
    tag = "tracking"
)]
pub async fn report_position(
    State(state): State<AppState>,
    Json(report): Json<PositionReport>,
) -> StatusCode {
    let position: LatLng = [report.latitude, report.longitude];
    state.position_source.update(position).await;
    state.tracker.report_fix(position).await;
    StatusCode::NO_CONTENT
}

/// Viewport centered on the driver at a fixed close zoom. A no-op (409)
/// while no position fix is known.
#[utoipa::path(
    post,
    path = "/api/tracking/recenter",
    responses(
        (status = 200, description = "Viewport centered on the driver", body = Viewport),
        (status = 409, description = "No position fix yet", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn recenter(
    State(state): State<AppState>,
) -> Result<Json<Viewport>, (StatusCode, Json<ErrorResponse>)> {
    state.tracker.recenter().await.map(Json).ok_or_else(|| {
        (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "Tracking is idle, no position to recenter on".to_string(),
            }),
        )
    })
}

/// Current tracking state, last fix and last geolocation notice
#[utoipa::path(
    get,
    path = "/api/tracking/state",
    responses((status = 200, description = "Tracking state", body = TrackingStateResponse)),
    tag = "tracking"
)]
pub async fn get_tracking_state(State(state): State<AppState>) -> Json<TrackingStateResponse> {
    let tracking_state = match state.tracker.state().await {
        TrackingState::Idle => "idle",
        TrackingState::Tracking => "tracking",
    };
    Json(TrackingStateResponse {
        state: tracking_state.to_string(),
        driver_position: state.tracker.driver_position().await,
        last_notice: state.tracker.last_notice().await,
    })
}
