mod map;
mod sequence;

pub use map::*;
pub use sequence::*;

use axum::routing::{get, post, put};
use axum::Router;

use super::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/{id}/map", get(get_route_map))
        .route("/{id}/activate", post(activate_route))
        .route("/{id}/optimize", post(optimize_route))
        .route("/{id}/sequence/reorder", put(reorder_sequence))
        .route("/{id}/sequence/start", put(set_start_point))
        .route("/{id}/sequence/end", put(set_end_point))
        .route("/{id}/sequence/reset", put(reset_sequence))
        .with_state(state)
}
