//! Derived types produced by the rendering pipeline.
//!
//! These are recomputed whenever the route, its points, or the driver
//! position changes and are never persisted back to the backend.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DeliveryStatus, LatLng};

/// A delivery point whose address has been converted to coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStop {
    pub id: String,
    #[schema(value_type = Vec<f64>)]
    pub position: LatLng,
    pub client_name: String,
    /// Formatted single-line address
    pub address: String,
    pub status: DeliveryStatus,
    pub sequence_order: Option<u32>,
}

/// A delivery point that could not be placed on the map. Still shown in
/// tabular views with an "unlocated" affordance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnlocatedStop {
    pub id: String,
    pub client_name: String,
    pub address: String,
    pub status: DeliveryStatus,
}

/// A road-network path between an ordered set of coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    /// Path coordinates in (latitude, longitude) order
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<LatLng>,
    pub distance_km: f64,
    pub duration_min: f64,
}

/// One edge of the rendered path, colored by position in the route and
/// weighted by progress relative to the next stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[schema(value_type = Vec<Vec<f64>>)]
    pub positions: [LatLng; 2],
    /// Hex color, e.g. "#2ecc71"
    pub color: String,
    pub index: usize,
    pub opacity: f64,
    pub weight: u32,
    pub dashed: bool,
}

/// Map center and discrete zoom level derived from a set of coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    #[schema(value_type = Vec<f64>)]
    pub center: LatLng,
    pub zoom: u8,
}

/// Everything the map surface needs to render one route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub route_id: String,
    /// Monotonic tag identifying the pipeline run that produced this model.
    /// Runs superseded by a route switch or a newer fix are discarded.
    pub generation: u64,
    pub stops: Vec<ResolvedStop>,
    pub unlocated: Vec<UnlocatedStop>,
    /// Road-network itinerary; absent when the routing service failed and
    /// the fallback segments should be rendered instead
    pub itinerary: Option<Itinerary>,
    /// Segments along the itinerary path
    pub segments: Vec<Segment>,
    /// Dashed straight-line segments between stop positions, always computed
    pub fallback_segments: Vec<Segment>,
    pub viewport: Option<Viewport>,
    /// Index of the first non-terminal stop, or -1 when all are terminal
    pub next_stop_index: i32,
    #[schema(value_type = Option<Vec<f64>>)]
    pub driver_position: Option<LatLng>,
    pub timestamp: String,
}
