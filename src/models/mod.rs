pub mod render;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use render::{Itinerary, RenderModel, ResolvedStop, Segment, UnlocatedStop, Viewport};

/// A coordinate pair in (latitude, longitude) order.
///
/// Everything inside this service uses latitude-first order; the road-routing
/// boundary in `providers::routing` swaps to (longitude, latitude) in both
/// directions because that is what the routing service expects.
pub type LatLng = [f64; 2];

/// Postal address of a delivery point. Coordinates are optional; when absent
/// they must be resolved by geocoding before the point can be placed on a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Address {
    /// Position from already-known coordinates, if both are present
    pub fn position(&self) -> Option<LatLng> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        }
    }

    /// Single-line display form, skipping empty parts
    pub fn formatted(&self) -> String {
        let locality = match (self.postal_code.is_empty(), self.city.is_empty()) {
            (false, false) => format!("{} {}", self.postal_code, self.city),
            (true, false) => self.city.clone(),
            (false, true) => self.postal_code.clone(),
            (true, true) => String::new(),
        };
        [self.street.as_str(), locality.as_str(), self.country.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl DeliveryStatus {
    /// Whether the point needs no further visit (delivered or given up)
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

/// One stop on a delivery route, tied to a client and an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPoint {
    pub id: String,
    pub client_name: String,
    pub client_phone_number: Option<String>,
    pub client_note: Option<String>,
    pub address: Address,
    pub delivery_status: DeliveryStatus,
    pub planned_time: Option<DateTime<Utc>>,
    pub actual_time: Option<DateTime<Utc>>,
    /// Display/route order. Points without an explicit order sort last.
    pub sequence_order: Option<u32>,
    #[serde(default)]
    pub is_start_point: bool,
    #[serde(default)]
    pub is_end_point: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub status: RouteStatus,
    pub delivery_points: Vec<DeliveryPoint>,
    /// Last known driver position, when the route is being driven
    #[schema(value_type = Option<Vec<f64>>)]
    pub driver_position: Option<LatLng>,
}
