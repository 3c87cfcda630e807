//! The rendering pipeline: `Route × driver position -> RenderModel`.
//!
//! Pure at the seams: the external lookups are injected providers, so the
//! whole flow is testable without a rendering surface. Stages run in
//! dependency order: geocode missing coordinates (strictly sequential, with
//! rate-limit spacing between network calls), sort by the manual sequence,
//! request the road itinerary, derive styled segments plus the straight-line
//! fallback, and compute the viewport.

use std::time::Duration;
use tracing::{debug, info};

use crate::models::{RenderModel, ResolvedStop, Route, UnlocatedStop};
use crate::providers::geocode::GeocodeResolver;
use crate::providers::routing::ItineraryCalculator;
use crate::services::{progress, sequence, viewport};

pub struct RenderPipeline {
    geocoder: GeocodeResolver,
    calculator: ItineraryCalculator,
    /// Spacing inserted between geocoding network calls. Cache hits are free.
    request_spacing: Duration,
}

impl RenderPipeline {
    pub fn new(
        geocoder: GeocodeResolver,
        calculator: ItineraryCalculator,
        request_spacing: Duration,
    ) -> Self {
        Self {
            geocoder,
            calculator,
            request_spacing,
        }
    }

    /// Run the full pipeline for one route. Never fails: unresolvable
    /// addresses are dropped from the spatial output and a routing failure
    /// leaves only the fallback segment set.
    pub async fn build(&self, route: &Route) -> RenderModel {
        let mut points = route.delivery_points.clone();
        sequence::sort_for_rendering(&mut points);

        let mut stops = Vec::new();
        let mut unlocated = Vec::new();
        // Geocoding a list is strictly sequential because of the provider's
        // rate limit; an N-point route takes at least N-1 seconds when
        // nothing is cached.
        let mut needs_spacing = false;
        for point in &points {
            let position = match point.address.position() {
                Some(position) => Some(position),
                None => {
                    // Only sleep when the lookup will actually hit the
                    // network; cache hits and incomplete addresses are free
                    let outcome = match self.geocoder.cached(&point.address).await {
                        Some(outcome) => outcome,
                        None => {
                            if needs_spacing {
                                tokio::time::sleep(self.request_spacing).await;
                            }
                            self.geocoder.resolve(&point.address).await
                        }
                    };
                    if outcome.from_network {
                        needs_spacing = true;
                    }
                    outcome.position
                }
            };

            match position {
                Some(position) => stops.push(ResolvedStop {
                    id: point.id.clone(),
                    position,
                    client_name: point.client_name.clone(),
                    address: point.address.formatted(),
                    status: point.delivery_status,
                    sequence_order: point.sequence_order,
                }),
                None => unlocated.push(UnlocatedStop {
                    id: point.id.clone(),
                    client_name: point.client_name.clone(),
                    address: point.address.formatted(),
                    status: point.delivery_status,
                }),
            }
        }

        let next_stop_index = progress::next_stop_index(&stops);
        let total_stops = stops.len();

        // The live driver position, when known, is prefixed to the path
        let mut path_positions = Vec::with_capacity(total_stops + 1);
        if let Some(driver_position) = route.driver_position {
            path_positions.push(driver_position);
        }
        path_positions.extend(stops.iter().map(|stop| stop.position));

        let itinerary = self.calculator.calculate(&path_positions).await;

        let segments = itinerary
            .as_ref()
            .map(|itinerary| {
                progress::styled_segments(&itinerary.coordinates, next_stop_index, total_stops)
            })
            .unwrap_or_default();
        let fallback_segments =
            progress::fallback_segments(&path_positions, next_stop_index, total_stops);

        let viewport = viewport::compute_bounds(&path_positions);

        if !unlocated.is_empty() {
            debug!(
                route_id = %route.id,
                unlocated = unlocated.len(),
                "Some delivery points could not be placed on the map"
            );
        }
        info!(
            route_id = %route.id,
            stops = total_stops,
            next_stop_index,
            has_itinerary = itinerary.is_some(),
            "Render model built"
        );

        RenderModel {
            route_id: route.id.clone(),
            generation: 0,
            stops,
            unlocated,
            itinerary,
            segments,
            fallback_segments,
            viewport,
            next_stop_index,
            driver_position: route.driver_position,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
