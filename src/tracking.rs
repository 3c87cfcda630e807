//! Live driver tracking.
//!
//! The tracker owns the driver's live position and re-runs the rendering
//! pipeline whenever the position or the active route changes. Position
//! fixes arrive two ways: continuous pushes from the map surface (the
//! browser's geolocation watch POSTs position-changed events) and a
//! periodic re-poll of the [`PositionSource`] every 30 seconds while
//! tracking. Rebuilt models fan out to WebSocket subscribers over a
//! broadcast channel.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::models::{LatLng, RenderModel, Route, Viewport};
use crate::services::pipeline::RenderPipeline;

/// Geolocation failure modes. All of them are recoverable notices, never
/// fatal: tracking stays in its current state until a future fix succeeds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Position unavailable")]
    Unavailable,
    #[error("Position request timed out")]
    Timeout,
}

/// One-shot position query against the host platform's geolocation
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<LatLng, PositionError>;
}

/// Position source backed by the most recent fix pushed over the API.
/// The browser's geolocation watch reports here; the periodic re-poll
/// re-reads it.
#[derive(Default)]
pub struct SharedPositionSource {
    latest: RwLock<Option<LatLng>>,
}

impl SharedPositionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn update(&self, position: LatLng) {
        *self.latest.write().await = Some(position);
    }
}

#[async_trait]
impl PositionSource for SharedPositionSource {
    async fn current_position(&self) -> Result<LatLng, PositionError> {
        self.latest.read().await.ok_or(PositionError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// No position fix yet
    Idle,
    /// Position known, periodic re-poll active
    Tracking,
}

/// Sender side of the render model fan-out
pub type RenderUpdateSender = broadcast::Sender<RenderModel>;

pub struct LiveTracker {
    pipeline: RenderPipeline,
    source: Arc<dyn PositionSource>,
    route: RwLock<Option<Route>>,
    position: RwLock<Option<LatLng>>,
    /// Last recoverable geolocation notice, surfaced to the caller
    notice: RwLock<Option<String>>,
    /// Bumped on every route switch and accepted fix; pipeline runs carrying
    /// an older generation are discarded on arrival
    generation: AtomicU64,
    model: RwLock<Option<RenderModel>>,
    updates_tx: RenderUpdateSender,
    poll_interval: Duration,
    /// Trailing-edge debounce for position-triggered rebuilds; zero disables
    debounce: Duration,
    recenter_zoom: u8,
}

impl LiveTracker {
    pub fn new(
        pipeline: RenderPipeline,
        source: Arc<dyn PositionSource>,
        poll_interval: Duration,
        debounce: Duration,
        recenter_zoom: u8,
    ) -> Self {
        let (updates_tx, _) = broadcast::channel(16);
        Self {
            pipeline,
            source,
            route: RwLock::new(None),
            position: RwLock::new(None),
            notice: RwLock::new(None),
            generation: AtomicU64::new(0),
            model: RwLock::new(None),
            updates_tx,
            poll_interval,
            debounce,
            recenter_zoom,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderModel> {
        self.updates_tx.subscribe()
    }

    pub async fn state(&self) -> TrackingState {
        if self.position.read().await.is_some() {
            TrackingState::Tracking
        } else {
            TrackingState::Idle
        }
    }

    pub async fn driver_position(&self) -> Option<LatLng> {
        *self.position.read().await
    }

    pub async fn last_notice(&self) -> Option<String> {
        self.notice.read().await.clone()
    }

    /// Latest committed render model, if a route is loaded
    pub async fn model(&self) -> Option<RenderModel> {
        self.model.read().await.clone()
    }

    /// Render a route without making it the active one. The current position
    /// fix is still applied, but the committed model, the active route, and
    /// WebSocket subscribers are untouched.
    pub async fn preview(&self, route: &Route) -> RenderModel {
        let mut route = route.clone();
        route.driver_position = *self.position.read().await;
        self.pipeline.build(&route).await
    }

    /// Load a new active route. Any in-flight pipeline run for the previous
    /// route is superseded and its result discarded on arrival.
    pub async fn set_route(&self, route: Route) {
        info!(route_id = %route.id, points = route.delivery_points.len(), "Route loaded");
        *self.route.write().await = Some(route);
        let generation = self.bump_generation();
        self.rebuild(generation).await;
    }

    /// Accept a position fix, from either the continuous watch push or the
    /// periodic re-poll
    pub async fn report_fix(&self, position: LatLng) {
        {
            let mut current = self.position.write().await;
            if current.is_none() {
                info!(
                    lat = position[0],
                    lng = position[1],
                    "First position fix, tracking started"
                );
            }
            *current = Some(position);
        }
        self.notice.write().await.take();

        let generation = self.bump_generation();
        if !self.debounce.is_zero() {
            // Trailing-edge coalescing: wait out the quiet period and only
            // rebuild if no newer fix arrived meanwhile. The newest fix
            // always gets through.
            tokio::time::sleep(self.debounce).await;
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
        }
        self.rebuild(generation).await;
    }

    /// Record a geolocation failure. State is unchanged; the notice is kept
    /// for the caller to surface as a non-fatal message.
    pub async fn report_failure(&self, error: PositionError) {
        warn!(error = %error, "Geolocation failed, keeping current tracking state");
        *self.notice.write().await = Some(error.to_string());
    }

    /// Viewport centered on the driver at a fixed close zoom. `None` while
    /// no fix is known (recenter is a no-op in the idle state).
    pub async fn recenter(&self) -> Option<Viewport> {
        self.position.read().await.map(|center| Viewport {
            center,
            zoom: self.recenter_zoom,
        })
    }

    /// Periodic re-poll loop. Runs forever; spawn it on the runtime.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Starting position re-poll loop"
        );
        let mut ticker = interval(self.poll_interval);
        // The first tick fires immediately; skip it so startup does not
        // report an Unavailable notice before the browser had a chance to
        // deliver a fix
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&self) {
        match self.source.current_position().await {
            Ok(position) => self.report_fix(position).await,
            Err(error) => self.report_failure(error).await,
        }
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run the pipeline for the current route/position and commit the result
    /// unless a newer run has been started since
    async fn rebuild(&self, generation: u64) {
        let Some(mut route) = self.route.read().await.clone() else {
            return;
        };
        route.driver_position = *self.position.read().await;

        let mut model = self.pipeline.build(&route).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(
                route_id = %route.id,
                generation,
                "Discarding stale pipeline result"
            );
            return;
        }

        model.generation = generation;
        *self.model.write().await = Some(model.clone());
        // Send errors just mean no one is listening
        let _ = self.updates_tx.send(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, DeliveryPoint, DeliveryStatus, Itinerary, RouteStatus};
    use crate::providers::geocode::{GeocodeCache, GeocodeError, GeocodeProvider, GeocodeResolver};
    use crate::providers::routing::{ItineraryCalculator, RoutingError, RoutingProvider};

    struct NoGeocoder;

    #[async_trait]
    impl GeocodeProvider for NoGeocoder {
        async fn lookup(&self, _query: &str) -> Result<Option<LatLng>, GeocodeError> {
            Ok(None)
        }
    }

    /// Echoes the input path after an optional delay, for stale-run tests
    struct SlowRouter {
        delay: Duration,
    }

    #[async_trait]
    impl RoutingProvider for SlowRouter {
        async fn route(&self, coordinates: &[LatLng]) -> Result<Itinerary, RoutingError> {
            tokio::time::sleep(self.delay).await;
            Ok(Itinerary {
                coordinates: coordinates.to_vec(),
                distance_km: 1.0,
                duration_min: 2.0,
            })
        }
    }

    struct FixedSource {
        result: Result<LatLng, PositionError>,
    }

    #[async_trait]
    impl PositionSource for FixedSource {
        async fn current_position(&self) -> Result<LatLng, PositionError> {
            self.result.clone()
        }
    }

    fn make_route(id: &str) -> Route {
        let point = DeliveryPoint {
            id: "a".to_string(),
            client_name: "Client A".to_string(),
            client_phone_number: None,
            client_note: None,
            address: Address {
                street: "Bahnhofstraße 1".to_string(),
                city: "Augsburg".to_string(),
                postal_code: "86150".to_string(),
                country: "Germany".to_string(),
                latitude: Some(48.37),
                longitude: Some(10.89),
            },
            delivery_status: DeliveryStatus::Pending,
            planned_time: None,
            actual_time: None,
            sequence_order: Some(0),
            is_start_point: false,
            is_end_point: false,
        };
        Route {
            id: id.to_string(),
            status: RouteStatus::InProgress,
            delivery_points: vec![point],
            driver_position: None,
        }
    }

    fn make_tracker(router_delay: Duration, source: Arc<dyn PositionSource>) -> LiveTracker {
        let pipeline = RenderPipeline::new(
            GeocodeResolver::new(Arc::new(NoGeocoder), GeocodeCache::new(16)),
            ItineraryCalculator::new(Arc::new(SlowRouter {
                delay: router_delay,
            })),
            Duration::from_millis(0),
        );
        LiveTracker::new(
            pipeline,
            source,
            Duration::from_secs(30),
            Duration::from_millis(0),
            15,
        )
    }

    fn idle_source() -> Arc<dyn PositionSource> {
        Arc::new(FixedSource {
            result: Err(PositionError::Unavailable),
        })
    }

    #[tokio::test]
    async fn recenter_is_noop_while_idle() {
        let tracker = make_tracker(Duration::from_millis(0), idle_source());
        assert_eq!(tracker.state().await, TrackingState::Idle);
        assert_eq!(tracker.recenter().await, None);
    }

    #[tokio::test]
    async fn first_fix_transitions_to_tracking() {
        let tracker = make_tracker(Duration::from_millis(0), idle_source());
        tracker.set_route(make_route("route-1")).await;

        tracker.report_fix([48.36, 10.88]).await;

        assert_eq!(tracker.state().await, TrackingState::Tracking);
        let viewport = tracker.recenter().await.unwrap();
        assert_eq!(viewport.center, [48.36, 10.88]);
        assert_eq!(viewport.zoom, 15);

        let model = tracker.model().await.unwrap();
        assert_eq!(model.driver_position, Some([48.36, 10.88]));
    }

    #[tokio::test]
    async fn geolocation_failure_keeps_state_and_records_notice() {
        let tracker = make_tracker(
            Duration::from_millis(0),
            Arc::new(FixedSource {
                result: Err(PositionError::PermissionDenied),
            }),
        );

        tracker.poll_once().await;

        assert_eq!(tracker.state().await, TrackingState::Idle);
        assert_eq!(
            tracker.last_notice().await.as_deref(),
            Some("Location permission denied")
        );
    }

    #[tokio::test]
    async fn successful_fix_clears_previous_notice() {
        let tracker = make_tracker(Duration::from_millis(0), idle_source());
        tracker.set_route(make_route("route-1")).await;

        tracker.report_failure(PositionError::Timeout).await;
        assert!(tracker.last_notice().await.is_some());

        tracker.report_fix([48.36, 10.88]).await;
        assert_eq!(tracker.last_notice().await, None);
    }

    #[tokio::test]
    async fn preview_leaves_the_active_route_untouched() {
        let tracker = make_tracker(Duration::from_millis(0), idle_source());
        let mut updates = tracker.subscribe();
        tracker.set_route(make_route("active")).await;
        updates.recv().await.unwrap();

        let previewed = tracker.preview(&make_route("preview")).await;

        assert_eq!(previewed.route_id, "preview");
        assert_eq!(tracker.model().await.unwrap().route_id, "active");
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_pipeline_result_is_discarded() {
        let tracker = Arc::new(make_tracker(Duration::from_millis(150), idle_source()));

        // Start a slow run for the first route, then switch routes while it
        // is still in flight
        let slow = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.set_route(make_route("stale")).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        tracker.set_route(make_route("current")).await;
        slow.await.unwrap();

        let model = tracker.model().await.unwrap();
        assert_eq!(model.route_id, "current");
    }

    #[tokio::test]
    async fn model_updates_fan_out_to_subscribers() {
        let tracker = make_tracker(Duration::from_millis(0), idle_source());
        let mut updates = tracker.subscribe();

        tracker.set_route(make_route("route-1")).await;

        let model = updates.recv().await.unwrap();
        assert_eq!(model.route_id, "route-1");
        assert!(model.generation > 0);
    }

    #[tokio::test]
    async fn debounce_coalesces_rapid_fixes_keeping_the_last() {
        let pipeline = RenderPipeline::new(
            GeocodeResolver::new(Arc::new(NoGeocoder), GeocodeCache::new(16)),
            ItineraryCalculator::new(Arc::new(SlowRouter {
                delay: Duration::from_millis(0),
            })),
            Duration::from_millis(0),
        );
        let tracker = Arc::new(LiveTracker::new(
            pipeline,
            idle_source(),
            Duration::from_secs(30),
            Duration::from_millis(80),
            15,
        ));
        tracker.set_route(make_route("route-1")).await;

        let first = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.report_fix([48.10, 10.10]).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        tracker.report_fix([48.20, 10.20]).await;
        first.await.unwrap();

        // Only the trailing fix was committed
        let model = tracker.model().await.unwrap();
        assert_eq!(model.driver_position, Some([48.20, 10.20]));
        assert_eq!(tracker.driver_position().await, Some([48.20, 10.20]));
    }
}
