pub mod api;
mod config;
mod models;
mod providers;
mod services;
mod tracking;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use providers::backend::BackendClient;
use providers::geocode::{GeocodeCache, GeocodeResolver, NominatimClient};
use providers::routing::{ItineraryCalculator, OsrmClient};
use services::pipeline::RenderPipeline;
use tracking::{LiveTracker, SharedPositionSource};

#[derive(OpenApi)]
#[openapi(
    info(title = "Courierview API", version = "0.1.0"),
    paths(
        api::routes::get_route_map,
        api::routes::activate_route,
        api::routes::optimize_route,
        api::routes::reorder_sequence,
        api::routes::set_start_point,
        api::routes::set_end_point,
        api::routes::reset_sequence,
        api::tracking::report_position,
        api::tracking::recenter,
        api::tracking::get_tracking_state,
    ),
    components(schemas(
        api::ErrorResponse,
        api::routes::ReorderRequest,
        api::routes::PointFlagRequest,
        api::tracking::PositionReport,
        api::tracking::TrackingStateResponse,
        models::Address,
        models::DeliveryPoint,
        models::DeliveryStatus,
        models::Route,
        models::RouteStatus,
        models::RenderModel,
        models::ResolvedStop,
        models::UnlocatedStop,
        models::Itinerary,
        models::Segment,
        models::Viewport,
        services::sequence::SequenceUpdate,
    )),
    tags(
        (name = "routes", description = "Route map rendering and optimization"),
        (name = "sequence", description = "Manual stop sequencing"),
        (name = "tracking", description = "Live driver tracking")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(
        backend = %config.backend.base_url,
        geocoder = %config.geocoding.base_url,
        router = %config.routing.base_url,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // External service clients
    let backend =
        Arc::new(BackendClient::new(&config.backend).expect("Failed to build backend client"));
    let geocoder = GeocodeResolver::new(
        Arc::new(NominatimClient::new(&config.geocoding).expect("Failed to build geocoding client")),
        GeocodeCache::new(config.geocoding.cache_capacity),
    );
    let calculator = ItineraryCalculator::new(Arc::new(
        OsrmClient::new(&config.routing).expect("Failed to build routing client"),
    ));

    // Rendering pipeline and live tracker
    let pipeline = RenderPipeline::new(
        geocoder,
        calculator,
        Duration::from_millis(config.geocoding.request_spacing_ms),
    );
    let position_source = Arc::new(SharedPositionSource::new());
    let tracker = Arc::new(LiveTracker::new(
        pipeline,
        position_source.clone(),
        Duration::from_secs(config.tracking.poll_interval_secs),
        Duration::from_millis(config.tracking.debounce_ms),
        config.tracking.recenter_zoom,
    ));

    // Start the position re-poll loop in the background
    let tracker_clone = tracker.clone();
    tokio::spawn(async move {
        tracker_clone.run().await;
    });

    let state = api::AppState {
        backend,
        tracker,
        position_source,
    };

    // Build the app
    let app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!(addr = %config.listen_addr, "Server running");
    tracing::info!("Swagger UI: /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Courierview API"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_serializes_coordinate_schemas() {
        let doc = ApiDoc::openapi().to_json().unwrap();
        // Coordinate pairs are exposed as number arrays in the document
        assert!(doc.contains("\"driverPosition\""));
        assert!(doc.contains("\"RenderModel\""));
        assert!(doc.contains("\"Viewport\""));
    }
}
