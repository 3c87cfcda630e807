use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "Config::default_listen_addr")]
    pub listen_addr: String,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
    /// Delivery backend REST API
    pub backend: BackendConfig,
    /// Geocoding service configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Road-routing service configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Live driver tracking configuration
    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    fn default_listen_addr() -> String {
        "0.0.0.0:3000".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the delivery management backend
    pub base_url: String,
}

/// Configuration for the external geocoding service
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL of the Nominatim-compatible geocoding service
    #[serde(default = "GeocodingConfig::default_base_url")]
    pub base_url: String,
    /// Descriptive client identifier sent with every request.
    /// The public Nominatim instance rejects generic user agents.
    #[serde(default = "GeocodingConfig::default_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between network lookups in milliseconds (default: 1000).
    /// The provider allows roughly one request per second.
    #[serde(default = "GeocodingConfig::default_request_spacing_ms")]
    pub request_spacing_ms: u64,
    /// Maximum number of cached lookups, oldest evicted first (default: 512)
    #[serde(default = "GeocodingConfig::default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            user_agent: Self::default_user_agent(),
            request_spacing_ms: Self::default_request_spacing_ms(),
            cache_capacity: Self::default_cache_capacity(),
        }
    }
}

impl GeocodingConfig {
    fn default_base_url() -> String {
        "https://nominatim.openstreetmap.org".to_string()
    }
    fn default_user_agent() -> String {
        "courierview/0.1 (delivery dispatch portal)".to_string()
    }
    fn default_request_spacing_ms() -> u64 {
        1000
    }
    fn default_cache_capacity() -> usize {
        512
    }
}

/// Configuration for the external road-routing service
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Base URL of the OSRM-compatible routing service
    #[serde(default = "RoutingConfig::default_base_url")]
    pub base_url: String,
    /// Routing profile (default: driving)
    #[serde(default = "RoutingConfig::default_profile")]
    pub profile: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            profile: Self::default_profile(),
        }
    }
}

impl RoutingConfig {
    fn default_base_url() -> String {
        "https://router.project-osrm.org".to_string()
    }
    fn default_profile() -> String {
        "driving".to_string()
    }
}

/// Configuration for live driver tracking
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Interval in seconds between position re-polls while tracking (default: 30)
    #[serde(default = "TrackingConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Trailing-edge debounce for position-triggered recalculation in
    /// milliseconds. 0 disables debouncing; the last fix always wins either way.
    #[serde(default)]
    pub debounce_ms: u64,
    /// Zoom level applied when recentering on the driver (default: 15)
    #[serde(default = "TrackingConfig::default_recenter_zoom")]
    pub recenter_zoom: u8,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: Self::default_poll_interval_secs(),
            debounce_ms: 0,
            recenter_zoom: Self::default_recenter_zoom(),
        }
    }
}

impl TrackingConfig {
    fn default_poll_interval_secs() -> u64 {
        30
    }
    fn default_recenter_zoom() -> u8 {
        15
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_with_defaults() {
        let yaml = r#"
backend:
  base_url: "http://localhost:8080"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert!(!config.cors_permissive);
        assert_eq!(config.geocoding.request_spacing_ms, 1000);
        assert_eq!(config.geocoding.cache_capacity, 512);
        assert_eq!(config.routing.profile, "driving");
        assert_eq!(config.tracking.poll_interval_secs, 30);
        assert_eq!(config.tracking.debounce_ms, 0);
        assert_eq!(config.tracking.recenter_zoom, 15);
    }

    #[test]
    fn config_overrides_take_effect() {
        let yaml = r#"
listen_addr: "127.0.0.1:4000"
cors_permissive: true
backend:
  base_url: "http://backend:8080"
geocoding:
  request_spacing_ms: 1500
tracking:
  poll_interval_secs: 10
  debounce_ms: 2000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:4000");
        assert!(config.cors_permissive);
        assert_eq!(config.geocoding.request_spacing_ms, 1500);
        assert_eq!(config.tracking.poll_interval_secs, 10);
        assert_eq!(config.tracking.debounce_ms, 2000);
    }
}
