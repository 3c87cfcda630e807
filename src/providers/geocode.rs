//! Address geocoding with session-local caching.
//!
//! Lookups go to a Nominatim-compatible service. Results, including misses,
//! are cached for the lifetime of the process so a failed lookup is not
//! retried within the session. The ≥1s spacing between network calls that
//! the provider demands is caller-side discipline (see `services::pipeline`),
//! not enforced here.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::GeocodingConfig;
use crate::models::{Address, LatLng};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// External best-match address lookup
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Resolve a free-form address query to coordinates, `None` when the
    /// service has no match
    async fn lookup(&self, query: &str) -> Result<Option<LatLng>, GeocodeError>;
}

/// Nominatim search API client
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
}

impl NominatimClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            // Nominatim requires a descriptive client identifier
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl GeocodeProvider for NominatimClient {
    async fn lookup(&self, query: &str) -> Result<Option<LatLng>, GeocodeError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GeocodeError::Network(format!(
                "Geocoding service returned HTTP {}",
                response.status()
            )));
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        let Some(best) = results.first() else {
            return Ok(None);
        };

        let lat: f64 = best
            .lat
            .parse()
            .map_err(|_| GeocodeError::Parse(format!("Invalid latitude: {}", best.lat)))?;
        let lng: f64 = best
            .lon
            .parse()
            .map_err(|_| GeocodeError::Parse(format!("Invalid longitude: {}", best.lon)))?;

        Ok(Some([lat, lng]))
    }
}

/// Bounded lookup cache keyed by the exact address string. Negative results
/// are cached too. Oldest entries are evicted once capacity is reached.
pub struct GeocodeCache {
    capacity: usize,
    entries: HashMap<String, Option<LatLng>>,
    insertion_order: VecDeque<String>,
}

impl GeocodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    /// Outer `None` means "not cached"; inner `None` is a cached miss
    pub fn get(&self, key: &str) -> Option<Option<LatLng>> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: String, value: Option<LatLng>) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, value);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.insertion_order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one resolution attempt. `from_network` tells callers whether a
/// network call was made, so they can space subsequent lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolveOutcome {
    pub position: Option<LatLng>,
    pub from_network: bool,
}

/// Resolves postal addresses to coordinates through an injected provider,
/// with an explicit cache owned by the resolver
pub struct GeocodeResolver {
    provider: std::sync::Arc<dyn GeocodeProvider>,
    cache: Mutex<GeocodeCache>,
}

impl GeocodeResolver {
    pub fn new(provider: std::sync::Arc<dyn GeocodeProvider>, cache: GeocodeCache) -> Self {
        Self {
            provider,
            cache: Mutex::new(cache),
        }
    }

    /// Answer a lookup from session state alone: `Some` for incomplete
    /// addresses and cache hits, `None` when resolving would need a network
    /// call. Lets callers decide on rate-limit spacing before committing.
    pub async fn cached(&self, address: &Address) -> Option<ResolveOutcome> {
        if address.street.trim().is_empty() || address.city.trim().is_empty() {
            debug!(
                street = %address.street,
                city = %address.city,
                "Skipping geocoding for incomplete address"
            );
            return Some(ResolveOutcome {
                position: None,
                from_network: false,
            });
        }

        let key = cache_key(address);
        let cache = self.cache.lock().await;
        cache.get(&key).map(|cached| {
            debug!(key = %key, hit = cached.is_some(), "Geocode cache hit");
            ResolveOutcome {
                position: cached,
                from_network: false,
            }
        })
    }

    /// Resolve an address to coordinates.
    ///
    /// Addresses missing a street or city are rejected without touching the
    /// network. Repeated lookups for the same address hit the cache, failed
    /// lookups included.
    pub async fn resolve(&self, address: &Address) -> ResolveOutcome {
        if let Some(outcome) = self.cached(address).await {
            return outcome;
        }

        let key = cache_key(address);

        let position = match self.provider.lookup(&search_query(address)).await {
            Ok(position) => position,
            Err(e) => {
                // Treated like "no match": the point is dropped from the map
                // but kept in tabular views
                warn!(error = %e, key = %key, "Geocoding lookup failed");
                None
            }
        };

        self.cache.lock().await.insert(key, position);

        ResolveOutcome {
            position,
            from_network: true,
        }
    }
}

/// Exact, case-sensitive cache key for an address
fn cache_key(address: &Address) -> String {
    format!(
        "{}|{}|{}|{}",
        address.street, address.city, address.postal_code, address.country
    )
}

/// Free-form query sent to the geocoding service
fn search_query(address: &Address) -> String {
    [
        address.street.as_str(),
        address.city.as_str(),
        address.postal_code.as_str(),
        address.country.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeProvider {
        result: Option<LatLng>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn returning(result: Option<LatLng>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GeocodeProvider for FakeProvider {
        async fn lookup(&self, _query: &str) -> Result<Option<LatLng>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result)
        }
    }

    fn test_address(street: &str, city: &str) -> Address {
        Address {
            street: street.to_string(),
            city: city.to_string(),
            postal_code: "86150".to_string(),
            country: "Germany".to_string(),
            latitude: None,
            longitude: None,
        }
    }

    #[tokio::test]
    async fn incomplete_address_skips_network() {
        let provider = FakeProvider::returning(Some([48.37, 10.89]));
        let resolver = GeocodeResolver::new(provider.clone(), GeocodeCache::new(16));

        let outcome = resolver.resolve(&test_address("", "Augsburg")).await;
        assert_eq!(outcome.position, None);
        assert!(!outcome.from_network);

        let outcome = resolver.resolve(&test_address("Maximilianstraße 1", "")).await;
        assert_eq!(outcome.position, None);
        assert!(!outcome.from_network);

        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn repeated_lookup_hits_cache() {
        let provider = FakeProvider::returning(Some([48.37, 10.89]));
        let resolver = GeocodeResolver::new(provider.clone(), GeocodeCache::new(16));
        let address = test_address("Maximilianstraße 1", "Augsburg");

        let first = resolver.resolve(&address).await;
        assert_eq!(first.position, Some([48.37, 10.89]));
        assert!(first.from_network);

        let second = resolver.resolve(&address).await;
        assert_eq!(second.position, Some([48.37, 10.89]));
        assert!(!second.from_network);

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn cached_answers_without_touching_the_network() {
        let provider = FakeProvider::returning(Some([48.37, 10.89]));
        let resolver = GeocodeResolver::new(provider.clone(), GeocodeCache::new(16));
        let address = test_address("Maximilianstraße 1", "Augsburg");

        assert_eq!(resolver.cached(&address).await, None);

        resolver.resolve(&address).await;
        let outcome = resolver.cached(&address).await.unwrap();
        assert_eq!(outcome.position, Some([48.37, 10.89]));
        assert!(!outcome.from_network);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_is_cached_and_not_retried() {
        let provider = FakeProvider::returning(None);
        let resolver = GeocodeResolver::new(provider.clone(), GeocodeCache::new(16));
        let address = test_address("Nowhere 99", "Atlantis");

        assert_eq!(resolver.resolve(&address).await.position, None);
        assert_eq!(resolver.resolve(&address).await.position, None);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn cache_key_is_case_sensitive() {
        let provider = FakeProvider::returning(Some([48.37, 10.89]));
        let resolver = GeocodeResolver::new(provider.clone(), GeocodeCache::new(16));

        resolver.resolve(&test_address("Bahnhofstraße 5", "Augsburg")).await;
        resolver.resolve(&test_address("bahnhofstraße 5", "Augsburg")).await;
        assert_eq!(provider.call_count(), 2);
    }

    #[test]
    fn cache_evicts_oldest_at_capacity() {
        let mut cache = GeocodeCache::new(2);
        assert!(cache.is_empty());
        cache.insert("a".to_string(), Some([1.0, 1.0]));
        cache.insert("b".to_string(), Some([2.0, 2.0]));
        cache.insert("c".to_string(), Some([3.0, 3.0]));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(Some([2.0, 2.0])));
        assert_eq!(cache.get("c"), Some(Some([3.0, 3.0])));
    }

    #[test]
    fn cache_update_does_not_evict() {
        let mut cache = GeocodeCache::new(2);
        cache.insert("a".to_string(), None);
        cache.insert("b".to_string(), Some([2.0, 2.0]));
        cache.insert("a".to_string(), Some([1.0, 1.0]));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(Some([1.0, 1.0])));
        assert_eq!(cache.get("b"), Some(Some([2.0, 2.0])));
    }

    #[test]
    fn search_query_skips_empty_parts() {
        let mut address = test_address("Maximilianstraße 1", "Augsburg");
        address.country = String::new();
        assert_eq!(search_query(&address), "Maximilianstraße 1, Augsburg, 86150");
    }
}
