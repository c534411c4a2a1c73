//! Short-lived response cache that sits in front of [`WeatherService`].
//!
//! Entries are keyed by the raw city text and expire after a TTL that has
//! nothing to do with the service's staleness window. The whole cache can be
//! cleared at any time, either directly or by [`spawn_periodic_clear`].

use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, info};

use crate::{error::Result, model::WeatherView, service::WeatherService};

#[derive(Debug, Clone)]
struct CachedEntry {
    view: WeatherView,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached view for `city` if it is younger than the TTL.
    pub fn get(&self, city: &str) -> Option<WeatherView> {
        self.entries
            .read()
            .get(city)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| entry.view.clone())
    }

    /// Remember `view` for `city`. A zero TTL cache holds nothing.
    pub fn insert(&self, city: &str, view: WeatherView) {
        if self.ttl.is_zero() {
            return;
        }
        let entry = CachedEntry { view, inserted_at: Instant::now() };
        self.entries.write().insert(city.to_owned(), entry);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        info!("Caches are cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Clear `cache` now and then every `period` until the handle is aborted.
///
/// `period` must be non-zero.
pub fn spawn_periodic_clear(cache: Arc<ResponseCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            cache.clear();
        }
    })
}

/// [`WeatherService`] with successful results cached per city.
pub struct CachedWeatherService {
    service: WeatherService,
    cache: Arc<ResponseCache>,
}

impl CachedWeatherService {
    pub fn new(service: WeatherService, cache: Arc<ResponseCache>) -> Self {
        Self { service, cache }
    }

    pub async fn get_weather(&self, city: &str) -> Result<WeatherView> {
        if let Some(view) = self.cache.get(city) {
            debug!(city, "response cache hit");
            return Ok(view);
        }

        let view = self.service.get_weather(city).await?;
        self.cache.insert(city, view.clone());
        Ok(view)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn service(&self) -> &WeatherService {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::FixedClock,
        freshness::FreshnessPolicy,
        testing::{ANTALYA_REPORT, CountingStore, REJECTION, RecordingProvider, now},
    };

    fn view(temp: i32) -> WeatherView {
        WeatherView {
            city_name: "Antalya".into(),
            country: "Turkey".into(),
            temperature: temp,
            updated_time: "2023-05-19 09:30".into(),
        }
    }

    fn cached_service(
        body: &str,
        ttl: Duration,
    ) -> (CachedWeatherService, Arc<CountingStore>, Arc<RecordingProvider>) {
        let store = Arc::new(CountingStore::new());
        let provider = Arc::new(RecordingProvider::body(body));
        let service = WeatherService::new(
            store.clone(),
            provider.clone(),
            Arc::new(FixedClock::new(now())),
            FreshnessPolicy::default(),
        );
        let cached = CachedWeatherService::new(service, Arc::new(ResponseCache::new(ttl)));
        (cached, store, provider)
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("Antalya", view(18));
        assert_eq!(cache.get("Antalya"), Some(view(18)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("Antalya").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("Antalya").is_none());
    }

    #[test]
    fn keys_are_raw_city_text() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("Antalya", view(18));

        assert!(cache.get("antalya").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("Antalya", view(18));
        cache.insert("Izmir", view(25));

        cache.clear();

        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn zero_ttl_passes_every_call_through_and_keeps_nothing() {
        let (cached, store, provider) = cached_service(ANTALYA_REPORT, Duration::ZERO);

        for _ in 0..3 {
            cached.get_weather("Antalya").await.unwrap();
        }

        assert!(cached.cache().is_empty());
        assert_eq!(store.lookups(), 3);
        // Only the first call refreshes, the stored record stays fresh.
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn repeated_calls_skip_the_service() {
        let (cached, store, provider) = cached_service(ANTALYA_REPORT, Duration::from_secs(600));

        let first = cached.get_weather("Antalya").await.unwrap();
        let second = cached.get_weather("Antalya").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert_eq!(store.lookups(), 1);
    }

    #[tokio::test]
    async fn cleared_cache_falls_through_to_store() {
        let (cached, store, provider) = cached_service(ANTALYA_REPORT, Duration::from_secs(600));

        cached.get_weather("Antalya").await.unwrap();
        cached.clear_cache();
        cached.get_weather("Antalya").await.unwrap();

        // Second call is served by the store, the record is still fresh.
        assert_eq!(store.lookups(), 2);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (cached, store, provider) = cached_service(REJECTION, Duration::from_secs(600));

        assert!(cached.get_weather("Antalya").await.is_err());
        assert!(cached.get_weather("Antalya").await.is_err());

        assert!(cached.cache().is_empty());
        assert_eq!(provider.calls(), 2);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_clear_runs_immediately_and_on_every_period() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(3600)));
        cache.insert("Antalya", view(18));

        let handle = spawn_periodic_clear(cache.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(cache.is_empty());

        cache.insert("Izmir", view(25));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(cache.len(), 1);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.is_empty());

        handle.abort();
    }
}
