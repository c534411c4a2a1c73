//! Cache-aside lookup of the current weather for a city.
//!
//! For each request the service reads the latest stored observation for the
//! city and serves it if it is within the staleness window. Otherwise it
//! fetches from the provider, decodes, appends a new observation and serves
//! that. The fresh path neither calls the provider nor writes to the store.
//!
//! Concurrent stale requests for the same city may each refresh and each
//! append a record unless [`WeatherService::with_single_flight`] is used.

use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    clock::Clock,
    error::{Result, WeatherError},
    freshness::FreshnessPolicy,
    model::{NewObservation, WeatherView, parse_local_time},
    parser::{self, ProviderResponse},
    provider::ProviderClient,
    single_flight::RefreshLocks,
    store::ObservationStore,
};

pub struct WeatherService {
    store: Arc<dyn ObservationStore>,
    provider: Arc<dyn ProviderClient>,
    clock: Arc<dyn Clock + Send + Sync>,
    policy: FreshnessPolicy,
    refresh_locks: Option<RefreshLocks>,
}

impl WeatherService {
    pub fn new(
        store: Arc<dyn ObservationStore>,
        provider: Arc<dyn ProviderClient>,
        clock: Arc<dyn Clock + Send + Sync>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self { store, provider, clock, policy, refresh_locks: None }
    }

    /// Serialize refreshes per city so concurrent stale requests trigger one fetch.
    pub fn with_single_flight(mut self) -> Self {
        self.refresh_locks = Some(RefreshLocks::new());
        self
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Current weather for `city`, matched exactly as given.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherView> {
        info!(city, "weather requested");

        if let Some(view) = self.serve_if_fresh(city).await? {
            return Ok(view);
        }

        let Some(locks) = &self.refresh_locks else {
            return self.refresh(city).await;
        };

        let lock = locks.lock_for(city);
        let _guard = lock.lock().await;
        // Someone else may have refreshed while we waited.
        if let Some(view) = self.serve_if_fresh(city).await? {
            return Ok(view);
        }
        self.refresh(city).await
    }

    async fn serve_if_fresh(&self, city: &str) -> Result<Option<WeatherView>> {
        let latest = self.store.find_latest(city).await.map_err(WeatherError::Storage)?;

        match latest {
            Some(obs) if !self.policy.is_stale(obs.updated_at, self.clock.utc()) => {
                info!(city, updated_at = %obs.updated_at, "serving stored observation, still up to date");
                Ok(Some(WeatherView::from(&obs)))
            }
            Some(obs) => {
                info!(city, updated_at = %obs.updated_at, "stored observation is stale, refreshing");
                Ok(None)
            }
            None => {
                info!(city, "no stored observation, refreshing");
                Ok(None)
            }
        }
    }

    async fn refresh(&self, city: &str) -> Result<WeatherView> {
        let body = self.provider.fetch(city).await?;

        let payload = match parser::decode(&body)? {
            ProviderResponse::Success(payload) => payload,
            ProviderResponse::Rejected(rejection) => {
                warn!(city, code = rejection.code, kind = %rejection.kind, "provider rejected request");
                return Err(WeatherError::ProviderRejected(rejection));
            }
        };

        let local_observation_time = parse_local_time(&payload.local_time).map_err(|err| {
            WeatherError::MalformedUpstreamResponse {
                reason: format!("invalid local time {:?}: {err}", payload.local_time),
            }
        })?;

        let observation = NewObservation {
            requested_city: city.to_owned(),
            resolved_city_name: payload.name,
            country: payload.country,
            temperature: payload.temperature,
            updated_at: self.clock.utc(),
            local_observation_time,
        };
        let view = WeatherView::from(&observation);

        let saved = self.store.save(observation).await.map_err(WeatherError::Storage)?;
        info!(city, id = saved.id, "saved refreshed observation");

        Ok(view)
    }
}
