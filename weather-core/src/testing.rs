//! Test doubles shared by the unit tests.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::{
    error::{Result, WeatherError},
    model::{NewObservation, Observation},
    provider::ProviderClient,
    store::{InMemoryObservationStore, ObservationStore},
};

pub(crate) const ANTALYA_REPORT: &str = r#"{
    "request": { "type": "City", "query": "Antalya, Turkey", "language": "tr", "unit": "m" },
    "location": {
        "name": "Antalya",
        "country": "Turkey",
        "region": "Antalya",
        "timezone_id": "Europe/Istanbul",
        "localtime": "2023-05-19 12:00",
        "localtime_epoch": 1671457200,
        "utc_offset": "3.0"
    },
    "current": { "observation_time": "12:00 PM", "temperature": 18, "weather_code": 113 }
}"#;

pub(crate) const REJECTION: &str = r#"{
    "success": false,
    "error": {
        "code": 105,
        "type": "https_access_restricted",
        "info": "Access Restricted - Your current Subscription Plan does not support HTTPS Encryption."
    }
}"#;

/// 2023-05-19T09:30:00Z
pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 19, 9, 30, 0).unwrap()
}

#[derive(Debug)]
enum Reply {
    Body(String),
    Transport(&'static str),
}

/// Provider that answers every fetch the same way and records the cities asked for.
#[derive(Debug)]
pub(crate) struct RecordingProvider {
    reply: Reply,
    delay: Option<Duration>,
    cities: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub(crate) fn body(body: &str) -> Self {
        Self { reply: Reply::Body(body.to_string()), delay: None, cities: Mutex::new(Vec::new()) }
    }

    pub(crate) fn transport_failure(message: &'static str) -> Self {
        Self { reply: Reply::Transport(message), delay: None, cities: Mutex::new(Vec::new()) }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.cities.lock().len()
    }

    pub(crate) fn cities(&self) -> Vec<String> {
        self.cities.lock().clone()
    }
}

#[async_trait]
impl ProviderClient for RecordingProvider {
    async fn fetch(&self, city: &str) -> Result<String> {
        self.cities.lock().push(city.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Body(body) => Ok(body.clone()),
            Reply::Transport(message) => Err(WeatherError::Transport(anyhow!(*message))),
        }
    }
}

/// In-memory store that counts lookups and writes.
#[derive(Debug, Default)]
pub(crate) struct CountingStore {
    inner: InMemoryObservationStore,
    lookups: AtomicUsize,
    saves: AtomicUsize,
    fail_saves: bool,
    fail_lookups: bool,
}

impl CountingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_saves() -> Self {
        Self { fail_saves: true, ..Self::default() }
    }

    pub(crate) fn failing_lookups() -> Self {
        Self { fail_lookups: true, ..Self::default() }
    }

    /// Seed a record without touching the counters.
    pub(crate) async fn seed(&self, observation: NewObservation) -> Observation {
        self.inner.save(observation).await.unwrap()
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn records(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ObservationStore for CountingStore {
    async fn find_latest(&self, city: &str) -> anyhow::Result<Option<Observation>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups {
            return Err(anyhow!("store unreachable"));
        }
        self.inner.find_latest(city).await
    }

    async fn save(&self, observation: NewObservation) -> anyhow::Result<Observation> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves {
            return Err(anyhow!("disk full"));
        }
        self.inner.save(observation).await
    }

    async fn history(&self, city: &str) -> anyhow::Result<Vec<Observation>> {
        self.inner.history(city).await
    }
}
