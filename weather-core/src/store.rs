//! Persisted observation history.
//!
//! Records are append-only. Lookups are by exact `requested_city` text and
//! return the record with the latest `updated_at`; on a tie the one inserted
//! last wins.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::model::{NewObservation, Observation};

pub mod json_file;

pub use json_file::JsonFileObservationStore;

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Most recently updated observation for `city`, if any.
    async fn find_latest(&self, city: &str) -> Result<Option<Observation>>;

    /// Append a new observation; the store assigns its id.
    async fn save(&self, observation: NewObservation) -> Result<Observation>;

    /// Every observation for `city`, oldest first.
    async fn history(&self, city: &str) -> Result<Vec<Observation>>;
}

pub(crate) fn latest_for<'a>(records: &'a [Observation], city: &str) -> Option<&'a Observation> {
    records
        .iter()
        .filter(|obs| obs.requested_city == city)
        .max_by_key(|obs| obs.updated_at)
}

pub(crate) fn history_for(records: &[Observation], city: &str) -> Vec<Observation> {
    let mut matching: Vec<Observation> =
        records.iter().filter(|obs| obs.requested_city == city).cloned().collect();
    matching.sort_by_key(|obs| obs.updated_at);
    matching
}

pub(crate) fn next_id(records: &[Observation]) -> u64 {
    records.iter().map(|obs| obs.id).max().map_or(1, |id| id + 1)
}

/// Volatile store backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryObservationStore {
    records: RwLock<Vec<Observation>>,
}

impl InMemoryObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ObservationStore for InMemoryObservationStore {
    async fn find_latest(&self, city: &str) -> Result<Option<Observation>> {
        Ok(latest_for(&self.records.read(), city).cloned())
    }

    async fn save(&self, observation: NewObservation) -> Result<Observation> {
        let mut records = self.records.write();
        let saved = Observation::from_new(next_id(&records), observation);
        records.push(saved.clone());
        Ok(saved)
    }

    async fn history(&self, city: &str) -> Result<Vec<Observation>> {
        Ok(history_for(&self.records.read(), city))
    }
}

#[cfg(test)]
pub(crate) fn sample_observation(
    city: &str,
    temperature: i32,
    updated_at: chrono::DateTime<chrono::Utc>,
) -> NewObservation {
    NewObservation {
        requested_city: city.to_string(),
        resolved_city_name: city.to_string(),
        country: "Turkey".to_string(),
        temperature,
        updated_at,
        local_observation_time: updated_at.naive_utc(),
    }
}
