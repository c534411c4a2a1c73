use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::{ObservationStore, history_for, latest_for, next_id};
use crate::model::{NewObservation, Observation};

/// Observation history kept in a single JSON file.
///
/// The whole file is read on open and rewritten on every save.
#[derive(Debug)]
pub struct JsonFileObservationStore {
    path: PathBuf,
    records: Mutex<Vec<Observation>>,
}

impl JsonFileObservationStore {
    /// Open the store at `path`; a missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read observation store: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse observation store: {}", path.display()))?
        } else {
            Vec::new()
        };

        Ok(Self { path, records: Mutex::new(records) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, records: &[Observation]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(records)
            .context("Failed to serialize observations")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write observation store: {}", self.path.display()))
    }
}

#[async_trait]
impl ObservationStore for JsonFileObservationStore {
    async fn find_latest(&self, city: &str) -> Result<Option<Observation>> {
        Ok(latest_for(&self.records.lock(), city).cloned())
    }

    async fn save(&self, observation: NewObservation) -> Result<Observation> {
        let mut records = self.records.lock();
        let saved = Observation::from_new(next_id(&records), observation);
        records.push(saved.clone());

        // Blocking write while holding the lock, so concurrent saves land in order.
        if let Err(err) = self.write_all(&records) {
            records.pop();
            return Err(err);
        }

        debug!(id = saved.id, path = %self.path.display(), "observation written");
        Ok(saved)
    }

    async fn history(&self, city: &str) -> Result<Vec<Observation>> {
        Ok(history_for(&self.records.lock(), city))
    }
}
