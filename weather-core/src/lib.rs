//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - The cache-aside weather lookup ([`WeatherService`]) and its failure kinds
//! - The observation store and provider client seams, with file, in-memory
//!   and weatherstack implementations
//! - The short-lived response cache that can sit in front of the service
//! - Configuration handling
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod freshness;
pub mod model;
pub mod parser;
pub mod provider;
pub mod service;
pub mod single_flight;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::{CachedWeatherService, ResponseCache, spawn_periodic_clear};
pub use clock::{Clock, DefaultClock, FixedClock};
pub use config::{CacheConfig, Config, ProviderConfig, StoreConfig};
pub use error::{Result, WeatherError};
pub use freshness::{FreshnessPolicy, is_stale};
pub use model::{LocalTimeError, NewObservation, Observation, WeatherView};
pub use parser::{ProviderErrorPayload, ProviderResponse, SuccessPayload};
pub use provider::{ProviderClient, WeatherstackClient};
pub use service::WeatherService;
pub use store::{InMemoryObservationStore, JsonFileObservationStore, ObservationStore};
