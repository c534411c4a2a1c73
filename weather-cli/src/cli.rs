use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;
use weather_core::{
    CachedWeatherService, Config, DefaultClock, JsonFileObservationStore, ObservationStore,
    ResponseCache, WeatherError, WeatherService, WeatherView, model::format_local_time,
    provider::provider_from_config, spawn_periodic_clear,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather by city")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the provider API key and tuning options.
    Configure {
        /// API key; prompted for when no option is given.
        #[arg(long)]
        api_key: Option<String>,

        /// Minutes a stored observation is served before it is refreshed.
        #[arg(long)]
        window_minutes: Option<u32>,

        /// Seconds a response stays in the in-process cache (0 disables it).
        #[arg(long)]
        cache_ttl_secs: Option<u64>,
    },

    /// Show the current weather for one or more cities.
    Show {
        #[arg(required = true)]
        cities: Vec<String>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Poll one city at a fixed interval until interrupted.
    Watch {
        city: String,

        /// Seconds between polls.
        #[arg(long, default_value_t = 60)]
        every: u64,

        /// Stop after this many polls.
        #[arg(long)]
        times: Option<u32>,
    },

    /// List the stored observations for a city.
    History {
        city: String,
    },
}

/// City text the service is never asked about.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid city {0:?}: only letters are allowed")]
pub struct InvalidCity(pub String);

pub fn validate_city(city: &str) -> Result<&str, InvalidCity> {
    if !city.is_empty() && city.chars().all(char::is_alphabetic) {
        Ok(city)
    } else {
        Err(InvalidCity(city.to_string()))
    }
}

/// Process exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<InvalidCity>().is_some() {
        return 2;
    }
    match err.downcast_ref::<WeatherError>() {
        Some(WeatherError::ProviderRejected(_)) => 3,
        Some(WeatherError::MalformedUpstreamResponse { .. }) => 4,
        Some(WeatherError::Transport(_)) => 5,
        Some(WeatherError::Storage(_)) => 6,
        None => 1,
    }
}

pub fn format_view(view: &WeatherView) -> String {
    format!(
        "{}, {}: {}° (updated {})",
        view.city_name, view.country, view.temperature, view.updated_time
    )
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { api_key, window_minutes, cache_ttl_secs } => {
                let mut config = load_config(self.config.as_ref())?;
                let interactive =
                    api_key.is_none() && window_minutes.is_none() && cache_ttl_secs.is_none();

                if let Some(key) = api_key {
                    config.set_api_key(key);
                } else if interactive {
                    config.set_api_key(prompt_api_key()?);
                }
                if let Some(minutes) = window_minutes {
                    config.staleness_window_minutes = minutes;
                }
                if let Some(ttl) = cache_ttl_secs {
                    config.cache.ttl_secs = ttl;
                }

                save_config(&config, self.config.as_ref())?;
                println!("Configuration saved.");
            }
            Command::Show { cities, json } => {
                for city in &cities {
                    validate_city(city)?;
                }

                let config = load_config(self.config.as_ref())?;
                let (service, eviction) = build_service(&config)?;

                let result = show_all(&service, &cities, json).await;
                if let Some(handle) = eviction {
                    handle.abort();
                }
                result?;
            }
            Command::Watch { city, every, times } => {
                validate_city(&city)?;

                let config = load_config(self.config.as_ref())?;
                let (service, eviction) = build_service(&config)?;

                let every = Duration::from_secs(every.max(1));
                let polls = watch(&service, &city, every, times, tokio::signal::ctrl_c()).await;
                debug!(polls, "watch finished");
                if let Some(handle) = eviction {
                    handle.abort();
                }
            }
            Command::History { city } => {
                validate_city(&city)?;

                let config = load_config(self.config.as_ref())?;
                let store = JsonFileObservationStore::open(config.store_path()?)?;

                let records = store.history(&city).await?;
                if records.is_empty() {
                    println!("No observations stored for {city}.");
                }
                for obs in records {
                    println!(
                        "#{:<4} {}  {}, {}: {}° (local time {})",
                        obs.id,
                        format_local_time(&obs.updated_at.naive_utc()),
                        obs.resolved_city_name,
                        obs.country,
                        obs.temperature,
                        format_local_time(&obs.local_observation_time),
                    );
                }
            }
        }

        Ok(())
    }
}

async fn show_all(service: &CachedWeatherService, cities: &[String], json: bool) -> anyhow::Result<()> {
    for city in cities {
        let view = service.get_weather(city).await?;
        if json {
            println!("{}", serde_json::to_string(&view)?);
        } else {
            println!("{}", format_view(&view));
        }
    }
    Ok(())
}

/// Poll `city` until `times` polls are done or `shutdown` resolves, which
/// also abandons a lookup in flight. Returns the number of completed polls.
async fn watch(
    service: &CachedWeatherService,
    city: &str,
    every: Duration,
    times: Option<u32>,
    shutdown: impl Future,
) -> u32 {
    let mut ticker = tokio::time::interval(every);
    let mut polls = 0u32;

    let interrupted = shutdown;
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut interrupted => break,
        }

        let result = tokio::select! {
            result = service.get_weather(city) => result,
            _ = &mut interrupted => break,
        };
        match result {
            Ok(view) => println!("{}", format_view(&view)),
            Err(err) => eprintln!("{}: {err}", err.user_message()),
        }

        polls += 1;
        if times.is_some_and(|limit| polls >= limit) {
            break;
        }
    }

    polls
}

/// Wire the service from config. The response cache is cleared every TTL
/// by the returned task; without a TTL every call goes to the service.
fn build_service(config: &Config) -> anyhow::Result<(CachedWeatherService, Option<JoinHandle<()>>)> {
    let store_path = config.store_path()?;
    let store = JsonFileObservationStore::open(&store_path)
        .with_context(|| format!("Failed to open observation store at {}", store_path.display()))?;
    let provider = provider_from_config(config)?;

    let service = WeatherService::new(
        Arc::new(store),
        Arc::new(provider),
        Arc::new(DefaultClock),
        config.freshness_policy(),
    );

    let (cache, eviction) = match config.cache_ttl() {
        Some(ttl) => {
            debug!(ttl_secs = ttl.as_secs(), "response cache enabled");
            let cache = Arc::new(ResponseCache::new(ttl));
            let handle = spawn_periodic_clear(cache.clone(), ttl);
            (cache, Some(handle))
        }
        None => (Arc::new(ResponseCache::new(Duration::ZERO)), None),
    };

    Ok((CachedWeatherService::new(service, cache), eviction))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn save_config(config: &Config, path: Option<&PathBuf>) -> anyhow::Result<()> {
    match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

fn prompt_api_key() -> anyhow::Result<String> {
    let key = inquire::Password::new("weatherstack API key:")
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    Ok(key.trim().to_string())
}
