use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Textual timestamp format shared by the provider's local time and the
/// `updatedTime` field of [`WeatherView`], e.g. `2023-05-19 12:00`.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalTimeError {
    #[error("expected yyyy-MM-dd HH:mm")]
    Shape,
    #[error(transparent)]
    Invalid(#[from] chrono::ParseError),
}

/// Parse a `yyyy-MM-dd HH:mm` timestamp. Every field is zero-padded to its
/// full width; anything else (unpadded fields, extra whitespace, seconds,
/// offsets, trailing text) is rejected.
pub fn parse_local_time(text: &str) -> Result<NaiveDateTime, LocalTimeError> {
    if !has_local_time_shape(text) {
        return Err(LocalTimeError::Shape);
    }
    Ok(NaiveDateTime::parse_from_str(text, LOCAL_TIME_FORMAT)?)
}

// chrono accepts unpadded numbers and skips whitespace, so the layout is
// checked byte by byte first.
fn has_local_time_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 16
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}

pub fn format_local_time(time: &NaiveDateTime) -> String {
    time.format(LOCAL_TIME_FORMAT).to_string()
}

/// An observation that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewObservation {
    /// City text exactly as the caller gave it; the lookup key.
    pub requested_city: String,
    pub resolved_city_name: String,
    pub country: String,
    pub temperature: i32,
    /// When the record was fetched and stored.
    pub updated_at: DateTime<Utc>,
    /// Provider-reported wall clock time at the location.
    pub local_observation_time: NaiveDateTime,
}

/// One persisted weather reading. Records are never updated in place; a
/// refresh always appends a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub requested_city: String,
    pub resolved_city_name: String,
    pub country: String,
    pub temperature: i32,
    pub updated_at: DateTime<Utc>,
    pub local_observation_time: NaiveDateTime,
}

impl Observation {
    pub fn from_new(id: u64, new: NewObservation) -> Self {
        Self {
            id,
            requested_city: new.requested_city,
            resolved_city_name: new.resolved_city_name,
            country: new.country,
            temperature: new.temperature,
            updated_at: new.updated_at,
            local_observation_time: new.local_observation_time,
        }
    }
}

/// The projection handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherView {
    pub city_name: String,
    pub country: String,
    pub temperature: i32,
    /// `updated_at` in UTC, formatted with [`LOCAL_TIME_FORMAT`].
    pub updated_time: String,
}

impl WeatherView {
    fn project(city_name: &str, country: &str, temperature: i32, updated_at: &DateTime<Utc>) -> Self {
        Self {
            city_name: city_name.to_owned(),
            country: country.to_owned(),
            temperature,
            updated_time: format_local_time(&updated_at.naive_utc()),
        }
    }
}

impl From<&Observation> for WeatherView {
    fn from(obs: &Observation) -> Self {
        Self::project(&obs.resolved_city_name, &obs.country, obs.temperature, &obs.updated_at)
    }
}

impl From<&NewObservation> for WeatherView {
    fn from(obs: &NewObservation) -> Self {
        Self::project(&obs.resolved_city_name, &obs.country, obs.temperature, &obs.updated_at)
    }
}
