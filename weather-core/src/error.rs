//! Failure kinds surfaced by [`crate::WeatherService::get_weather`].

use thiserror::Error;

use crate::parser::{DecodeFailure, ProviderErrorPayload};

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WeatherError {
    /// The provider answered, but declined the request.
    #[error("weather provider rejected the request: {0}")]
    ProviderRejected(ProviderErrorPayload),

    /// The body matched neither response shape, or carried a local time
    /// outside the fixed format.
    #[error("malformed upstream response: {reason}")]
    MalformedUpstreamResponse { reason: String },

    /// Network, connection or timeout failure talking to the provider.
    #[error("transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),

    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl From<DecodeFailure> for WeatherError {
    fn from(failure: DecodeFailure) -> Self {
        Self::MalformedUpstreamResponse { reason: failure.reason }
    }
}

impl WeatherError {
    /// The caller can act on this (e.g. fix the plan or key); everything else
    /// is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ProviderRejected(_))
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(err) => err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
                .any(reqwest::Error::is_timeout),
            _ => false,
        }
    }

    /// Short message suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderRejected(payload) => format!("Weather provider refused: {}", payload.info),
            Self::MalformedUpstreamResponse { .. } => {
                "Weather provider returned an unexpected response".to_string()
            }
            Self::Transport(_) if self.is_timeout() => {
                "Weather provider did not answer in time".to_string()
            }
            Self::Transport(_) => "Could not reach the weather provider".to_string(),
            Self::Storage(_) => "Local observation store failed".to_string(),
        }
    }
}
