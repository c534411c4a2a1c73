use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, config::ProviderConfig, error::Result};

pub mod weatherstack;

pub use weatherstack::WeatherstackClient;

/// Issues the single outbound call of a refresh.
#[async_trait]
pub trait ProviderClient: Send + Sync + Debug {
    /// Raw response body for `city`. Bodies are returned whatever their
    /// content; only network or timeout failures are errors here.
    async fn fetch(&self, city: &str) -> Result<String>;
}

/// `<baseUrl><accessKeyParam><key><queryParam><city>`, concatenated as is.
pub fn build_request_url(config: &ProviderConfig, api_key: &str, city: &str) -> String {
    format!(
        "{}{}{}{}{}",
        config.base_url, config.access_key_param, api_key, config.query_param, city
    )
}

/// Construct the provider client from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<WeatherstackClient> {
    let api_key = config.api_key()?;
    WeatherstackClient::new(&config.provider, api_key, config.provider_timeout())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_plain_concatenation() {
        let cfg = ProviderConfig {
            base_url: "weather-base-api-url".into(),
            ..ProviderConfig::default()
        };

        assert_eq!(
            build_request_url(&cfg, "api-key", "Antalya"),
            "weather-base-api-url?access_key=api-key&query=Antalya"
        );
    }

    #[test]
    fn url_keeps_city_text_untouched() {
        let cfg = ProviderConfig::default();
        let url = build_request_url(&cfg, "k", "antalya");
        assert!(url.ends_with("&query=antalya"));
    }

    #[test]
    fn provider_from_config_requires_key() {
        let mut cfg = Config::default();
        cfg.provider.api_key = None;

        // The env override may be set on a developer machine; only assert
        // the missing-key message when it isn't.
        if std::env::var(crate::config::API_KEY_ENV).is_err() {
            let err = provider_from_config(&cfg).unwrap_err();
            assert!(err.to_string().contains("No API key configured"));
        }
    }

    #[test]
    fn provider_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        assert!(provider_from_config(&cfg).is_ok());
    }
}
