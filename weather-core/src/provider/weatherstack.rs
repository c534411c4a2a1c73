use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    config::ProviderConfig,
    error::{Result, WeatherError},
    provider::build_request_url,
};

use super::ProviderClient;

/// weatherstack "current" endpoint client.
#[derive(Debug, Clone)]
pub struct WeatherstackClient {
    config: ProviderConfig,
    api_key: String,
    http: Client,
}

impl WeatherstackClient {
    pub fn new(config: &ProviderConfig, api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { config: config.clone(), api_key, http })
    }

    fn request_url(&self, city: &str) -> String {
        build_request_url(&self.config, &self.api_key, city)
    }
}

#[async_trait]
impl ProviderClient for WeatherstackClient {
    async fn fetch(&self, city: &str) -> Result<String> {
        let url = self.request_url(city);
        debug!(url = %redact_key(&url, &self.api_key), "requesting weatherstack");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send request to weatherstack")
            .map_err(WeatherError::Transport)?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read weatherstack response body")
            .map_err(WeatherError::Transport)?;

        // weatherstack reports most failures in-band with 200; a non-2xx body
        // still goes to the parser, which decides what it is.
        if !status.is_success() {
            warn!(%status, body = %truncate_body(&body), "weatherstack answered with non-success status");
        }

        Ok(body)
    }
}

fn redact_key(url: &str, api_key: &str) -> String {
    if api_key.is_empty() { url.to_string() } else { url.replace(api_key, "***") }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
