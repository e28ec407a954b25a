use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use super::Fetcher;
use crate::config::HttpConfig;
use crate::errors::AppError;

/// Retry policy applied inside a fetch function
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first failure
    pub max_attempts: u32,
    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Fraction of the delay randomly added or removed
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay_ms as f64;
        let delay = base_delay * self.backoff_multiplier.powi(attempt as i32);
        let delay = delay.min(self.max_delay_ms as f64);

        let jitter = delay * self.jitter_factor * (rand::random::<f64>() - 0.5);
        let final_delay = (delay + jitter).max(0.0) as u64;

        Duration::from_millis(final_delay)
    }

    pub fn exponential(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            ..Default::default()
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// GETs a JSON document, sending object args as query parameters
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    url: Url,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build the client shared by every fetcher from the `[http]` section
    pub fn client(config: &HttpConfig) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .context("Failed to create async HTTP client")
    }

    pub fn new(client: Client, url: Url, retry: RetryConfig) -> Self {
        Self { client, url, retry }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `url` with `args` appended as query parameters. Scalars are sent as
    /// their plain text, nested values as JSON; non-object args become `args=<json>`.
    pub fn request_url(&self, args: Option<&Value>) -> Url {
        let mut url = self.url.clone();

        match args {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in map {
                    pairs.append_pair(key, &query_value(value));
                }
            }
            Some(other) => {
                url.query_pairs_mut().append_pair("args", &other.to_string());
            }
        }
        url
    }

    async fn fetch_once(&self, url: &Url) -> Result<Value, AppError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::HttpStatus {
                status_code: status.as_u16(),
                reason,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, args: Option<Value>) -> Result<Value> {
        let url = self.request_url(args.as_ref());
        let mut attempt = 0;

        loop {
            match self.fetch_once(&url).await {
                Ok(value) => {
                    debug!("Fetched {}", url);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.calculate_delay(attempt);
                    attempt += 1;
                    warn!(
                        "GET {} failed (attempt {}/{}), retrying in {:?}: {}",
                        url,
                        attempt,
                        self.retry.max_attempts + 1,
                        delay,
                        e
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e).context(format!("GET {} failed", url)));
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}
