//! Static fetch: plain HTTP GET, no script execution
//!
//! Transient failures (timeouts, connection errors, 4xx/5xx statuses) are
//! retried per the configured `RetryPolicy`. Whatever happens, the caller
//! gets a `FetchResult`, never an error.

use crate::config::StaticFetchConfig;
use crate::error::FetchError;
use crate::retry::RetryPolicy;
use crate::schema::FetchResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Anything that can turn a URL into a `FetchResult`
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult;
}

pub struct StaticFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl StaticFetcher {
    /// Build a fetcher with its own connection pool
    pub fn new(config: &StaticFetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config.retry.policy()))
    }

    /// Reuse an existing client (and its connection pool)
    pub fn with_client(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    async fn get(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.text().await
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        let outcome = self
            .retry
            .run(|_| self.get(url), is_transient)
            .await;

        match outcome {
            Ok(body) => {
                tracing::info!("Fetched static content from {}", url);
                FetchResult::fetched(url, body)
            }
            Err(e) => {
                tracing::error!("Error fetching {}: {}", url, e);
                FetchResult::failed(url, FetchError::Network(describe(&e)))
            }
        }
    }
}

/// Malformed requests and redirect loops will fail the same way again
fn is_transient(e: &reqwest::Error) -> bool {
    !(e.is_builder() || e.is_redirect())
}

fn describe(e: &reqwest::Error) -> String {
    if let Some(status) = e.status() {
        format!("HTTP {}", status)
    } else if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else {
        e.to_string()
    }
}
