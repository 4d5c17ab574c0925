//! Upstream proxy client
//!
//! Forwards validated commands to the internal execution service over HTTP
//! with bounded timeouts, and maps every failure mode to a normalized result.
//! The gateway never surfaces an upstream failure as a server fault.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::models::{AppCatalog, ProxyCommand, ProxyResult};

/// Path the execute calls are forwarded to
const EXECUTE_PATH: &str = "/api/internal-execute";
/// Path serving the app/event catalog
const CATALOG_PATH: &str = "/api/get-apps";
/// Header carrying the pre-shared key
const API_KEY_HEADER: &str = "x-api-key";

/// Failure modes of an upstream call
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("failed to reach upstream: {0}")]
    Unavailable(String),

    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream returned a malformed body: {0}")]
    Malformed(String),
}

/// HTTP client for the internal execution service
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    api_key: String,
    catalog_timeout: Duration,
}

impl UpstreamClient {
    /// Create a client for the given base URL.
    ///
    /// `request_timeout` bounds execute calls; `catalog_timeout` bounds the
    /// dashboard catalog fetch, which tolerates failure and should give up
    /// quickly.
    pub fn new(
        base_url: String,
        api_key: String,
        request_timeout: Duration,
        catalog_timeout: Duration,
    ) -> Self {
        UpstreamClient {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
            catalog_timeout,
        }
    }

    /// Send a command to the execution endpoint.
    ///
    /// On 200 the `filtered_message` field of the JSON body is returned;
    /// a JSON body without that field is passed through whole.
    pub async fn execute(&self, command: &ProxyCommand) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, EXECUTE_PATH))
            .header(API_KEY_HEADER, &self.api_key)
            .form(command)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => match value.get("filtered_message").and_then(|m| m.as_str()) {
                Some(message) => Ok(message.to_string()),
                None => Ok(body),
            },
            Err(e) => Err(UpstreamError::Malformed(e.to_string())),
        }
    }

    /// Total version of [`execute`](Self::execute): every failure becomes a
    /// `success: false` result with a kind-specific message.
    pub async fn forward(&self, command: &ProxyCommand) -> ProxyResult {
        match self.execute(command).await {
            Ok(message) => ProxyResult {
                success: true,
                message,
            },
            Err(e) => {
                log::warn!("Upstream call failed: {}", e);
                ProxyResult {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }

    /// Fetch the app/event catalog for the dashboard.
    ///
    /// Any failure logs at debug level and yields an empty catalog; the
    /// dashboard renders without it.
    pub async fn fetch_catalog(&self) -> AppCatalog {
        let result = self
            .client
            .get(format!("{}{}", self.base_url, CATALOG_PATH))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.catalog_timeout)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<AppCatalog>().await {
                    Ok(catalog) => catalog,
                    Err(e) => {
                        log::debug!("Catalog response malformed: {}", e);
                        AppCatalog::new()
                    }
                }
            }
            Ok(response) => {
                log::debug!("Catalog fetch returned status {}", response.status());
                AppCatalog::new()
            }
            Err(e) => {
                log::debug!("Catalog fetch failed: {}", e);
                AppCatalog::new()
            }
        }
    }
}

fn classify(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::Unavailable(e.to_string())
    }
}
