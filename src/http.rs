//! Shared HTTP client for provider calls.
//!
//! Wraps a `reqwest::Client` with the retry policy every provider uses.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Network errors → retry
//! - HTTP 404 → [`ProviderError::NotFound`], no retry
//! - Other HTTP 4xx → [`ProviderError::UpstreamUnavailable`], no retry
//! - Backoff: `retry_backoff_ms` × 1, 2, 4, 8, ... (capped at 2^5)
//!
//! Successful bodies that fail to decode map to [`ProviderError::Malformed`].

use std::time::Duration;

use anyhow::Result;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::AggregatorConfig;
use crate::error::ProviderError;

/// Longest upstream error body echoed into an error message.
const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &AggregatorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// `GET url?query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> crate::error::Result<T> {
        self.execute(url, query, headers, false).await
    }

    /// Like [`get_json`](Self::get_json), but a non-retryable 4xx response
    /// whose body decodes as `T` is returned as `Ok`.
    ///
    /// For APIs that report failures inside a JSON envelope with a 4xx status.
    pub async fn get_json_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> crate::error::Result<T> {
        self.execute(url, query, headers, true).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
        headers: &[(&str, &str)],
        decode_client_errors: bool,
    ) -> crate::error::Result<T> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            debug!(url = %url, attempt, "upstream request");
            let mut request = self.client.get(url.clone()).query(query);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_err = Some(ProviderError::UpstreamUnavailable(format!("{}: {}", url, e)));
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| ProviderError::UpstreamUnavailable(format!("{}: {}", url, e)))?;
                return decode(&url, &body);
            }

            if status == StatusCode::NOT_FOUND {
                return Err(ProviderError::NotFound(url.to_string()));
            }

            // Rate limited or server error: retry
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_err = Some(ProviderError::UpstreamUnavailable(format!(
                    "{} returned {}",
                    url, status
                )));
                continue;
            }

            // Client error (not 404/429): no retry
            let body = response.bytes().await.unwrap_or_default();
            if decode_client_errors {
                if let Ok(parsed) = serde_json::from_slice::<T>(&body) {
                    return Ok(parsed);
                }
            }
            let preview: String = String::from_utf8_lossy(&body)
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect();
            return Err(ProviderError::UpstreamUnavailable(format!(
                "{} returned {}: {}",
                url, status, preview
            )));
        }

        Err(last_err.unwrap_or_else(|| {
            ProviderError::UpstreamUnavailable(format!("{}: request failed after retries", url))
        }))
    }
}

fn decode<T: DeserializeOwned>(url: &Url, body: &[u8]) -> crate::error::Result<T> {
    serde_json::from_slice(body).map_err(|e| ProviderError::Malformed(format!("{}: {}", url, e)))
}

/// Append percent-encoded path segments to a configured base URL.
///
/// ```rust
/// use taskflow::http::endpoint;
///
/// let url = endpoint("https://api.github.com", &["users", "octo cat"]).unwrap();
/// assert_eq!(url.as_str(), "https://api.github.com/users/octo%20cat");
/// ```
pub fn endpoint(base: &str, segments: &[&str]) -> crate::error::Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ProviderError::NotConfigured(format!("invalid base URL '{}': {}", base, e)))?;
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            ProviderError::NotConfigured(format!("base URL '{}' cannot take a path", base))
        })?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}
