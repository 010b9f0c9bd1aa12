//! Brave Search API provider.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::{ProviderConfig, SearchConfig};
use crate::errors::SearchError;
use crate::protocols::SearchProvider;

const SUBSCRIPTION_TOKEN: &str = "X-Subscription-Token";

/// Retry-After fallback when a 429 carries none.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Longest slice of an error body kept in [`SearchError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Brave web search provider.
///
/// Without an API key the request goes out unauthenticated and the provider
/// decides what to do with it.
#[derive(Clone)]
pub struct BraveSearchProvider {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    result_count: Option<u32>,
    timeout: Duration,
}

impl std::fmt::Debug for BraveSearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BraveSearchProvider")
            .field("endpoint", &self.endpoint.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .field("result_count", &self.result_count)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BraveSearchProvider {
    /// Create a new Brave provider.
    ///
    /// # Arguments
    /// * `api_key` - subscription token, blank counts as none
    /// * `config` - endpoint, timeout and result count
    pub fn new(api_key: Option<String>, config: &ProviderConfig) -> Result<Self, SearchError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| SearchError::Client {
            message: format!("invalid endpoint '{}': {e}", config.endpoint),
        })?;
        let timeout = config.timeout().map_err(|e| SearchError::Client {
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Client {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            result_count: config.result_count,
            timeout,
        })
    }

    /// Builds a provider from the combined configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::new(config.api_key().map(String::from), &config.provider)
    }

    /// Whether requests carry a subscription token.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn request(&self, query: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .query(&[("q", query)]);
        if let Some(count) = self.result_count {
            request = request.query(&[("count", count)]);
        }
        if let Some(key) = &self.api_key {
            request = request.header(SUBSCRIPTION_TOKEN, key);
        }
        request
    }

    fn transport_error(&self, e: &reqwest::Error) -> SearchError {
        if e.is_timeout() {
            SearchError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            SearchError::http(e.to_string())
        }
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    async fn query(&self, query: &str) -> Result<serde_json::Value, SearchError> {
        debug!(provider = self.name(), query, "Querying search provider");

        let response = self
            .request(query)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;
        decode_body(&body)
    }

    fn name(&self) -> &'static str {
        "brave"
    }
}

fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()
}

fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> SearchError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SearchError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        };
    }
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("unknown status").to_string()
    } else {
        body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect()
    };
    SearchError::status(status.as_u16(), message)
}

fn decode_body(body: &str) -> Result<serde_json::Value, SearchError> {
    serde_json::from_str(body).map_err(|e| SearchError::decode(e.to_string()))
}
