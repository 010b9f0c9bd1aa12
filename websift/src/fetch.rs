//! HTTP page fetching with transport-level retry.
//!
//! [`HttpFetcher`] issues a single GET and re-issues it on connection errors
//! and a fixed set of status codes. Retrying the fetch as a whole is the
//! extractor's job, not this one's.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::errors::FetchError;
use crate::observability::SpanTimer;
use crate::protocols::{FetchResult, Fetcher};

/// reqwest-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Builds a fetcher with the given configuration and user agent.
    pub fn new(config: FetchConfig, user_agent: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| FetchError::Client {
                message: format!("invalid header name '{key}': {e}"),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| FetchError::Client {
                message: format!("invalid value for header '{key}': {e}"),
            })?;
            headers.insert(name, value);
        }

        let timeout = config.timeout().map_err(|e| FetchError::Client {
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Client {
                message: e.to_string(),
            })?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Rejects anything that is not an absolute http(s) URL.
    pub fn validate_url(url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(FetchError::invalid_url(url, "missing host"));
        }
        Ok(parsed)
    }

    async fn send_once(&self, url: &Url) -> Result<Response, FetchError> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_transport_error(url.as_str(), &e))
    }

    /// Streams the body, giving up as soon as it exceeds the size limit.
    ///
    /// The body is decoded as UTF-8 with invalid sequences replaced.
    async fn read_body(&self, url: &str, mut response: Response) -> Result<String, FetchError> {
        let limit = self.config.max_response_bytes;
        let too_large = || FetchError::TooLarge {
            url: url.to_string(),
            limit,
        };

        if response
            .content_length()
            .is_some_and(|len| usize::try_from(len).map_or(true, |len| len > limit))
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let parsed = Self::validate_url(url)?;
        let retry = &self.config.retry;
        let timer = SpanTimer::start("fetch");
        let mut retries = 0;

        loop {
            debug!(url, attempt = retries + 1, "Requesting page");

            let response = match self.send_once(&parsed).await {
                Ok(response) => response,
                Err(e) if e.is_transient() && retries < retry.max_retries => {
                    retries += 1;
                    let delay = retry.delay_for_retry(retries);
                    warn!(url, retries, delay_ms = millis(delay), error = %e, "Transport error, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let status = response.status().as_u16();
            if retry.should_retry_status(status) && retries < retry.max_retries {
                retries += 1;
                let delay = retry_after(response.headers())
                    .map_or_else(|| retry.delay_for_retry(retries), |d| retry.cap_delay(d));
                warn!(url, status, retries, delay_ms = millis(delay), "Retryable status, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(FetchError::status(url, status));
            }

            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let text = self.read_body(url, response).await?;
            let duration_ms = timer.finish();

            debug!(url, status, bytes = text.len(), duration_ms, "Fetched page");

            return Ok(FetchResult {
                status_code: status,
                text,
                final_url,
                content_type,
                duration_ms,
            });
        }
    }
}

/// Maps a reqwest error onto the fetch taxonomy.
fn classify_transport_error(url: &str, e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else if e.is_redirect() || e.is_builder() {
        FetchError::invalid_url(url, e.to_string())
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

/// Parses a `Retry-After` header given in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
