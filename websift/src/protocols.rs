//! Protocol traits for pluggable websift components.
//!
//! Providers, fetchers and extractors can be swapped without touching the
//! aggregator or the engine.

use async_trait::async_trait;

use crate::errors::{ExtractError, FetchError, SearchError};
use crate::models::{EnrichedResult, SearchHit};

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Response body as text.
    pub text: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl FetchResult {
    /// Creates a 200 HTML result, mostly useful for tests and stubs.
    #[must_use]
    pub fn html(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            text: body.into(),
            final_url: url.into(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            duration_ms: 0.0,
        }
    }

    /// Whether the response is HTML.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|ct| ct.contains("text/html") || ct.contains("application/xhtml"))
    }
}

/// A web search backend.
///
/// Returns the provider's raw JSON so that shape validation stays in one
/// provider-agnostic place.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Runs a query against the provider.
    async fn query(&self, query: &str) -> Result<serde_json::Value, SearchError>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Protocol for HTTP fetching.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError>;
}

/// Protocol for turning a URL into readable text.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Extracts the main text of the page at `url`.
    async fn extract(&self, url: &str) -> Result<String, ExtractError>;
}

/// The full search capability: query, extract, aggregate.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Searches and returns enriched results. Never fails.
    async fn search(&self, query: &str) -> Vec<EnrichedResult>;

    /// Extracts one URL's content, or `None` if nothing usable came back.
    async fn extract_content(&self, url: &str) -> Option<String>;

    /// Enriches already-normalized hits with page content.
    async fn process_results(&self, hits: Vec<SearchHit>) -> Vec<EnrichedResult>;
}
