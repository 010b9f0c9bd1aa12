//! Scripted test doubles for the pipeline traits.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::{ExtractError, FetchError, SearchError};
use crate::protocols::{ContentExtractor, FetchResult, Fetcher, SearchProvider};

use super::fixtures::brave_response;

/// A provider that replays queued responses in order.
///
/// Once the queue is empty every call returns a response with no results.
#[derive(Debug, Default)]
pub struct ScriptedSearchProvider {
    responses: Mutex<VecDeque<Result<Value, SearchError>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearchProvider {
    /// Creates a provider with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that answers once with `response`.
    #[must_use]
    pub fn with_response(response: Value) -> Self {
        let provider = Self::new();
        provider.push_response(response);
        provider
    }

    /// Queues a successful response.
    pub fn push_response(&self, response: Value) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: SearchError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns the number of times the provider was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Returns the queries received, in call order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearchProvider {
    async fn query(&self, query: &str) -> Result<Value, SearchError> {
        self.queries.lock().push(query.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(brave_response(&[])))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A fetcher serving fixed pages from memory.
///
/// Unknown URLs answer with a 404 status error.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    errors: HashMap<String, FetchError>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Creates a fetcher with no pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Fails every fetch of `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.errors.insert(url.into(), error);
        self
    }

    /// Returns the total number of fetches.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns how many times `url` was fetched.
    #[must_use]
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        self.calls.lock().push(url.to_string());
        if let Some(error) = self.errors.get(url) {
            return Err(error.clone());
        }
        self.pages
            .get(url)
            .map(|html| FetchResult::html(url, html.clone()))
            .ok_or_else(|| FetchError::status(url, 404))
    }
}

/// An extractor with per-URL scripted outcomes.
///
/// URLs without a script fail with [`ExtractError::NoContent`]. The extractor
/// also tracks how many extractions were in flight at once.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    outcomes: HashMap<String, Result<String, ExtractError>>,
    panics: HashSet<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExtractor {
    /// Creates an extractor with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `content` for `url`.
    #[must_use]
    pub fn with_content(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.outcomes.insert(url.into(), Ok(content.into()));
        self
    }

    /// Fails `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: impl Into<String>, error: ExtractError) -> Self {
        self.outcomes.insert(url.into(), Err(error));
        self
    }

    /// Panics when asked for `url`.
    #[must_use]
    pub fn with_panic(mut self, url: impl Into<String>) -> Self {
        self.panics.insert(url.into());
        self
    }

    /// Sleeps for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of extractions started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the highest number of concurrent extractions seen.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentExtractor for ScriptedExtractor {
    async fn extract(&self, url: &str) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        assert!(!self.panics.contains(url), "scripted panic for {url}");

        self.outcomes
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(ExtractError::no_content(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedSearchProvider::new();
        provider.push_error(SearchError::http("down"));
        provider.push_response(brave_response(&[("T", "https://example.com", "")]));

        assert!(provider.query("a").await.is_err());
        assert!(provider.query("b").await.is_ok());
        assert_eq!(provider.query("c").await.unwrap(), brave_response(&[]));
        assert_eq!(provider.queries(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticFetcher::new()
            .with_page("https://example.com", "<p>hi</p>")
            .with_error("https://example.com/down", FetchError::status("https://example.com/down", 503));

        assert_eq!(fetcher.fetch("https://example.com").await.unwrap().text, "<p>hi</p>");
        assert!(matches!(
            fetcher.fetch("https://example.com/missing").await,
            Err(FetchError::Status { status: 404, .. })
        ));
        assert!(matches!(
            fetcher.fetch("https://example.com/down").await,
            Err(FetchError::Status { status: 503, .. })
        ));
        assert_eq!(fetcher.call_count(), 3);
        assert_eq!(fetcher.calls_for("https://example.com"), 1);
    }

    #[tokio::test]
    async fn test_scripted_extractor_outcomes() {
        let extractor = ScriptedExtractor::new().with_content("https://example.com/a", "text");

        assert_eq!(extractor.extract("https://example.com/a").await.unwrap(), "text");
        assert!(matches!(
            extractor.extract("https://example.com/b").await,
            Err(ExtractError::NoContent { .. })
        ));
        assert_eq!(extractor.call_count(), 2);
        assert_eq!(extractor.max_in_flight(), 1);
    }
}
