//! Search client: provider call, retry and hit normalization.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::SearchError;
use crate::models::{SearchHit, UNTITLED};
use crate::protocols::SearchProvider;
use crate::retry::{with_retry, RetryPolicy};

/// Queries a provider and turns its raw response into [`SearchHit`]s.
#[derive(Clone)]
pub struct SearchClient {
    provider: Arc<dyn SearchProvider>,
    retry: RetryPolicy,
    max_results: Option<usize>,
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("provider", &self.provider.name())
            .field("retry", &self.retry)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl SearchClient {
    /// Creates a client around a provider.
    #[must_use]
    pub fn new(provider: Arc<dyn SearchProvider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            max_results: None,
        }
    }

    /// Keeps at most `max` hits.
    #[must_use]
    pub fn with_max_results(mut self, max: Option<usize>) -> Self {
        self.max_results = max;
        self
    }

    /// Gets the retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Searches and returns normalized hits in provider order.
    ///
    /// A blank query returns no hits without contacting the provider. Provider
    /// errors are retried under the client's policy and returned once it is
    /// exhausted.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            debug!("Blank query, skipping provider call");
            return Ok(Vec::new());
        }

        let raw = with_retry(&self.retry, "search_query", || self.provider.query(query)).await?;

        let mut hits = parse_hits(&raw);
        if let Some(max) = self.max_results {
            hits.truncate(max);
        }

        info!(provider = self.provider.name(), query, hits = hits.len(), "Search returned");
        Ok(hits)
    }
}

/// Validates a provider response and normalizes its hits.
///
/// Expects `{"web": {"results": [...]}}`. Any other shape gives an empty list.
/// Entries without a usable absolute http(s) `url` are dropped; a missing
/// title becomes `"Untitled"` and a missing description `""`.
#[must_use]
pub fn parse_hits(raw: &Value) -> Vec<SearchHit> {
    let Some(root) = raw.as_object() else {
        warn!("Search response is not a JSON object");
        return Vec::new();
    };
    let Some(web) = root.get("web").and_then(Value::as_object) else {
        warn!("Search response has no 'web' object");
        return Vec::new();
    };
    let Some(results) = web.get("results").and_then(Value::as_array) else {
        warn!("Search response has no 'web.results' array");
        return Vec::new();
    };

    let hits: Vec<SearchHit> = results.iter().filter_map(parse_hit).collect();
    if hits.len() < results.len() {
        debug!(raw = results.len(), kept = hits.len(), "Dropped unusable hits");
    }
    hits
}

fn parse_hit(entry: &Value) -> Option<SearchHit> {
    let entry = entry.as_object()?;

    let url = entry.get("url").and_then(Value::as_str).map(str::trim)?;
    if url.is_empty() {
        return None;
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some() => {}
        _ => {
            debug!(url, "Skipping hit with unusable URL");
            return None;
        }
    }

    let title = entry.get("title").and_then(Value::as_str).unwrap_or(UNTITLED);
    let description = entry.get("description").and_then(Value::as_str).unwrap_or_default();

    Some(SearchHit::new(title, url, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{brave_response, ScriptedSearchProvider};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn client(provider: &Arc<ScriptedSearchProvider>) -> SearchClient {
        SearchClient::new(
            provider.clone(),
            RetryPolicy::new(5, Duration::from_secs(1), 2.0),
        )
    }

    #[test]
    fn test_parse_hits_defaults() {
        let raw = json!({"web": {"results": [
            {"url": "https://example.com/a"},
            {"title": "B", "url": "https://example.com/b", "description": "Snippet"},
            {"title": 42, "url": "https://example.com/c", "description": null},
        ]}});

        assert_eq!(
            parse_hits(&raw),
            vec![
                SearchHit::new("Untitled", "https://example.com/a", ""),
                SearchHit::new("B", "https://example.com/b", "Snippet"),
                SearchHit::new("Untitled", "https://example.com/c", ""),
            ]
        );
    }

    #[test]
    fn test_parse_hits_malformed_shapes() {
        let shapes = [
            json!({"web": {}}),
            json!({"web": {"results": "nope"}}),
            json!({"web": {"results": null}}),
            json!({"web": null}),
            json!({"other": []}),
            json!([{"url": "https://example.com"}]),
            json!("text"),
            Value::Null,
        ];
        for shape in &shapes {
            assert!(parse_hits(shape).is_empty(), "expected no hits for {shape}");
        }
    }

    #[test]
    fn test_parse_hits_drops_unusable_urls() {
        let raw = json!({"web": {"results": [
            {"title": "no url"},
            {"title": "blank", "url": "  "},
            {"title": "relative", "url": "/path"},
            {"title": "ftp", "url": "ftp://example.com/file"},
            {"title": "number", "url": 7},
            "not an object",
            {"title": "ok", "url": " https://example.com/ok "},
        ]}});

        let hits = parse_hits(&raw);
        assert_eq!(hits, vec![SearchHit::new("ok", "https://example.com/ok", "")]);
    }

    #[tokio::test]
    async fn test_blank_query_skips_provider() {
        let provider = Arc::new(ScriptedSearchProvider::new());
        let hits = client(&provider).search("   ").await.unwrap();

        assert!(hits.is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_query_is_trimmed() {
        let provider = Arc::new(ScriptedSearchProvider::new());
        provider.push_response(brave_response(&[("T", "https://example.com", "D")]));

        let hits = client(&provider).search("  rust  ").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(provider.queries(), vec!["rust".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_errors_are_retried() {
        let provider = Arc::new(ScriptedSearchProvider::new());
        provider.push_error(SearchError::http("connection reset"));
        provider.push_error(SearchError::RateLimited { retry_after_secs: 1 });
        provider.push_response(brave_response(&[("T", "https://example.com", "D")]));

        let hits = client(&provider).search("rust").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_returned_after_exhaustion() {
        let provider = Arc::new(ScriptedSearchProvider::new());
        for _ in 0..5 {
            provider.push_error(SearchError::status(500, "boom"));
        }

        let result = client(&provider).search("rust").await;
        assert!(matches!(result, Err(SearchError::Status { status: 500, .. })));
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_max_results_truncates() {
        let provider = Arc::new(ScriptedSearchProvider::new());
        provider.push_response(brave_response(&[
            ("A", "https://example.com/a", ""),
            ("B", "https://example.com/b", ""),
            ("C", "https://example.com/c", ""),
        ]));

        let hits = client(&provider)
            .with_max_results(Some(2))
            .search("rust")
            .await
            .unwrap();
        let urls: Vec<_> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }
}
