//! End-to-end pipeline tests over in-memory doubles.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

use super::WebSearch;
use crate::config::{ExtractionConfig, SearchConfig};
use crate::errors::FetchError;
use crate::extract::{HtmlExtractor, WebContentExtractor};
use crate::retry::RetryPolicy;
use crate::testing::{brave_response, html_page, ScriptedSearchProvider, StaticFetcher};

const FIRST: &str = "The first paragraph has comfortably more than thirty characters.";
const SECOND: &str = "The second paragraph is also long enough to be kept in the output.";

fn engine(provider: Arc<ScriptedSearchProvider>, fetcher: Arc<StaticFetcher>) -> WebSearch {
    let config = SearchConfig::default();
    let extractor = WebContentExtractor::new(
        fetcher,
        HtmlExtractor::new(&ExtractionConfig::default()).unwrap(),
        RetryPolicy::new(3, Duration::from_millis(100), 2.0),
    );
    WebSearch::with_components(provider, Arc::new(extractor), &config)
}

#[tokio::test]
async fn test_search_end_to_end() {
    let provider = Arc::new(ScriptedSearchProvider::with_response(brave_response(&[(
        "Example",
        "https://example.com",
        "An example page",
    )])));
    let fetcher = Arc::new(StaticFetcher::new().with_page("https://example.com", html_page(&[FIRST, SECOND])));

    let results = engine(provider.clone(), fetcher.clone()).search("test").await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.title, "Example");
    assert_eq!(result.url, "https://example.com");
    assert_eq!(result.description, "An example page");
    assert_eq!(result.content, format!("{FIRST}\n\n{SECOND}"));
    assert!(!result.content.contains("Copyright"));
    assert_eq!(provider.queries(), vec!["test".to_string()]);
    assert_eq!(fetcher.call_count(), 1);
}

#[tokio::test]
async fn test_blank_query_makes_no_calls() {
    let provider = Arc::new(ScriptedSearchProvider::new());
    let fetcher = Arc::new(StaticFetcher::new());

    let results = engine(provider.clone(), fetcher.clone()).search(" \t ").await;

    assert!(results.is_empty());
    assert_eq!(provider.call_count(), 0);
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_pages_are_dropped_in_order() {
    let provider = Arc::new(ScriptedSearchProvider::with_response(brave_response(&[
        ("Missing", "https://example.com/missing", ""),
        ("Down", "https://example.com/down", ""),
        ("Good", "https://example.com/good", ""),
        ("Empty", "https://example.com/empty", ""),
        ("Also good", "https://example.com/also-good", ""),
    ])));
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_error(
                "https://example.com/down",
                FetchError::Timeout {
                    url: "https://example.com/down".to_string(),
                },
            )
            .with_page("https://example.com/good", html_page(&[FIRST]))
            .with_page("https://example.com/empty", "<html><body><script>x()</script></body></html>")
            .with_page("https://example.com/also-good", html_page(&[SECOND])),
    );

    let results = engine(provider, fetcher.clone()).search("rust").await;

    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Good", "Also good"]);
    assert_eq!(fetcher.calls_for("https://example.com/missing"), 1);
    assert_eq!(fetcher.calls_for("https://example.com/down"), 3);
}

#[tokio::test]
async fn test_hits_without_urls_are_skipped() {
    let raw = serde_json::json!({"web": {"results": [
        {"title": "No URL"},
        {"title": "Good", "url": "https://example.com/good"},
    ]}});
    let provider = Arc::new(ScriptedSearchProvider::with_response(raw));
    let fetcher = Arc::new(StaticFetcher::new().with_page("https://example.com/good", html_page(&[FIRST])));

    let results = engine(provider, fetcher.clone()).search("rust").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].description, "");
    assert_eq!(fetcher.call_count(), 1);
}
