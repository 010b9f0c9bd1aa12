//! Fetch-then-extract content extractor.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::HtmlExtractor;
use crate::config::SearchConfig;
use crate::errors::{ExtractError, FetchError, WebsiftError};
use crate::fetch::HttpFetcher;
use crate::protocols::{ContentExtractor, Fetcher};
use crate::retry::{with_retry_if, RetryPolicy};

/// [`ContentExtractor`] that downloads a page and pulls its readable text.
///
/// The whole fetch is retried under `retry` when it fails with a transient
/// error. Invalid URLs and 4xx responses fail on the first attempt.
#[derive(Clone)]
pub struct WebContentExtractor {
    fetcher: Arc<dyn Fetcher>,
    html: Arc<HtmlExtractor>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for WebContentExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebContentExtractor")
            .field("html", &self.html)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl WebContentExtractor {
    /// Creates an extractor over any fetcher.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, html: HtmlExtractor, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            html: Arc::new(html),
            retry,
        }
    }

    /// Creates an HTTP-backed extractor from configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self, WebsiftError> {
        let fetcher = HttpFetcher::new(config.fetch.clone(), &config.user_agent)?;
        let html = HtmlExtractor::new(&config.extraction)?;
        Ok(Self::new(Arc::new(fetcher), html, config.page_retry.clone()))
    }

    /// Gets the HTML extractor.
    #[must_use]
    pub fn html(&self) -> &HtmlExtractor {
        &self.html
    }

    /// Gets the page-level retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }
}

#[async_trait]
impl ContentExtractor for WebContentExtractor {
    async fn extract(&self, url: &str) -> Result<String, ExtractError> {
        info!(url, "Extracting content");

        let page = with_retry_if(
            &self.retry,
            "fetch_page",
            || self.fetcher.fetch(url),
            FetchError::is_transient,
        )
        .await?;

        if !page.is_html() {
            debug!(url, content_type = ?page.content_type, "Response is not declared as HTML");
        }

        // Parsing is CPU-bound, keep it off the async workers.
        let html = Arc::clone(&self.html);
        let body = page.text;
        let text = match tokio::task::spawn_blocking(move || html.extract_text(&body)).await {
            Ok(text) => text,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                return Err(ExtractError::Parse {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };
        if text.is_empty() {
            warn!(url, "No content extracted");
            return Err(ExtractError::no_content(url));
        }

        debug!(
            url,
            final_url = %page.final_url,
            status = page.status_code,
            fetch_ms = page.duration_ms,
            chars = text.len(),
            "Extracted content"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::protocols::{FetchResult, MockFetcher};
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const ARTICLE: &str =
        "<html><body><p>An article paragraph that is comfortably over the limit.</p></body></html>";

    fn extractor(fetcher: MockFetcher) -> WebContentExtractor {
        WebContentExtractor::new(
            Arc::new(fetcher),
            HtmlExtractor::new(&ExtractionConfig::default()).unwrap(),
            RetryPolicy::new(3, Duration::from_secs(1), 2.0),
        )
    }

    #[tokio::test]
    async fn test_extracts_text_from_fetched_page() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|url| Ok(FetchResult::html(url, ARTICLE)));

        let text = extractor(fetcher).extract("https://example.com/a").await.unwrap();
        assert_eq!(text, "An article paragraph that is comfortably over the limit.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried() {
        let mut seq = Sequence::new();
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|url| Err(FetchError::status(url, 503)));
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url| Ok(FetchResult::html(url, ARTICLE)));

        let result = extractor(fetcher).extract("https://example.com/a").await;
        tokio_test::assert_ok!(result);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch().times(3).returning(|url| {
            Err(FetchError::Timeout {
                url: url.to_string(),
            })
        });

        let result = extractor(fetcher).extract("https://example.com/a").await;
        assert!(matches!(
            result,
            Err(ExtractError::Fetch(FetchError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|url| Err(FetchError::status(url, 404)));

        let result = extractor(fetcher).extract("https://example.com/missing").await;
        assert!(matches!(
            result,
            Err(ExtractError::Fetch(FetchError::Status { status: 404, .. }))
        ));
    }

    #[tokio::test]
    async fn test_empty_page_is_no_content() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|url| Ok(FetchResult::html(url, "<html><body><script>x()</script></body></html>")));

        let result = extractor(fetcher).extract("https://example.com/empty").await;
        assert!(matches!(result, Err(ExtractError::NoContent { .. })));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_large_pages_are_parsed_concurrently() {
        let paragraph = "<p>A paragraph that repeats many times across the page.</p>";
        let page = format!("<html><body>{}</body></html>", paragraph.repeat(2000));
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch()
            .times(2)
            .returning(move |url| Ok(FetchResult::html(url, page.clone())));
        let extractor = extractor(fetcher);

        let (a, b) = tokio::join!(
            extractor.extract("https://example.com/a"),
            extractor.extract("https://example.com/b")
        );
        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert_eq!(a.matches("repeats many times").count(), 2000);
    }

    #[test]
    fn test_from_config() {
        let config = SearchConfig::default();
        let extractor = WebContentExtractor::from_config(&config).unwrap();
        assert_eq!(extractor.retry().max_attempts, 3);
        assert!(extractor.html().is_ignored("footer"));
    }
}
