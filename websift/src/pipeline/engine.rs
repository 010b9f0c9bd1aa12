//! The search engine and the crate-level entry point.

use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::panic_message;
use super::ResultAggregator;
use crate::config::SearchConfig;
use crate::errors::WebsiftError;
use crate::extract::WebContentExtractor;
use crate::models::{EnrichedResult, SearchHit};
use crate::observability::SpanTimer;
use crate::protocols::{ContentExtractor, SearchEngine, SearchProvider};
use crate::search::{BraveSearchProvider, SearchClient};

/// Web search with page content: query, fetch, extract, aggregate.
///
/// # Example
///
/// ```rust,ignore
/// use websift::prelude::*;
///
/// let engine = WebSearch::new(SearchConfig::from_env())?;
/// for result in engine.search("rust async runtimes").await {
///     println!("{} ({} words)", result.title, result.word_count());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WebSearch {
    client: SearchClient,
    aggregator: ResultAggregator,
}

impl WebSearch {
    /// Builds the Brave and HTTP backed engine.
    pub fn new(config: SearchConfig) -> Result<Self, WebsiftError> {
        config.validate()?;
        let provider = BraveSearchProvider::from_config(&config)?;
        let extractor = WebContentExtractor::from_config(&config)?;
        Ok(Self::with_components(
            Arc::new(provider),
            Arc::new(extractor),
            &config,
        ))
    }

    /// Builds an engine from `BRAVE_API_KEY` and `USER_AGENT`.
    pub fn from_env() -> Result<Self, WebsiftError> {
        Self::new(SearchConfig::from_env())
    }

    /// Builds an engine around custom components.
    ///
    /// Only the retry, result limit and concurrency settings of `config` are
    /// used.
    #[must_use]
    pub fn with_components(
        provider: Arc<dyn SearchProvider>,
        extractor: Arc<dyn ContentExtractor>,
        config: &SearchConfig,
    ) -> Self {
        let client = SearchClient::new(provider, config.search_retry.clone())
            .with_max_results(config.provider.max_results);
        let aggregator = ResultAggregator::new(extractor, config.max_concurrent);
        Self { client, aggregator }
    }

    /// Gets the search client.
    #[must_use]
    pub fn client(&self) -> &SearchClient {
        &self.client
    }

    /// Gets the aggregator.
    #[must_use]
    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    /// Searches and enriches, surfacing provider errors.
    pub async fn try_search(&self, query: &str) -> Result<Vec<EnrichedResult>, WebsiftError> {
        let timer = SpanTimer::start("search");

        let hits = self.client.search(query).await?;
        if hits.is_empty() {
            info!("No search hits");
            return Ok(Vec::new());
        }

        let report = self.aggregator.process(hits).await;
        info!(
            results = report.results.len(),
            duration_ms = timer.finish(),
            "Search complete"
        );
        Ok(report.results)
    }

    /// Searches and enriches. Never fails: errors give an empty list.
    pub async fn search(&self, query: &str) -> Vec<EnrichedResult> {
        let span = info_span!("search", search_id = %Uuid::new_v4(), query);

        async {
            match AssertUnwindSafe(self.try_search(query)).catch_unwind().await {
                Ok(Ok(results)) => results,
                Ok(Err(e)) => {
                    error!(error = %e, "Search failed");
                    Vec::new()
                }
                Err(payload) => {
                    error!(panic = %panic_message(&*payload), "Search panicked");
                    Vec::new()
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl SearchEngine for WebSearch {
    async fn search(&self, query: &str) -> Vec<EnrichedResult> {
        WebSearch::search(self, query).await
    }

    async fn extract_content(&self, url: &str) -> Option<String> {
        self.aggregator.extract_one(url).await.into_content()
    }

    async fn process_results(&self, hits: Vec<SearchHit>) -> Vec<EnrichedResult> {
        self.aggregator.process_results(hits).await
    }
}

/// Searches the web and returns enriched results.
///
/// With `None`, configuration comes from the environment. Bad configuration
/// and provider failures are logged and give an empty list, and so does a
/// panic while building the engine.
pub async fn search(query: &str, config: Option<SearchConfig>) -> Vec<EnrichedResult> {
    let run = async {
        let config = config.unwrap_or_else(SearchConfig::from_env);
        match WebSearch::new(config) {
            Ok(engine) => engine.search(query).await,
            Err(e) => {
                error!(error = %e, "Could not build search engine");
                Vec::new()
            }
        }
    };

    AssertUnwindSafe(run).catch_unwind().await.unwrap_or_else(|payload| {
        error!(panic = %panic_message(&*payload), "Search engine setup panicked");
        Vec::new()
    })
}
