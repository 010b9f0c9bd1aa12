//! Concurrent enrichment of search hits.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::panic_message;
use crate::models::{EnrichedResult, ExtractionOutcome, SearchHit};
use crate::observability::SpanTimer;
use crate::protocols::ContentExtractor;

/// Counters for one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Number of hits handed in.
    pub total: usize,
    /// Number of hits whose extraction has finished.
    pub completed: usize,
    /// Number of hits kept.
    pub success_count: usize,
    /// Number of hits dropped.
    pub error_count: usize,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: f64,
}

impl ProcessStats {
    /// Creates new stats for `total` hits.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Returns the completion percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Records a kept hit.
    pub fn record_success(&mut self, elapsed_ms: f64) {
        self.completed += 1;
        self.success_count += 1;
        self.elapsed_ms = elapsed_ms;
    }

    /// Records a dropped hit.
    pub fn record_error(&mut self, elapsed_ms: f64) {
        self.completed += 1;
        self.error_count += 1;
        self.elapsed_ms = elapsed_ms;
    }
}

/// Enriched results together with the run's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    /// Kept results, in input order.
    pub results: Vec<EnrichedResult>,
    /// Run counters.
    pub stats: ProcessStats,
}

/// Runs a [`ContentExtractor`] over many hits with bounded concurrency.
///
/// A failing or panicking extraction only drops its own hit.
#[derive(Clone)]
pub struct ResultAggregator {
    extractor: Arc<dyn ContentExtractor>,
    max_concurrent: usize,
}

impl std::fmt::Debug for ResultAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultAggregator")
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}

impl ResultAggregator {
    /// Creates an aggregator. A bound of zero is treated as one.
    #[must_use]
    pub fn new(extractor: Arc<dyn ContentExtractor>, max_concurrent: usize) -> Self {
        Self {
            extractor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Gets the concurrency bound.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Enriches hits and returns only the ones with content.
    pub async fn process_results(&self, hits: Vec<SearchHit>) -> Vec<EnrichedResult> {
        self.process(hits).await.results
    }

    /// Enriches hits and reports what happened.
    pub async fn process(&self, hits: Vec<SearchHit>) -> AggregationReport {
        let timer = SpanTimer::start("process_results");
        let mut stats = ProcessStats::new(hits.len());

        let outcomes: Vec<(SearchHit, ExtractionOutcome)> = stream::iter(hits)
            .map(|hit| async move {
                let outcome = self.extract_one(&hit.url).await;
                (hit, outcome)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (hit, outcome) in outcomes {
            match outcome.into_content() {
                Some(content) => {
                    stats.record_success(timer.elapsed_ms());
                    results.push(hit.enrich(content));
                }
                None => stats.record_error(timer.elapsed_ms()),
            }
        }
        stats.elapsed_ms = timer.finish();

        info!(
            total = stats.total,
            success_count = stats.success_count,
            error_count = stats.error_count,
            elapsed_ms = stats.elapsed_ms,
            "Processed search results"
        );

        AggregationReport { results, stats }
    }

    /// Extracts one URL, turning errors and panics into a failure outcome.
    pub async fn extract_one(&self, url: &str) -> ExtractionOutcome {
        match AssertUnwindSafe(self.extractor.extract(url)).catch_unwind().await {
            Ok(result) => {
                let outcome = ExtractionOutcome::from_result(result);
                if let Some(reason) = outcome.reason() {
                    warn!(url, error = reason, "Extraction failed, skipping result");
                }
                outcome
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(url, panic = %message, "Extractor panicked, skipping result");
                ExtractionOutcome::Failure(format!("extractor panicked: {message}"))
            }
        }
    }
}
