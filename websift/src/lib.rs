//! # Websift
//!
//! Web search with page content.
//!
//! Websift queries a search provider, fetches every hit's page and pulls the
//! readable text out of it:
//!
//! - **Search**: provider call with exponential backoff and response validation
//! - **Fetch**: bounded-concurrency page downloads with transport and page retries
//! - **Extraction**: paragraph text with body and document fallbacks
//! - **Aggregation**: per-item failure isolation, input order preserved
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use websift::prelude::*;
//!
//! let config = SearchConfig::from_env().with_max_concurrent(8);
//! let results = websift::search("rust async runtimes", Some(config)).await;
//!
//! for result in results {
//!     println!("{}: {}", result.title, result.url);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod protocols;
pub mod retry;
pub mod search;
pub mod testing;

pub use pipeline::{search, WebSearch};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        ExtractionConfig, FetchConfig, ProviderConfig, SearchConfig, TransportRetryConfig,
    };
    pub use crate::errors::{ConfigError, ExtractError, FetchError, SearchError, WebsiftError};
    pub use crate::extract::{HtmlExtractor, WebContentExtractor};
    pub use crate::fetch::HttpFetcher;
    pub use crate::models::{EnrichedResult, SearchHit};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{AggregationReport, ProcessStats, ResultAggregator, WebSearch};
    pub use crate::protocols::{ContentExtractor, FetchResult, Fetcher, SearchEngine, SearchProvider};
    pub use crate::retry::{with_retry, with_retry_if, RetryPolicy};
    pub use crate::search::{BraveSearchProvider, SearchClient};
}
