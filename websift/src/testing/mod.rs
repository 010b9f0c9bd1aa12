//! Testing utilities for websift pipelines.
//!
//! This module provides:
//! - Scripted providers, fetchers and extractors
//! - Fixtures for provider responses, pages and hits

mod fixtures;
mod mocks;

pub use fixtures::{brave_response, html_page, sample_hits};
pub use mocks::{ScriptedExtractor, ScriptedSearchProvider, StaticFetcher};
