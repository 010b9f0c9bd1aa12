//! Data models for search hits and enriched results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::ExtractError;

/// Title used when the provider gives none.
pub const UNTITLED: &str = "Untitled";

/// A normalized search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title.
    pub title: String,
    /// Absolute http(s) URL of the result.
    pub url: String,
    /// Provider snippet.
    #[serde(default)]
    pub description: String,
}

impl SearchHit {
    /// Creates a new hit.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        }
    }

    /// Attaches extracted content, producing an enriched result.
    #[must_use]
    pub fn enrich(self, content: impl Into<String>) -> EnrichedResult {
        EnrichedResult {
            title: self.title,
            url: self.url,
            description: self.description,
            content: content.into(),
        }
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("title".to_string(), serde_json::json!(self.title));
        dict.insert("url".to_string(), serde_json::json!(self.url));
        dict.insert("description".to_string(), serde_json::json!(self.description));
        dict
    }
}

/// A search hit with its extracted page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedResult {
    /// Result title.
    pub title: String,
    /// Absolute http(s) URL of the result.
    pub url: String,
    /// Provider snippet.
    #[serde(default)]
    pub description: String,
    /// Extracted readable text. Never empty.
    pub content: String,
}

impl EnrichedResult {
    /// Number of whitespace-separated words in the content.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Converts to dictionary.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut dict = HashMap::new();
        dict.insert("title".to_string(), serde_json::json!(self.title));
        dict.insert("url".to_string(), serde_json::json!(self.url));
        dict.insert("description".to_string(), serde_json::json!(self.description));
        dict.insert("content".to_string(), serde_json::json!(self.content));
        dict
    }
}

/// Result of extracting one hit, resolved to keep or discard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Non-empty content was extracted.
    Success(String),
    /// Extraction failed or produced nothing usable.
    Failure(String),
}

impl ExtractionOutcome {
    /// Resolves an extractor result. Empty content counts as a failure.
    #[must_use]
    pub fn from_result(result: Result<String, ExtractError>) -> Self {
        match result {
            Ok(content) if content.trim().is_empty() => {
                Self::Failure("no usable content".to_string())
            }
            Ok(content) => Self::Success(content),
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    /// Whether the item should be kept.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(reason) => Some(reason),
        }
    }

    /// Consumes the outcome, returning content when it succeeded.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Success(content) => Some(content),
            Self::Failure(_) => None,
        }
    }
}
