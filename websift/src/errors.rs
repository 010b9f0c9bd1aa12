//! Error types for websift.
//!
//! Each layer of the pipeline has its own error type. Failures are absorbed as
//! low in the stack as possible; only the search-call layer and the top-level
//! engine ever see a [`WebsiftError`].

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for websift operations.
#[derive(Debug, Error)]
pub enum WebsiftError {
    /// The search provider call failed.
    #[error("{0}")]
    Search(#[from] SearchError),

    /// A page fetch failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Content extraction failed.
    #[error("{0}")]
    Extract(#[from] ExtractError),

    /// Configuration is invalid or could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors returned by a search provider.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// Transport-level failure talking to the provider.
    #[error("Search request failed: {message}")]
    Http {
        /// Error message.
        message: String,
    },

    /// The provider did not answer in time.
    #[error("Search timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The provider rate limited the request.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The provider answered with a non-success status.
    #[error("Search API error: {status} - {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The response body was not valid JSON.
    #[error("Search response could not be decoded: {message}")]
    Decode {
        /// Decoder message.
        message: String,
    },

    /// The HTTP client could not be built.
    #[error("Search client error: {message}")]
    Client {
        /// Error message.
        message: String,
    },
}

impl SearchError {
    /// Creates a transport error.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Errors that can occur while fetching a page.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The URL is not an absolute http(s) URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The request timed out.
    #[error("Timeout fetching: {url}")]
    Timeout {
        /// The URL being fetched.
        url: String,
    },

    /// The connection could not be established.
    #[error("Connection error for {url}: {message}")]
    Connect {
        /// The URL being fetched.
        url: String,
        /// Error message.
        message: String,
    },

    /// Any other request-level failure.
    #[error("Request error for {url}: {message}")]
    Request {
        /// The URL being fetched.
        url: String,
        /// Error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for: {url}")]
    Status {
        /// The URL being fetched.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be read.
    #[error("Failed reading body of {url}: {message}")]
    Body {
        /// The URL being fetched.
        url: String,
        /// Error message.
        message: String,
    },

    /// The response body exceeded the configured limit.
    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// The URL being fetched.
        url: String,
        /// The configured limit in bytes.
        limit: usize,
    },

    /// The HTTP client could not be built.
    #[error("Fetch client error: {message}")]
    Client {
        /// Error message.
        message: String,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a status error.
    #[must_use]
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Returns the URL involved, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::TooLarge { url, .. } => Some(url),
            Self::Client { .. } => None,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Timeouts, connection and request failures, 429 and 5xx statuses are
    /// transient. Invalid URLs, other 4xx statuses and oversized bodies are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } | Self::Request { .. } | Self::Body { .. } => {
                true
            }
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::InvalidUrl { .. } | Self::TooLarge { .. } | Self::Client { .. } => false,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        let kind = match self {
            Self::InvalidUrl { .. } => "InvalidUrl",
            Self::Timeout { .. } => "Timeout",
            Self::Connect { .. } => "Connect",
            Self::Request { .. } => "Request",
            Self::Status { .. } => "Status",
            Self::Body { .. } => "Body",
            Self::TooLarge { .. } => "TooLarge",
            Self::Client { .. } => "Client",
        };
        map.insert("type".to_string(), serde_json::json!(kind));

        if let Some(url) = self.url() {
            map.insert("url".to_string(), serde_json::json!(url));
        }
        if let Self::Status { status, .. } = self {
            map.insert("status".to_string(), serde_json::json!(status));
        }
        map.insert("transient".to_string(), serde_json::json!(self.is_transient()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors produced by a content extractor.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The page could not be fetched.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// The page was fetched but yielded no usable text.
    #[error("No content extracted from: {url}")]
    NoContent {
        /// The URL that was extracted.
        url: String,
    },

    /// The parsing task was cancelled before it finished.
    #[error("Content parsing for {url} did not finish: {message}")]
    Parse {
        /// The URL that was extracted.
        url: String,
        /// Error message.
        message: String,
    },
}

impl ExtractError {
    /// Creates a no-content error.
    #[must_use]
    pub fn no_content(url: impl Into<String>) -> Self {
        Self::NoContent { url: url.into() }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds an out-of-range value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A CSS selector failed to parse.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// The selector text.
        selector: String,
        /// Parser message.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
