//! Configuration types for searching, fetching and extraction.
//!
//! Every field has a default, so a partial JSON document is a valid config.
//! Nothing here reads or writes process-wide state except [`SearchConfig::from_env`],
//! which only reads.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::retry::RetryPolicy;

/// Brave web search endpoint.
pub const BRAVE_SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Browser-like user agent sent with page fetches.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Converts a configured number of seconds into a `Duration`.
///
/// Negative, non-finite and out-of-range values are rejected.
pub fn seconds_to_duration(field: &str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds).map_err(|e| {
        ConfigError::invalid_value(field, format!("{seconds} is not a valid duration: {e}"))
    })
}

/// Like [`seconds_to_duration`], but zero is rejected too.
fn positive_duration(field: &str, seconds: f64) -> Result<Duration, ConfigError> {
    let duration = seconds_to_duration(field, seconds)?;
    if duration.is_zero() {
        return Err(ConfigError::invalid_value(field, "must be positive"));
    }
    Ok(duration)
}

/// Runtime conversion for computed delays, clamped into `Duration`'s range.
pub(crate) fn saturating_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "BRAVE_API_KEY";

/// Environment variable holding the user agent override.
pub const USER_AGENT_ENV: &str = "USER_AGENT";

/// Configuration for the search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Number of results to request from the provider.
    #[serde(default)]
    pub result_count: Option<u32>,
    /// Maximum number of normalized hits to keep.
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_endpoint() -> String {
    BRAVE_SEARCH_ENDPOINT.to_string()
}

fn default_timeout() -> f64 {
    15.0
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
            result_count: None,
            max_results: None,
        }
    }
}

impl ProviderConfig {
    /// Gets timeout as Duration.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        positive_duration("provider.timeout_seconds", self.timeout_seconds)
    }
}

/// Configuration for HTTP page fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_size")]
    pub max_response_bytes: usize,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Transport-level retry configuration.
    #[serde(default)]
    pub retry: TransportRetryConfig,
}

fn default_max_redirects() -> usize {
    10
}

fn default_max_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_redirects: default_max_redirects(),
            max_response_bytes: default_max_size(),
            headers: HashMap::new(),
            retry: TransportRetryConfig::default(),
        }
    }
}

impl FetchConfig {
    /// Creates a new fetch configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the transport retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: TransportRetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Gets timeout as Duration.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        positive_duration("fetch.timeout_seconds", self.timeout_seconds)
    }
}

/// Transport-level retry for a single GET.
///
/// Independent of the page-level [`RetryPolicy`]: this one only reissues the
/// request on connection failures and a fixed set of status codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRetryConfig {
    /// Maximum retries after the initial request.
    #[serde(default = "default_transport_retries")]
    pub max_retries: usize,
    /// Backoff base in seconds.
    #[serde(default = "default_transport_backoff")]
    pub backoff_seconds: f64,
    /// Maximum delay between retries.
    #[serde(default = "default_transport_max_delay")]
    pub max_delay_seconds: f64,
    /// Status codes that should trigger a retry.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
}

fn default_transport_retries() -> usize {
    3
}

fn default_transport_backoff() -> f64 {
    0.5
}

fn default_transport_max_delay() -> f64 {
    30.0
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for TransportRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_transport_retries(),
            backoff_seconds: default_transport_backoff(),
            max_delay_seconds: default_transport_max_delay(),
            retry_status_codes: default_retry_status_codes(),
        }
    }
}

impl TransportRetryConfig {
    /// Disables transport retries.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculates the delay before retry number `retry` (1-indexed).
    #[must_use]
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay = self.backoff_seconds * 2f64.powi(exponent);
        saturating_duration(delay.min(self.max_delay_seconds))
    }

    /// Caps a server-provided `Retry-After` delay.
    #[must_use]
    pub fn cap_delay(&self, delay: Duration) -> Duration {
        delay.min(saturating_duration(self.max_delay_seconds))
    }

    /// Checks that both delays are representable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        seconds_to_duration("fetch.retry.backoff_seconds", self.backoff_seconds)?;
        seconds_to_duration("fetch.retry.max_delay_seconds", self.max_delay_seconds)?;
        Ok(())
    }

    /// Whether a status code should trigger a retry.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_status_codes.contains(&status)
    }
}

/// Configuration for HTML text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Tag names whose whole subtree is dropped before extraction.
    #[serde(default = "default_ignore_tags")]
    pub ignore_tags: Vec<String>,
    /// CSS selector for paragraph-like blocks.
    #[serde(default = "default_paragraph_selector")]
    pub paragraph_selector: String,
    /// A paragraph is kept only if its text is longer than this.
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,
    /// Separator between kept paragraphs.
    #[serde(default = "default_paragraph_separator")]
    pub paragraph_separator: String,
    /// Separator between text fragments in the fallbacks.
    #[serde(default = "default_line_separator")]
    pub line_separator: String,
}

fn default_ignore_tags() -> Vec<String> {
    ["script", "style", "nav", "header", "footer"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_paragraph_selector() -> String {
    "p".to_string()
}

fn default_min_paragraph_chars() -> usize {
    30
}

fn default_paragraph_separator() -> String {
    "\n\n".to_string()
}

fn default_line_separator() -> String {
    "\n".to_string()
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ignore_tags: default_ignore_tags(),
            paragraph_selector: default_paragraph_selector(),
            min_paragraph_chars: default_min_paragraph_chars(),
            paragraph_separator: default_paragraph_separator(),
            line_separator: default_line_separator(),
        }
    }
}

impl ExtractionConfig {
    /// Creates a new extraction configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag to drop.
    #[must_use]
    pub fn with_ignore_tag(mut self, tag: impl Into<String>) -> Self {
        self.ignore_tags.push(tag.into());
        self
    }

    /// Sets the minimum paragraph length.
    #[must_use]
    pub fn with_min_paragraph_chars(mut self, chars: usize) -> Self {
        self.min_paragraph_chars = chars;
        self
    }
}

/// Combined configuration for a [`crate::WebSearch`] engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Provider credential. `None` runs the provider unauthenticated.
    #[serde(default, alias = "BRAVE_API_KEY")]
    pub api_key: Option<String>,
    /// User agent for page fetches.
    #[serde(default = "default_user_agent", alias = "USER_AGENT")]
    pub user_agent: String,
    /// Maximum concurrent page extractions.
    #[serde(default = "default_concurrent")]
    pub max_concurrent: usize,
    /// Provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Retry policy around each page fetch.
    #[serde(default = "default_page_retry")]
    pub page_retry: RetryPolicy,
    /// Retry policy around each provider call.
    #[serde(default = "default_search_retry")]
    pub search_retry: RetryPolicy,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_concurrent() -> usize {
    5
}

fn default_page_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(1), 2.0)
}

fn default_search_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_secs(1), 2.0)
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            user_agent: default_user_agent(),
            max_concurrent: default_concurrent(),
            provider: ProviderConfig::default(),
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            page_retry: default_page_retry(),
            search_retry: default_search_retry(),
        }
    }
}

impl SearchConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Builds a configuration from `BRAVE_API_KEY` and `USER_AGENT`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.api_key = Some(key);
        }
        if let Ok(agent) = std::env::var(USER_AGENT_ENV) {
            config.user_agent = agent;
        }
        config.normalized()
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self.normalized()
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the maximum concurrent extractions.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Sets the page-level retry policy.
    #[must_use]
    pub fn with_page_retry(mut self, policy: RetryPolicy) -> Self {
        self.page_retry = policy;
        self
    }

    /// Sets the search-call retry policy.
    #[must_use]
    pub fn with_search_retry(mut self, policy: RetryPolicy) -> Self {
        self.search_retry = policy;
        self
    }

    /// Sets the fetch configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Sets the extraction configuration.
    #[must_use]
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// The API key, if one is set and non-blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent < 1 {
            return Err(ConfigError::invalid_value("max_concurrent", "must be at least 1"));
        }
        self.provider.timeout()?;
        self.fetch.timeout()?;
        self.fetch.retry.validate()?;
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid_value("user_agent", "must not be blank"));
        }
        self.page_retry.validate()?;
        self.search_retry.validate()?;
        scraper::Selector::parse(&self.extraction.paragraph_selector).map_err(|e| {
            ConfigError::InvalidSelector {
                selector: self.extraction.paragraph_selector.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Blank API keys mean "no key".
    fn normalized(mut self) -> Self {
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout_seconds, 15.0);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(15));
    }

    #[test]
    fn test_timeouts_must_be_positive_and_representable() {
        for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e20] {
            assert!(FetchConfig::new().with_timeout(seconds).timeout().is_err(), "{seconds}");
        }
        let provider = ProviderConfig {
            timeout_seconds: 1e20,
            ..ProviderConfig::default()
        };
        assert!(matches!(
            provider.timeout(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "provider.timeout_seconds"
        ));
    }

    #[test]
    fn test_fetch_config_builder() {
        let config = FetchConfig::new()
            .with_timeout(60.0)
            .with_header("Accept-Language", "en");

        assert_eq!(config.timeout_seconds, 60.0);
        assert_eq!(config.headers.get("Accept-Language"), Some(&"en".to_string()));
    }

    #[test]
    fn test_transport_retry_delay() {
        let config = TransportRetryConfig::default();

        assert_eq!(config.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_retry(2), Duration::from_secs(1));
        assert_eq!(config.delay_for_retry(3), Duration::from_secs(2));
    }

    #[test]
    fn test_transport_retry_cap() {
        let config = TransportRetryConfig {
            max_delay_seconds: 5.0,
            ..Default::default()
        };

        assert_eq!(config.delay_for_retry(20), Duration::from_secs(5));
        assert_eq!(config.cap_delay(Duration::from_secs(120)), Duration::from_secs(5));
    }

    #[test]
    fn test_transport_retry_huge_delays_saturate() {
        let config = TransportRetryConfig {
            backoff_seconds: 1e20,
            max_delay_seconds: 1e20,
            ..Default::default()
        };

        assert_eq!(config.delay_for_retry(1), Duration::MAX);
        assert_eq!(config.cap_delay(Duration::from_secs(3)), Duration::from_secs(3));
        assert!(config.validate().is_err());
        assert!(TransportRetryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_transport_retry_status_codes() {
        let config = TransportRetryConfig::default();

        assert!(config.should_retry_status(429));
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(200));
        assert!(!config.should_retry_status(404));
    }

    #[test]
    fn test_extraction_config_defaults() {
        let config = ExtractionConfig::default();

        assert_eq!(
            config.ignore_tags,
            vec!["script", "style", "nav", "header", "footer"]
        );
        assert_eq!(config.min_paragraph_chars, 30);
        assert_eq!(config.paragraph_separator, "\n\n");
    }

    #[test]
    fn test_search_config_defaults() {
        let config = SearchConfig::default();

        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.api_key(), None);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.search_retry.max_attempts, 5);
        assert_eq!(config.page_retry.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_config_from_json_aliases() {
        let config = SearchConfig::from_json_str(
            r#"{"BRAVE_API_KEY": "key-123", "USER_AGENT": "agent/1.0", "max_concurrent": 2}"#,
        )
        .unwrap();

        assert_eq!(config.api_key(), Some("key-123"));
        assert_eq!(config.user_agent, "agent/1.0");
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.fetch, FetchConfig::default());
    }

    #[test]
    fn test_search_config_blank_key_is_none() {
        let config = SearchConfig::from_json_str(r#"{"api_key": "  "}"#).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_search_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_key": "file-key", "fetch": {{"timeout_seconds": 5.0}}}}"#).unwrap();

        let config = SearchConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.api_key(), Some("file-key"));
        assert_eq!(config.fetch.timeout_seconds, 5.0);
        assert_eq!(config.fetch.max_redirects, 10);
    }

    #[test]
    fn test_search_config_missing_file() {
        let result = SearchConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_search_config_invalid_json() {
        let result = SearchConfig::from_json_str("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = SearchConfig::default().with_max_concurrent(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "max_concurrent"
        ));
    }

    #[test]
    fn test_validate_rejects_unrepresentable_durations() {
        let documents = [
            r#"{"fetch": {"timeout_seconds": 1e20}}"#,
            r#"{"provider": {"timeout_seconds": 1e20}}"#,
            r#"{"fetch": {"retry": {"max_delay_seconds": 1e20}}}"#,
            r#"{"fetch": {"retry": {"backoff_seconds": -1.0}}}"#,
            r#"{"page_retry": {"max_delay_seconds": 1e20}}"#,
            r#"{"search_retry": {"initial_delay_seconds": 1e20, "max_delay_seconds": 1e20}}"#,
        ];
        for json in documents {
            let config = SearchConfig::from_json_str(json).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_selector() {
        let extraction = ExtractionConfig {
            paragraph_selector: "p[[".to_string(),
            ..Default::default()
        };
        let config = SearchConfig::default().with_extraction(extraction);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }
}
