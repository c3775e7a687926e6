//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls the response cache, the enrichment pipeline and
//! provider endpoints. It deserializes from any serde format with every
//! field optional, so hosts can embed it in their own config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Configuration for the query pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Response cache settings.
    pub cache: CacheConfig,
    /// Background enrichment settings.
    pub enrichment: EnrichmentConfig,
    /// Upstream provider endpoints and credentials.
    pub providers: ProvidersConfig,
    /// User-Agent sent on every outbound request.
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            enrichment: EnrichmentConfig::default(),
            providers: ProvidersConfig::default(),
            user_agent: concat!("codeseek/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a computed response stays cached, in minutes.
    pub search_ttl_minutes: u64,
    /// Upper bound on cached responses held in memory.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_ttl_minutes: 10,
            max_entries: 1_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.search_ttl_minutes.saturating_mul(60))
    }
}

/// Background enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Master switch. When off, `enqueue` is a no-op.
    pub enabled: bool,
    /// How many of the best ranked results are enriched per search.
    pub top_n: usize,
    /// Process-wide cap on simultaneous enrichment fetches.
    pub max_concurrent_fetches: usize,
    /// Cap on simultaneous enrichment fetches against one host.
    pub per_host_limit: usize,
    /// Time budget for each individual detail fetch.
    pub fetch_timeout_millis: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top_n: 5,
            max_concurrent_fetches: 20,
            per_host_limit: 5,
            fetch_timeout_millis: 4_000,
        }
    }
}

impl EnrichmentConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_millis)
    }
}

/// Provider endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub stackoverflow: StackOverflowConfig,
}

/// Stack Exchange API settings for the Stack Overflow provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackOverflowConfig {
    /// API root, without the version segment.
    pub base_url: String,
    /// Optional application key. Empty means unauthenticated.
    pub api_key: String,
    /// Stack Exchange site parameter.
    pub site: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for StackOverflowConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stackexchange.com".to_owned(),
            api_key: String::new(),
            site: "stackoverflow".to_owned(),
            timeout_seconds: 10,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `cache.search_ttl_minutes` and `cache.max_entries` must be greater than 0
    /// - `enrichment.top_n`, `max_concurrent_fetches`, `per_host_limit` and
    ///   `fetch_timeout_millis` must be greater than 0
    /// - `providers.stackoverflow.base_url` must not be empty
    /// - `providers.stackoverflow.timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cache.search_ttl_minutes == 0 {
            return Err(SearchError::Config(
                "cache.search_ttl_minutes must be greater than 0".into(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(SearchError::Config(
                "cache.max_entries must be greater than 0".into(),
            ));
        }
        let enrichment = &self.enrichment;
        if enrichment.top_n == 0 {
            return Err(SearchError::Config(
                "enrichment.top_n must be greater than 0".into(),
            ));
        }
        if enrichment.max_concurrent_fetches == 0 {
            return Err(SearchError::Config(
                "enrichment.max_concurrent_fetches must be greater than 0".into(),
            ));
        }
        if enrichment.per_host_limit == 0 {
            return Err(SearchError::Config(
                "enrichment.per_host_limit must be greater than 0".into(),
            ));
        }
        if enrichment.fetch_timeout_millis == 0 {
            return Err(SearchError::Config(
                "enrichment.fetch_timeout_millis must be greater than 0".into(),
            ));
        }
        let so = &self.providers.stackoverflow;
        if so.base_url.trim().is_empty() {
            return Err(SearchError::Config(
                "providers.stackoverflow.base_url must not be empty".into(),
            ));
        }
        if so.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "providers.stackoverflow.timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert_eq!(config.cache.search_ttl_minutes, 10);
        assert!(config.enrichment.enabled);
        assert_eq!(config.enrichment.top_n, 5);
        assert_eq!(config.enrichment.max_concurrent_fetches, 20);
        assert_eq!(config.enrichment.per_host_limit, 5);
        assert_eq!(config.enrichment.fetch_timeout_millis, 4_000);
        assert_eq!(
            config.providers.stackoverflow.base_url,
            "https://api.stackexchange.com"
        );
        assert!(config.providers.stackoverflow.api_key.is_empty());
        assert!(config.user_agent.starts_with("codeseek/"));
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn durations_derive_from_fields() {
        let config = SearchConfig::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(600));
        assert_eq!(
            config.enrichment.fetch_timeout(),
            Duration::from_millis(4_000)
        );
    }

    #[test]
    fn zero_top_n_rejected() {
        let mut config = SearchConfig::default();
        config.enrichment.top_n = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn zero_per_host_limit_rejected() {
        let mut config = SearchConfig::default();
        config.enrichment.per_host_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("per_host_limit"));
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut config = SearchConfig::default();
        config.cache.search_ttl_minutes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search_ttl_minutes"));
    }

    #[test]
    fn blank_base_url_rejected() {
        let mut config = SearchConfig::default();
        config.providers.stackoverflow.base_url = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"enrichment": {"top_n": 2}}"#).expect("deserialize");
        assert_eq!(config.enrichment.top_n, 2);
        assert_eq!(config.enrichment.per_host_limit, 5);
        assert_eq!(config.cache.search_ttl_minutes, 10);
    }
}
