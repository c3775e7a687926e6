//! Error types for the codeseek-search crate.
//!
//! These errors stay inside the pipeline: provider, enrichment, cache and
//! store faults are logged and absorbed before a response is returned.
//! No API keys appear in error messages.

/// Errors that can occur inside the query pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider or detail request exceeded its time budget.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Failed to parse a provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Document store or query log failure.
    #[error("store error: {0}")]
    Store(String),

    /// Cached payload could not be encoded or decoded.
    #[error("cache error: {0}")]
    Cache(#[from] serde_json::Error),
}

/// Convenience type alias for codeseek-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_http() {
        let err = SearchError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("question detail after 4000ms".into());
        assert_eq!(
            err.to_string(),
            "request timed out: question detail after 4000ms"
        );
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("top_n must be > 0".into());
        assert_eq!(err.to_string(), "config error: top_n must be > 0");
    }

    #[test]
    fn cache_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: SearchError = serde_err.into();
        assert!(err.to_string().starts_with("cache error:"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
