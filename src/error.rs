//! Error types for the codeseek host.

/// Top-level error type for host wiring and configuration.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file could not be parsed or serialized.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search core rejected its configuration or failed to start.
    #[error("search error: {0}")]
    Search(#[from] codeseek_search::SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = AppError::Config("bad level".into());
        assert_eq!(err.to_string(), "config error: bad level");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }

    #[test]
    fn search_error_converts() {
        let err: AppError = codeseek_search::SearchError::Config("top_n".into()).into();
        assert_eq!(err.to_string(), "search error: config error: top_n");
    }
}
