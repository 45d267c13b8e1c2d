//! Error types for the recommendation engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a recommendation request
#[derive(Error, Debug)]
pub enum Error {
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream service failure: {0}")]
    Upstream(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error is fatal for the whole request, as opposed to one
    /// that an agent recovers from locally with a fallback result.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Catalog(_) | Error::Internal(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProductNotFound(42);
        assert!(err.to_string().contains("42"));

        let err = Error::InvalidInput("top_n must be between 1 and 5".to_string());
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn test_fatality() {
        assert!(Error::Catalog("connection refused".into()).is_fatal());
        assert!(!Error::Timeout("review analyzer".into()).is_fatal());
        assert!(!Error::Upstream("llm 503".into()).is_fatal());
    }
}
