//! Error types for the pricegear-scrape crate.
//!
//! Adapter-local failures (`Http`, `Parse`, `Render`, `Timeout`) are always
//! recovered by the runner into an empty source group; they never reach the
//! caller of an aggregate query. The caller-visible failures are
//! [`ScrapeError::AdmissionDenied`], [`ScrapeError::InvalidQuery`] and
//! [`ScrapeError::Config`].

use crate::admission::OperationClass;

/// Errors that can occur while scraping or aggregating storefront prices.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// A request to a storefront failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Storefront markup could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The browser session or one of its contexts failed.
    #[error("render error: {0}")]
    Render(String),

    /// An operation exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The search term is empty after normalisation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The caller's quota for this operation class is exhausted.
    #[error("admission denied for {operation}: retry after {retry_after_secs}s")]
    AdmissionDenied {
        /// The operation class whose quota was exhausted.
        operation: OperationClass,
        /// Seconds until the oldest admission leaves the rolling window.
        retry_after_secs: u64,
    },
}

/// Convenience type alias for pricegear-scrape results.
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_http() {
        let err = ScrapeError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_render() {
        let err = ScrapeError::Render("browser session is shut down".into());
        assert_eq!(err.to_string(), "render error: browser session is shut down");
    }

    #[test]
    fn display_admission_denied() {
        let err = ScrapeError::AdmissionDenied {
            operation: OperationClass::Aggregate,
            retry_after_secs: 42,
        };
        assert_eq!(
            err.to_string(),
            "admission denied for aggregate: retry after 42s"
        );
    }

    #[test]
    fn display_invalid_query() {
        let err = ScrapeError::InvalidQuery("search term is empty".into());
        assert_eq!(err.to_string(), "invalid query: search term is empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScrapeError>();
    }
}
