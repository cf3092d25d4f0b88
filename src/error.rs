//! Error types for the pricegear application.

/// Top-level error type for the application crate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file or environment error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Aggregation error from the scraping library.
    #[error(transparent)]
    Scrape(#[from] pricegear_scrape::ScrapeError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_errors_keep_their_message() {
        let err = AppError::from(pricegear_scrape::ScrapeError::InvalidQuery(
            "search term is empty".into(),
        ));
        assert_eq!(
            err.to_string(),
            pricegear_scrape::ScrapeError::InvalidQuery("search term is empty".into()).to_string()
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
