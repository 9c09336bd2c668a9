use thiserror::Error;

/// Failure classes for a scrape run.
///
/// Guarded absences (a missing optional element) never surface here;
/// they become `None` fields or empty sequences in the extractor
/// output. An error always aborts the whole run: there is no partial
/// JSON output.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network-level failure, including non-2xx statuses.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The page structure violates a hard assumption of its parser.
    #[error("malformed {page} page for title {title}: {reason}")]
    MalformedPage {
        page: &'static str,
        title: String,
        reason: String,
    },

    #[error("invalid selector: {0}")]
    Selector(String),
}

impl ScrapeError {
    pub fn malformed(page: &'static str, title: &str, reason: impl Into<String>) -> Self {
        ScrapeError::MalformedPage {
            page,
            title: title.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a CSS selector, mapping the borrow-laden scraper error into
/// our own error type.
pub fn selector(css: &'static str) -> Result<scraper::Selector, ScrapeError> {
    scraper::Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
}
