use thiserror::Error;

/// Transport-level failures from the search engine or a product page.
///
/// None of these abort a run: the collector treats each one as an empty page.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
}

impl SearchError {
    /// Server-side and throttling failures are worth another attempt; 4xx are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } => true,
            Self::UnexpectedStatus { status, .. } => *status >= 500,
        }
    }
}
