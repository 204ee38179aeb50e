//! Strategy seams for the collection pipeline

use async_trait::async_trait;
use tracing::warn;

use crate::error::SearchError;
use crate::models::{Candidate, SearchResponse};
use crate::search::SearchBackend;

/// Trait for anything that can answer search queries and fetch product pages
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// The backend whose markup this client returns
    fn backend(&self) -> SearchBackend;

    /// Fetch one zero-based result page for `query`
    ///
    /// # Returns
    /// * `Result<SearchResponse, SearchError>` - Raw body or transport failure
    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, SearchError>;

    /// Fetch an arbitrary product page
    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, SearchError>;

    /// Like [`SearchClient::search`], but a failure is logged and reported as no results
    async fn search_or_empty(&self, query: &str, page: u32) -> Option<SearchResponse> {
        match self.search(query, page).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("No results for '{}' page {}: {}", query, page, e);
                None
            }
        }
    }

    /// Like [`SearchClient::fetch_page`], but a failure is logged and reported as `None`
    async fn fetch_page_or_none(&self, url: &str) -> Option<SearchResponse> {
        match self.fetch_page(url).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Could not fetch product page {}: {}", url, e);
                None
            }
        }
    }
}

/// Trait for deciding whether a candidate belongs in the gallery
pub trait RelevanceFilter: Send + Sync {
    /// Map a product URL to a retailer key, or `None` if it should be dropped
    fn classify(&self, product_url: &str) -> Option<String>;

    /// Classify and gate a candidate
    ///
    /// # Arguments
    /// * `candidate` - The parsed pair
    /// * `evidence` - Result snippet and product page text, whichever is available
    ///
    /// # Returns
    /// * `Option<Candidate>` - The candidate with `retailer` set, or `None` to discard
    fn evaluate(&self, candidate: Candidate, evidence: Option<&str>) -> Option<Candidate>;
}
