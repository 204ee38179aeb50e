//! HTTP search client for Bing and DuckDuckGo

mod backend;
mod retry;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::{debug, info};

use crate::debug::DebugStore;
use crate::error::SearchError;
use crate::models::SearchResponse;
use crate::traits::SearchClient;

pub use backend::SearchBackend;
use retry::retry_with_backoff;

/// Desktop Chrome user agent, search engines serve degraded markup to unknown clients
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub struct HttpSearchClient {
    client: Client,
    backend: SearchBackend,
    base_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
    debug: Option<DebugStore>,
}

impl HttpSearchClient {
    /// Creates a client for `backend` against its public endpoint
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the underlying `reqwest::Client` cannot be built.
    pub fn new(
        backend: SearchBackend,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            backend,
            base_url: backend.default_base_url().to_string(),
            max_retries,
            backoff_base_secs: 1,
            debug: None,
        })
    }

    /// Points the client at another host, used against mock servers
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_backoff_base_secs(mut self, secs: u64) -> Self {
        self.backoff_base_secs = secs;
        self
    }

    #[must_use]
    pub fn with_debug_store(mut self, store: Option<DebugStore>) -> Self {
        self.debug = store;
        self
    }

    async fn get(&self, url: &str, accept: &str) -> Result<SearchResponse, SearchError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, accept)
                .header(header::ACCEPT_LANGUAGE, "en-GB,en;q=0.9")
                .header(header::CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);

                return Err(SearchError::RateLimited {
                    domain: response.url().host_str().unwrap_or_default().to_string(),
                    retry_after_secs,
                });
            }

            if !status.is_success() {
                return Err(SearchError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let raw_body = response.text().await?;
            Ok(SearchResponse {
                status_code: status.as_u16(),
                raw_body,
            })
        })
        .await
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    fn backend(&self) -> SearchBackend {
        self.backend
    }

    async fn search(&self, query: &str, page: u32) -> Result<SearchResponse, SearchError> {
        let url = self.backend.endpoint(&self.base_url, query, page);
        info!("Searching {} for: {} (page {})", self.backend, query, page);

        let response = self.get(&url, self.backend.accept_header()).await?;
        debug!(
            "{} returned {} bytes with status {}",
            self.backend,
            response.raw_body.len(),
            response.status_code
        );

        if let Some(store) = &self.debug {
            store.save_snapshot(query, page, &response.raw_body).await;
        }

        Ok(response)
    }

    async fn fetch_page(&self, url: &str) -> Result<SearchResponse, SearchError> {
        debug!("Fetching product page {}", url);
        let response = self
            .get(url, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .await?;

        if let Some(store) = &self.debug {
            store.save_snapshot(url, 0, &response.raw_body).await;
        }

        Ok(response)
    }
}
