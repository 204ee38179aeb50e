use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::GalleryConfig;
use crate::debug::DebugStore;
use crate::dedupe::{DedupeOptions, Deduplicator, StyleKeyTable};
use crate::filter::build_filter;
use crate::models::{Candidate, OutputItem};
use crate::output::{OutputWriter, WriteOutcome};
use crate::parser::{PageEvidence, ParsedResult, parse_product_page, parse_response};
use crate::query::generate_queries;
use crate::search::HttpSearchClient;
use crate::traits::{RelevanceFilter, SearchClient};

/// Counters for one collection run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub queries: usize,
    pub search_requests: usize,
    pub failed_requests: usize,
    pub pages_fetched: usize,
    pub parsed: usize,
    pub kept: usize,
    pub items: usize,
    pub outcome: Option<WriteOutcome>,
}

/// Per-run mutable state threaded through collection
#[derive(Default)]
struct RunState {
    summary: RunSummary,
    requests_made: usize,
    fetched_pages: HashSet<String>,
}

pub struct GalleryFinder {
    config: GalleryConfig,
    client: Box<dyn SearchClient>,
    filter: Box<dyn RelevanceFilter>,
    styles: Arc<StyleKeyTable>,
    writer: OutputWriter,
}

impl GalleryFinder {
    /// Builds the finder with the HTTP client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: GalleryConfig, debug: Option<DebugStore>) -> Result<Self> {
        let client = HttpSearchClient::new(config.backend, config.timeout_secs, config.max_retries)?
            .with_debug_store(debug);
        Ok(Self::with_client(config, Box::new(client)))
    }

    pub fn with_client(config: GalleryConfig, client: Box<dyn SearchClient>) -> Self {
        let styles = Arc::new(StyleKeyTable::from_rules(&config.retailers));
        let filter = build_filter(&config, Arc::clone(&styles));
        let writer = OutputWriter::new(config.output_path.clone(), config.min_items);

        Self {
            config,
            client,
            filter,
            styles,
            writer,
        }
    }

    /// Collects, dedupes and writes. Only output file errors are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be written.
    pub async fn run(&self) -> Result<RunSummary> {
        info!(
            "Starting gallery run for '{}' via {}",
            self.config.brand,
            self.client.backend()
        );

        let (candidates, mut summary) = self.collect().await;
        let items = self.dedupe(candidates);
        summary.items = items.len();

        if items.is_empty() {
            warn!("No gallery items found for '{}' this run", self.config.brand);
        }

        let outcome = self.writer.write(&items).await?;
        summary.outcome = Some(outcome);

        info!(
            "Run complete: {} queries, {} search requests ({} failed), {} pages fetched, {} parsed, {} kept, {} items, {:?}",
            summary.queries,
            summary.search_requests,
            summary.failed_requests,
            summary.pages_fetched,
            summary.parsed,
            summary.kept,
            summary.items,
            outcome
        );

        Ok(summary)
    }

    /// Issues every query page in sequence and returns the relevant candidates.
    ///
    /// Failed pages count as empty; a page with no parsable results ends that query.
    pub async fn collect(&self) -> (Vec<Candidate>, RunSummary) {
        let queries = generate_queries(&self.config);
        let format = self.client.backend().format();
        let mut state = RunState::default();
        state.summary.queries = queries.len();

        let mut candidates = Vec::new();

        for query in &queries {
            for page in 0..self.config.pages_per_query {
                self.pause(&mut state).await;
                state.summary.search_requests += 1;

                let Some(response) = self.client.search_or_empty(query, page).await else {
                    state.summary.failed_requests += 1;
                    continue;
                };

                let results = parse_response(format, &response.raw_body);
                debug!("'{}' page {}: {} results", query, page, results.len());
                if results.is_empty() {
                    break;
                }
                state.summary.parsed += results.len();

                for result in results {
                    if let Some(candidate) = self.resolve(result, &mut state).await {
                        candidates.push(candidate);
                    }
                }
            }
        }

        state.summary.kept = candidates.len();
        info!(
            "Collected {} relevant candidates from {} queries",
            candidates.len(),
            queries.len()
        );

        (candidates, state.summary)
    }

    pub fn dedupe(&self, candidates: Vec<Candidate>) -> Vec<OutputItem> {
        let options = DedupeOptions {
            strip_image_query: self.config.strip_image_query,
            max_items: self.config.max_items,
            per_retailer_cap: self.config.per_retailer_cap,
            sort_before_cap: self.config.sort_before_cap,
        };
        Deduplicator::new(&self.styles, options).dedupe(candidates)
    }

    /// Turns a parsed result into a relevant candidate, fetching the product page
    /// when the result has no image or its snippet is not enough to pass the gates.
    async fn resolve(&self, result: ParsedResult, state: &mut RunState) -> Option<Candidate> {
        let ParsedResult {
            product_url,
            image_url,
            snippet,
        } = result;

        if let Some(image_url) = image_url.filter(|u| !u.is_empty()) {
            let candidate = Candidate::new(product_url, image_url);
            if let Some(kept) = self.filter.evaluate(candidate.clone(), snippet.as_deref()) {
                return Some(kept);
            }
            if !self.config.fetch_pages || self.filter.classify(&candidate.product_url).is_none() {
                return None;
            }

            let evidence = self.fetch_evidence(&candidate.product_url, state).await?;
            let text = combined_evidence(snippet.as_deref(), &evidence);
            return self.filter.evaluate(candidate, Some(&text));
        }

        if !self.config.fetch_pages {
            return None;
        }
        self.filter.classify(&product_url)?;

        let evidence = self.fetch_evidence(&product_url, state).await?;
        let Some(image_url) = evidence.image_url.clone() else {
            debug!("No image on product page {}", product_url);
            return None;
        };
        let text = combined_evidence(snippet.as_deref(), &evidence);
        self.filter
            .evaluate(Candidate::new(product_url, image_url), Some(&text))
    }

    async fn fetch_evidence(
        &self,
        product_url: &str,
        state: &mut RunState,
    ) -> Option<PageEvidence> {
        if !state.fetched_pages.insert(product_url.to_string()) {
            return None;
        }

        self.pause(state).await;
        state.summary.pages_fetched += 1;

        let response = self.client.fetch_page_or_none(product_url).await?;
        Some(parse_product_page(product_url, &response.raw_body))
    }

    /// Fixed delay between requests, skipped before the first one
    async fn pause(&self, state: &mut RunState) {
        if state.requests_made > 0 && !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
        state.requests_made += 1;
    }
}

fn combined_evidence(snippet: Option<&str>, page: &PageEvidence) -> String {
    match snippet {
        Some(snippet) => format!("{snippet} {}", page.text),
        None => page.text.clone(),
    }
}
