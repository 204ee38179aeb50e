//! Run configuration: built-in defaults with environment overrides.
//!
//! Every component receives a `&GalleryConfig` instead of reading globals, so the
//! pipeline runs against fixtures in tests.
//!
//! ## Environment Variables
//!
//! All optional; `.env` is loaded through `dotenvy`. Invalid values are logged and
//! the default kept.
//!
//! - `GALLERY_BRAND`: brand name to search for
//! - `GALLERY_BACKEND`: `bing-rss`, `bing-images` or `duckduckgo`
//! - `GALLERY_MAX_ITEMS`: output cap
//! - `GALLERY_PER_RETAILER_CAP`: per-retailer cap, `0` disables
//! - `GALLERY_PAGES`: result pages fetched per query
//! - `GALLERY_REQUEST_DELAY_MS`: pause between requests
//! - `GALLERY_UNKNOWN_DOMAINS`: `drop` or `other`
//! - `GALLERY_OUTPUT`: output JSON path
//! - `GALLERY_DEBUG_DIR`: debug directory, empty disables
//! - `GALLERY_MIN_ITEMS`: overwrite guard threshold
//! - `GALLERY_FETCH_PAGES`: fetch product pages for images and evidence

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::models::RetailerRule;
use crate::search::SearchBackend;

/// What to do with result URLs that match no retailer rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownDomainPolicy {
    Drop,
    /// Keep under the `other` key, behind the keyword gate
    Other,
}

impl FromStr for UnknownDomainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown domain policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    pub brand: String,
    /// Extra spellings accepted by the brand gate
    pub brand_aliases: Vec<String>,
    pub apparel_keywords: Vec<String>,
    /// Domains that get their own `site:` queries
    pub target_domains: Vec<String>,
    /// Also emit `"brand" keyword site:domain` queries
    pub combine_site_and_keywords: bool,
    pub retailers: Vec<RetailerRule>,
    pub backend: SearchBackend,
    pub pages_per_query: u32,
    pub request_delay: Duration,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub fetch_pages: bool,
    pub unknown_domains: UnknownDomainPolicy,
    pub require_product_page: bool,
    pub strip_image_query: bool,
    pub max_items: usize,
    pub per_retailer_cap: Option<usize>,
    pub sort_before_cap: bool,
    pub output_path: PathBuf,
    pub debug_dir: Option<PathBuf>,
    /// Results below this count never replace a larger existing file
    pub min_items: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            brand: "Boden".to_string(),
            brand_aliases: Vec::new(),
            apparel_keywords: [
                "dress",
                "jumper",
                "cardigan",
                "coat",
                "jacket",
                "shirt",
                "blouse",
                "skirt",
                "trousers",
                "jeans",
                "jumpsuit",
                "knitwear",
            ]
            .iter()
            .map(|k| (*k).to_string())
            .collect(),
            target_domains: [
                "next.co.uk",
                "johnlewis.com",
                "asos.com",
                "marksandspencer.com",
                "very.co.uk",
                "zalando.co.uk",
            ]
            .iter()
            .map(|d| (*d).to_string())
            .collect(),
            combine_site_and_keywords: false,
            retailers: default_retailers(),
            backend: SearchBackend::BingRss,
            pages_per_query: 2,
            request_delay: Duration::from_millis(1500),
            timeout_secs: 20,
            max_retries: 2,
            fetch_pages: false,
            unknown_domains: UnknownDomainPolicy::Drop,
            require_product_page: false,
            strip_image_query: true,
            max_items: 60,
            per_retailer_cap: Some(20),
            sort_before_cap: true,
            output_path: PathBuf::from("data/products.json"),
            debug_dir: Some(PathBuf::from("debug")),
            min_items: 1,
        }
    }
}

/// Retailer table: key, host substrings and the product-id pattern over `path?query`
pub fn default_retailers() -> Vec<RetailerRule> {
    vec![
        RetailerRule::new("next", &["next.co.uk", "next.com"])
            .with_id_pattern(r"(?i)/style/([a-z0-9]+)"),
        RetailerRule::new("johnlewis", &["johnlewis.com"]).with_id_pattern(r"(?i)/p(\d{5,})(?:$|[/?])"),
        RetailerRule::new("asos", &["asos.com"]).with_id_pattern(r"(?i)/prd/(\d+)"),
        RetailerRule::new("marksandspencer", &["marksandspencer.com"])
            .with_id_pattern(r"(?i)/p/([a-z0-9]+)"),
        RetailerRule::new("very", &["very.co.uk"]).with_id_pattern(r"(?i)/(\d{6,})\.prd"),
        RetailerRule::new("zalando", &["zalando."])
            .with_id_pattern(r"(?i)-([a-z0-9]{9}-[a-z0-9]{3})\.html"),
        RetailerRule::new("boden", &["boden.co.uk", "boden.com"])
            .with_id_pattern(r"(?i)/([a-z]\d{4,}[a-z0-9]*)(?:$|[/?#])"),
        RetailerRule::new("amazon", &["amazon.co.uk", "amazon.com"])
            .with_id_pattern(r"/(?:dp|gp/product)/([A-Z0-9]{10})")
            .noisy(),
        RetailerRule::new("ebay", &["ebay.co.uk", "ebay.com"])
            .with_id_pattern(r"/itm/(?:[^/]+/)?(\d{9,})")
            .noisy(),
        RetailerRule::new("pinterest", &["pinterest."])
            .with_id_pattern(r"/pin/(\d+)")
            .noisy(),
    ]
}

impl GalleryConfig {
    /// Defaults with `GALLERY_*` overrides from the environment and `.env`
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(brand) = lookup("GALLERY_BRAND").filter(|b| !b.trim().is_empty()) {
            config.brand = brand.trim().to_string();
        }

        let backend_override = parse_var::<SearchBackend, _>(&lookup, "GALLERY_BACKEND");
        if let Some(backend) = backend_override {
            config.backend = backend;
            config.fetch_pages = backend.needs_page_fetch();
        }

        if let Some(max_items) = parse_var(&lookup, "GALLERY_MAX_ITEMS") {
            config.max_items = max_items;
        }
        if let Some(cap) = parse_var::<usize, _>(&lookup, "GALLERY_PER_RETAILER_CAP") {
            config.per_retailer_cap = (cap > 0).then_some(cap);
        }
        if let Some(pages) = parse_var(&lookup, "GALLERY_PAGES") {
            config.pages_per_query = pages;
        }
        if let Some(delay_ms) = parse_var(&lookup, "GALLERY_REQUEST_DELAY_MS") {
            config.request_delay = Duration::from_millis(delay_ms);
        }
        if let Some(policy) = parse_var(&lookup, "GALLERY_UNKNOWN_DOMAINS") {
            config.unknown_domains = policy;
        }
        if let Some(path) = lookup("GALLERY_OUTPUT").filter(|p| !p.trim().is_empty()) {
            config.output_path = PathBuf::from(path.trim());
        }
        if let Some(dir) = lookup("GALLERY_DEBUG_DIR") {
            let dir = dir.trim();
            config.debug_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(min_items) = parse_var(&lookup, "GALLERY_MIN_ITEMS") {
            config.min_items = min_items;
        }
        if let Some(fetch_pages) = parse_var(&lookup, "GALLERY_FETCH_PAGES") {
            config.fetch_pages = fetch_pages;
        }

        config
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring invalid {}={:?}: {}", key, raw, e);
            None
        }
    }
}
