//! Relevance filtering: retailer classification plus brand and apparel keyword gates.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::config::{GalleryConfig, UnknownDomainPolicy};
use crate::dedupe::StyleKeyTable;
use crate::models::{Candidate, OTHER_RETAILER, RetailerRule};
use crate::traits::RelevanceFilter;

/// Lowercased hostname of a URL, `None` for anything that is not http(s)
pub fn host_of(product_url: &str) -> Option<String> {
    let url = Url::parse(product_url.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str().map(str::to_lowercase)
}

/// Lowercases and turns every run of non-alphanumerics into a single space,
/// so `linen-midi_dress` and `Linen Midi Dress` compare equal.
pub fn normalize_text(raw: &str) -> String {
    let decoded = raw.replace("%20", " ").replace("%27", "'");
    let mut out = String::with_capacity(decoded.len());
    let mut pending_space = false;

    for ch in decoded.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else if ch != '\'' {
            pending_space = true;
        }
    }

    out
}

/// Whole-word matcher over normalized text; a trailing plural `s`/`es` is allowed,
/// so `dress` finds "dresses" but not "address".
fn word_matcher(term: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}(?:e?s)?\b", regex::escape(term))).ok()
}

/// Domain allow-list plus brand/keyword gates.
///
/// Retailers whose URL matches their product-page id pattern skip the keyword gate;
/// noisy sources, the `other` bucket and unrecognised URL shapes must mention an
/// apparel keyword in the URL or evidence text.
pub struct DomainKeywordFilter {
    retailers: Vec<RetailerRule>,
    unknown_domains: UnknownDomainPolicy,
    brand_variants: Vec<Regex>,
    keywords: Vec<Regex>,
    styles: Arc<StyleKeyTable>,
}

impl DomainKeywordFilter {
    pub fn new(config: &GalleryConfig, styles: Arc<StyleKeyTable>) -> Self {
        let mut variants: Vec<String> = Vec::new();
        for name in std::iter::once(&config.brand).chain(config.brand_aliases.iter()) {
            let normalized = normalize_text(name);
            if normalized.is_empty() {
                continue;
            }
            let compact = normalized.replace(' ', "");
            for variant in [normalized, compact] {
                if !variants.contains(&variant) {
                    variants.push(variant);
                }
            }
        }
        let brand_variants = variants.iter().filter_map(|v| word_matcher(v)).collect();

        let keywords = config
            .apparel_keywords
            .iter()
            .map(|k| normalize_text(k))
            .filter(|k| !k.is_empty())
            .filter_map(|k| word_matcher(&k))
            .collect();

        Self {
            retailers: config.retailers.clone(),
            unknown_domains: config.unknown_domains,
            brand_variants,
            keywords,
            styles,
        }
    }

    fn rule(&self, retailer: &str) -> Option<&RetailerRule> {
        self.retailers.iter().find(|rule| rule.key == retailer)
    }

    fn mentions_brand(&self, haystack: &str) -> bool {
        let normalized = normalize_text(haystack);
        self.brand_variants
            .iter()
            .any(|variant| variant.is_match(&normalized))
    }

    fn mentions_keyword(&self, haystack: &str) -> bool {
        let normalized = normalize_text(haystack);
        self.keywords
            .iter()
            .any(|keyword| keyword.is_match(&normalized))
    }

    fn needs_keyword(&self, retailer: &str, product_url: &str) -> bool {
        match self.rule(retailer) {
            Some(rule) if rule.noisy => true,
            Some(_) => self.styles.product_id(retailer, product_url).is_none(),
            None => true,
        }
    }
}

impl RelevanceFilter for DomainKeywordFilter {
    fn classify(&self, product_url: &str) -> Option<String> {
        let host = host_of(product_url)?;

        if let Some(rule) = self.retailers.iter().find(|rule| rule.matches_host(&host)) {
            return Some(rule.key.clone());
        }

        match self.unknown_domains {
            UnknownDomainPolicy::Drop => None,
            UnknownDomainPolicy::Other => Some(OTHER_RETAILER.to_string()),
        }
    }

    fn evaluate(&self, mut candidate: Candidate, evidence: Option<&str>) -> Option<Candidate> {
        let Some(retailer) = self.classify(&candidate.product_url) else {
            debug!("Dropping unclassified URL {}", candidate.product_url);
            return None;
        };

        let evidence = evidence.unwrap_or_default();

        let brand_haystack = format!(
            "{} {} {}",
            candidate.product_url, candidate.image_url, evidence
        );
        if !self.mentions_brand(&brand_haystack) {
            debug!("No brand mention for {}", candidate.product_url);
            return None;
        }

        if self.needs_keyword(&retailer, &candidate.product_url) {
            let keyword_haystack = format!("{} {}", candidate.product_url, evidence);
            if !self.mentions_keyword(&keyword_haystack) {
                debug!("No apparel keyword for {} ({})", candidate.product_url, retailer);
                return None;
            }
        }

        candidate.retailer = Some(retailer);
        Some(candidate)
    }
}

/// Wraps another filter and additionally requires the retailer's product-page URL shape.
///
/// Category, listing and search pages have no product id and are rejected, as is
/// everything in the `other` bucket.
pub struct ProductPageFilter<F> {
    inner: F,
    styles: Arc<StyleKeyTable>,
}

impl<F: RelevanceFilter> ProductPageFilter<F> {
    pub fn new(inner: F, styles: Arc<StyleKeyTable>) -> Self {
        Self { inner, styles }
    }
}

impl<F: RelevanceFilter> RelevanceFilter for ProductPageFilter<F> {
    fn classify(&self, product_url: &str) -> Option<String> {
        self.inner.classify(product_url)
    }

    fn evaluate(&self, candidate: Candidate, evidence: Option<&str>) -> Option<Candidate> {
        let candidate = self.inner.evaluate(candidate, evidence)?;
        let retailer = candidate.retailer.as_deref().unwrap_or_default();

        if self.styles.product_id(retailer, &candidate.product_url).is_none() {
            debug!("Not a product page: {}", candidate.product_url);
            return None;
        }

        Some(candidate)
    }
}

/// Builds the filter strategy the configuration asks for
pub fn build_filter(config: &GalleryConfig, styles: Arc<StyleKeyTable>) -> Box<dyn RelevanceFilter> {
    let base = DomainKeywordFilter::new(config, Arc::clone(&styles));
    if config.require_product_page {
        Box::new(ProductPageFilter::new(base, styles))
    } else {
        Box::new(base)
    }
}
