//! Data models for search candidates, retailer rules and gallery output

use std::fmt;

use serde::{Deserialize, Serialize};

/// Retailer key used for URLs that match no configured rule
pub const OTHER_RETAILER: &str = "other";

/// A raw product/image pair pulled out of a search result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub product_url: String,
    pub image_url: String,
    /// Assigned by the relevance filter
    pub retailer: Option<String>,
}

impl Candidate {
    pub fn new(product_url: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            product_url: product_url.into(),
            image_url: image_url.into(),
            retailer: None,
        }
    }

    /// Converts a classified candidate into an output item.
    ///
    /// Returns `None` if the candidate was never classified or any field is empty.
    pub fn into_output(self) -> Option<OutputItem> {
        let retailer = self.retailer?;
        if retailer.is_empty() || self.product_url.is_empty() || self.image_url.is_empty() {
            return None;
        }

        Some(OutputItem {
            retailer,
            product_url: self.product_url,
            image_url: self.image_url,
        })
    }
}

/// Static mapping from a retailer key to the domains that belong to it
#[derive(Debug, Clone)]
pub struct RetailerRule {
    /// Normalized retailer key written to the output (e.g. `next`)
    pub key: String,
    /// Case-insensitive substrings tested against the URL hostname
    pub domain_matchers: Vec<String>,
    /// Regex with one capture group that pulls the product id out of
    /// `path?query`. A match also marks the URL as a product page.
    pub id_pattern: Option<String>,
    /// Noisy sources (pin boards, marketplaces) always need an apparel keyword
    pub noisy: bool,
}

impl RetailerRule {
    pub fn new(key: &str, domain_matchers: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            domain_matchers: domain_matchers.iter().map(|d| (*d).to_string()).collect(),
            id_pattern: None,
            noisy: false,
        }
    }

    #[must_use]
    pub fn with_id_pattern(mut self, pattern: &str) -> Self {
        self.id_pattern = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub fn noisy(mut self) -> Self {
        self.noisy = true;
        self
    }

    /// Returns true if any matcher is a substring of `host` (already lowercased)
    pub fn matches_host(&self, host: &str) -> bool {
        self.domain_matchers
            .iter()
            .any(|matcher| host.contains(&matcher.to_lowercase()))
    }
}

/// Grouping key approximating "the same product listing"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleKey(String);

impl StyleKey {
    pub fn new(retailer: &str, id: &str) -> Self {
        Self(format!("{retailer}:{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One gallery tile, the only persisted unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputItem {
    pub retailer: String,
    pub product_url: String,
    pub image_url: String,
}

impl From<OutputItem> for Candidate {
    fn from(item: OutputItem) -> Self {
        Self {
            product_url: item.product_url,
            image_url: item.image_url,
            retailer: Some(item.retailer),
        }
    }
}

/// Raw answer from a search engine or product page
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub status_code: u16,
    pub raw_body: String,
}
