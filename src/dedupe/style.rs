use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use tracing::warn;
use url::Url;

use crate::models::{RetailerRule, StyleKey};

/// Pulls a retailer's product id out of a parsed product URL
pub type IdExtractor = Arc<dyn Fn(&Url) -> Option<String> + Send + Sync>;

/// Retailer key -> product id extractor.
///
/// A retailer without an extractor, or a URL the extractor does not recognise,
/// falls back to the normalized host and path.
#[derive(Clone, Default)]
pub struct StyleKeyTable {
    extractors: HashMap<String, IdExtractor>,
}

impl StyleKeyTable {
    /// Compiles every rule's `id_pattern`; invalid patterns are logged and skipped
    pub fn from_rules(rules: &[RetailerRule]) -> Self {
        let mut table = Self::default();

        for rule in rules {
            let Some(pattern) = &rule.id_pattern else {
                continue;
            };
            match Regex::new(pattern) {
                Ok(re) => table.insert(&rule.key, pattern_extractor(re)),
                Err(e) => warn!("Ignoring invalid id pattern for {}: {}", rule.key, e),
            }
        }

        table
    }

    #[must_use]
    pub fn with_extractor(mut self, retailer: &str, extractor: IdExtractor) -> Self {
        self.insert(retailer, extractor);
        self
    }

    pub fn insert(&mut self, retailer: &str, extractor: IdExtractor) {
        self.extractors.insert(retailer.to_string(), extractor);
    }

    /// The retailer-specific product id, if the URL has the product-page shape
    pub fn product_id(&self, retailer: &str, product_url: &str) -> Option<String> {
        let extractor = self.extractors.get(retailer)?;
        let url = Url::parse(product_url).ok()?;
        extractor(&url).filter(|id| !id.is_empty())
    }

    pub fn style_key(&self, retailer: &str, product_url: &str) -> StyleKey {
        match self.product_id(retailer, product_url) {
            Some(id) => StyleKey::new(retailer, &id),
            None => StyleKey::new(retailer, &format!("path:{}", normalized_path(product_url))),
        }
    }
}

impl fmt::Debug for StyleKeyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.extractors.keys().collect();
        keys.sort();
        f.debug_struct("StyleKeyTable").field("retailers", &keys).finish()
    }
}

/// Matches `re` against `path?query` and lowercases the first capture group
pub fn pattern_extractor(re: Regex) -> IdExtractor {
    Arc::new(move |url: &Url| {
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        re.captures(&target)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    })
}

/// Host without `www.` plus path without trailing slash, both lowercased.
///
/// Query string and fragment are dropped so tracking parameters collapse.
pub fn normalized_path(product_url: &str) -> String {
    match Url::parse(product_url) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host);
            format!("{}{}", host, url.path().trim_end_matches('/').to_lowercase())
        }
        Err(_) => product_url
            .split(|c: char| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_lowercase(),
    }
}
