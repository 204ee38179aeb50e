//! Best-effort extraction of product/image pairs from search engine markup.
//!
//! Nothing in this module returns an error. Anything that cannot be read is
//! skipped and the rest of the body is still parsed.

mod blob;
mod links;
mod page;
mod rss;

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Candidate;

pub use blob::parse_image_blobs;
pub use links::parse_link_results;
pub use page::{PageEvidence, parse_product_page};
pub use rss::parse_rss;

/// Shape of a search response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// `<item>` blocks with media/enclosure/description images
    Rss,
    /// HTML with JSON metadata embedded in `m="..."` attributes
    ImageBlobs,
    /// HTML result links without images
    LinkResults,
}

/// A parsed search hit.
///
/// `image_url` is `None` for link-only formats and feed items without a picture;
/// the page fetch step may fill it in. `snippet` is the result's title and
/// description text, used as brand/keyword evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResult {
    pub product_url: String,
    pub image_url: Option<String>,
    pub snippet: Option<String>,
}

impl ParsedResult {
    pub fn into_candidate(self) -> Option<Candidate> {
        let image_url = self.image_url.filter(|u| !u.is_empty())?;
        Some(Candidate::new(self.product_url, image_url))
    }
}

/// Dispatches a raw body to the parser for its format
pub fn parse_response(format: ResultFormat, body: &str) -> Vec<ParsedResult> {
    match format {
        ResultFormat::Rss => parse_rss(body),
        ResultFormat::ImageBlobs => parse_image_blobs(body),
        ResultFormat::LinkResults => parse_link_results(body)
            .into_iter()
            .map(|product_url| ParsedResult {
                product_url,
                image_url: None,
                snippet: None,
            })
            .collect(),
    }
}

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid entity regex"));

/// Decodes the XML/HTML entities that show up in feed text and URLs
pub(crate) fn decode_entities(raw: &str) -> String {
    let named = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'");

    let numeric = NUMERIC_ENTITY_RE.replace_all(&named, |caps: &regex::Captures<'_>| {
        let code = &caps[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), |c| c.to_string())
    });

    // &amp; last so "&amp;lt;" stays "&lt;"
    numeric.replace("&amp;", "&")
}

/// Joins text fragments into one whitespace-collapsed snippet with markup removed
pub(crate) fn snippet_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let joined = parts
        .into_iter()
        .map(|part| TAG_RE.replace_all(part, " "))
        .collect::<Vec<_>>()
        .join(" ");
    let text = joined.split_whitespace().collect::<Vec<_>>().join(" ");

    (!text.is_empty()).then_some(text)
}

/// Keeps only absolute http(s) URLs, upgrading protocol-relative ones
pub(crate) fn absolute_http_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Some(trimmed.to_string())
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        Some(format!("https://{rest}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            decode_entities("a &amp; b &lt;img src=&quot;x&quot;&gt; &#39;&#x41;"),
            "a & b <img src=\"x\"> 'A"
        );
    }

    #[test]
    fn double_escaped_ampersand_decodes_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn protocol_relative_urls_become_https() {
        assert_eq!(
            absolute_http_url("//cdn.example.com/a.jpg").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert!(absolute_http_url("/relative/a.jpg").is_none());
        assert!(absolute_http_url("data:image/png;base64,AAAA").is_none());
    }

    #[test]
    fn link_results_carry_no_image() {
        let parsed = ParsedResult {
            product_url: "https://www.next.co.uk/style/st1/a1".to_string(),
            image_url: None,
            snippet: Some("Boden Dress".to_string()),
        };
        assert!(parsed.into_candidate().is_none());
    }

    #[test]
    fn snippet_strips_markup_and_collapses_whitespace() {
        assert_eq!(
            snippet_text(["Boden  Linen Dress", "<p>Shop <b>now</b></p>\n"]).as_deref(),
            Some("Boden Linen Dress Shop now")
        );
        assert_eq!(snippet_text(["", " <br/> "]), None);
    }
}
