use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::{ParsedResult, absolute_http_url, snippet_text};

/// Attribute Bing image results use for their metadata blob
const BLOB_ATTRIBUTE: &str = "m";

/// Image fields in preference order: full-size, original, thumbnail
const IMAGE_FIELDS: [&str; 3] = ["murl", "imgurl", "turl"];

const PRODUCT_FIELD: &str = "purl";

/// Title and description text of the hosting page
const TEXT_FIELDS: [&str; 2] = ["t", "desc"];

/// Extracts product/image results from JSON blobs embedded in `m="..."` attributes.
///
/// The HTML parser decodes attribute entities, so each value is parsed as JSON
/// directly. Blobs that fail to parse or lack either URL are skipped.
pub fn parse_image_blobs(body: &str) -> Vec<ParsedResult> {
    let Ok(selector) = Selector::parse(&format!("[{BLOB_ATTRIBUTE}]")) else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    let mut results = Vec::new();
    let mut skipped = 0usize;

    for element in document.select(&selector) {
        let Some(raw) = element.value().attr(BLOB_ATTRIBUTE) else {
            continue;
        };

        match result_from_blob(raw) {
            Some(result) => results.push(result),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} unreadable image blobs", skipped);
    }

    results
}

fn result_from_blob(raw: &str) -> Option<ParsedResult> {
    let blob: Value = serde_json::from_str(raw.trim()).ok()?;

    let product_url = blob
        .get(PRODUCT_FIELD)
        .and_then(Value::as_str)
        .and_then(absolute_http_url)?;

    let image_url = IMAGE_FIELDS.iter().find_map(|field| {
        blob.get(*field)
            .and_then(Value::as_str)
            .and_then(absolute_http_url)
    })?;

    let snippet = snippet_text(
        TEXT_FIELDS
            .iter()
            .filter_map(|field| blob.get(*field).and_then(Value::as_str)),
    );

    Some(ParsedResult {
        product_url,
        image_url: Some(image_url),
        snippet,
    })
}
