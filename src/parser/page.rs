use scraper::{Html, Selector};
use url::Url;

/// Meta/link selectors that name a page's representative image, in preference order
const IMAGE_SELECTORS: [(&str, &str); 5] = [
    (r#"meta[property="og:image:secure_url"]"#, "content"),
    (r#"meta[property="og:image"]"#, "content"),
    (r#"meta[name="twitter:image"]"#, "content"),
    (r#"meta[itemprop="image"]"#, "content"),
    (r#"link[rel="image_src"]"#, "href"),
];

const TEXT_META_SELECTOR: &str = r#"meta[name="description"], meta[property="og:title"], meta[property="og:description"], meta[property="product:brand"]"#;

/// Elements whose text never counts as page content
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Upper bound on collected text, enough for title, breadcrumbs and description
const MAX_TEXT_CHARS: usize = 200_000;

/// What a fetched product page contributes to relevance and image selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEvidence {
    pub image_url: Option<String>,
    pub text: String,
}

/// Reads the representative image and visible text of a product page
pub fn parse_product_page(page_url: &str, body: &str) -> PageEvidence {
    let document = Html::parse_document(body);
    let base = Url::parse(page_url).ok();

    let image_url = IMAGE_SELECTORS.iter().find_map(|(css, attr)| {
        let selector = Selector::parse(css).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|raw| resolve(base.as_ref(), raw))
    });

    let mut text = String::new();

    if let Ok(selector) = Selector::parse("title") {
        for title in document.select(&selector) {
            push_text(&mut text, &title.text().collect::<String>());
        }
    }

    if let Ok(selector) = Selector::parse(TEXT_META_SELECTOR) {
        for meta in document.select(&selector) {
            if let Some(content) = meta.value().attr("content") {
                push_text(&mut text, content);
            }
        }
    }

    if let Ok(selector) = Selector::parse("body")
        && let Some(body_el) = document.select(&selector).next()
    {
        for node in body_el.descendants() {
            if text.len() >= MAX_TEXT_CHARS {
                break;
            }
            let Some(fragment) = node.value().as_text() else {
                continue;
            };
            let skipped = node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name().to_string()))
                .is_some_and(|name| SKIPPED_ELEMENTS.contains(&name.as_str()));
            if !skipped {
                push_text(&mut text, fragment);
            }
        }
    }

    PageEvidence { image_url, text }
}

fn push_text(buffer: &mut String, fragment: &str) {
    let trimmed = fragment.trim();
    if trimmed.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(trimmed);
}

fn resolve(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <title>Boden Linen Midi Dress | Next UK</title>
        <meta property="og:image" content="/images/products/st123_large.jpg">
        <meta name="twitter:image" content="https://cdn.test/twitter.jpg">
        <meta name="description" content="Shop the Boden linen dress">
        </head><body>
        <h1>Linen Midi Dress</h1>
        <script>var tracking = "ignore me";</script>
        <p>100% linen.</p>
        </body></html>"#;

    #[test]
    fn og_image_is_resolved_against_page_url() {
        let evidence = parse_product_page("https://www.next.co.uk/style/st123/a1", PAGE);
        assert_eq!(
            evidence.image_url.as_deref(),
            Some("https://www.next.co.uk/images/products/st123_large.jpg")
        );
    }

    #[test]
    fn text_includes_title_meta_and_body_but_not_scripts() {
        let evidence = parse_product_page("https://www.next.co.uk/style/st123/a1", PAGE);
        assert!(evidence.text.contains("Boden Linen Midi Dress"));
        assert!(evidence.text.contains("Shop the Boden linen dress"));
        assert!(evidence.text.contains("100% linen."));
        assert!(!evidence.text.contains("ignore me"));
    }

    #[test]
    fn page_without_image_meta_has_no_image() {
        let evidence = parse_product_page("https://a.test/", "<html><body><p>hi</p></body></html>");
        assert!(evidence.image_url.is_none());
        assert_eq!(evidence.text, "hi");
    }

    #[test]
    fn data_uris_are_ignored() {
        let body = r#"<meta property="og:image" content="data:image/png;base64,AAA">
            <meta name="twitter:image" content="https://cdn.test/t.jpg">"#;
        let evidence = parse_product_page("https://a.test/", body);
        assert_eq!(evidence.image_url.as_deref(), Some("https://cdn.test/t.jpg"));
    }
}
