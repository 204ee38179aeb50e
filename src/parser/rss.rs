use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{ParsedResult, absolute_http_url, decode_entities, snippet_text};

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid item regex"));
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>(.*?)</link>").expect("valid link regex"));
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid title regex"));
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").expect("valid description regex")
});
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<!\[CDATA\[(.*?)\]\]>\s*$").expect("valid cdata regex"));
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("valid img regex")
});

/// `url` attributes tried in order, first non-empty wins
static IMAGE_ATTR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["media:thumbnail", "media:content", "enclosure"]
        .iter()
        .map(|tag| {
            Regex::new(&format!(r#"(?is)<{tag}\b[^>]*?\burl\s*=\s*["']([^"']*)["']"#))
                .expect("valid image attribute regex")
        })
        .collect()
});

/// Extracts results from an RSS body.
///
/// Items without a usable link are dropped. Items without an image are kept
/// with `image_url: None` so a product page fetch can complete them.
pub fn parse_rss(body: &str) -> Vec<ParsedResult> {
    let mut results = Vec::new();

    for item in ITEM_RE.captures_iter(body) {
        let block = &item[1];

        let Some(product_url) = extract_link(block) else {
            debug!("Skipping RSS item without a usable link");
            continue;
        };

        let image_url = extract_image(block);
        if image_url.is_none() {
            debug!("RSS item without an image: {}", product_url);
        }

        results.push(ParsedResult {
            product_url,
            image_url,
            snippet: extract_snippet(block),
        });
    }

    results
}

fn extract_link(block: &str) -> Option<String> {
    let raw = LINK_RE.captures(block)?.get(1)?.as_str();
    absolute_http_url(&decode_entities(&unwrap_cdata(raw)))
}

fn extract_image(block: &str) -> Option<String> {
    IMAGE_ATTR_RES
        .iter()
        .find_map(|re| url_attribute(re, block))
        .or_else(|| description_image(block))
}

fn url_attribute(re: &Regex, block: &str) -> Option<String> {
    re.captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str()))
        .find_map(|url| absolute_http_url(&url))
}

fn description_image(block: &str) -> Option<String> {
    let raw = DESCRIPTION_RE.captures(block)?.get(1)?.as_str();
    let html = decode_entities(&unwrap_cdata(raw));

    IMG_SRC_RE
        .captures_iter(&html)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| absolute_http_url(&decode_entities(m.as_str())))
}

fn extract_snippet(block: &str) -> Option<String> {
    let title = element_text(&TITLE_RE, block);
    let description = element_text(&DESCRIPTION_RE, block);

    snippet_text([title.as_str(), description.as_str()])
}

fn element_text(re: &Regex, block: &str) -> String {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| decode_entities(&unwrap_cdata(m.as_str())))
        .unwrap_or_default()
}

fn unwrap_cdata(raw: &str) -> String {
    CDATA_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_wins_over_later_sources() {
        let body = r#"<rss><channel><item>
            <link>https://www.next.co.uk/style/st1/a1</link>
            <media:content url="https://img.test/content.jpg"/>
            <media:thumbnail url="https://img.test/thumb.jpg"/>
            <enclosure url="https://img.test/enclosure.jpg" type="image/jpeg"/>
        </item></channel></rss>"#;

        let parsed = parse_rss(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].image_url.as_deref(), Some("https://img.test/thumb.jpg"));
    }

    #[test]
    fn falls_back_through_content_and_enclosure() {
        let body = r#"<item><link>https://a.test/p/1</link><media:content url="https://img.test/c.jpg"/></item>
            <item><link>https://a.test/p/2</link><enclosure url="https://img.test/e.jpg"/></item>"#;

        let images: Vec<String> = parse_rss(body).into_iter().filter_map(|r| r.image_url).collect();
        assert_eq!(images, vec!["https://img.test/c.jpg", "https://img.test/e.jpg"]);
    }

    #[test]
    fn empty_attribute_falls_through_to_next_source() {
        let body = r#"<item><link>https://a.test/p/1</link>
            <media:thumbnail url=""/><enclosure url="https://img.test/e.jpg"/></item>"#;

        assert_eq!(parse_rss(body)[0].image_url.as_deref(), Some("https://img.test/e.jpg"));
    }

    #[test]
    fn reads_escaped_img_inside_description() {
        let body = "<item><link>https://www.asos.com/boden/dress/prd/123?x=1&amp;y=2</link>\
            <description>&lt;p&gt;&lt;img src=&quot;https://images.test/a.jpg?w=800&amp;h=1000&quot;&gt;&lt;/p&gt;</description></item>";

        let parsed = parse_rss(body);
        assert_eq!(parsed[0].product_url, "https://www.asos.com/boden/dress/prd/123?x=1&y=2");
        assert_eq!(
            parsed[0].image_url.as_deref(),
            Some("https://images.test/a.jpg?w=800&h=1000")
        );
    }

    #[test]
    fn reads_cdata_description_and_link() {
        let body = r#"<item><link><![CDATA[ https://a.test/p/9 ]]></link>
            <description><![CDATA[<div><img class="x" src='//cdn.test/z.png'></div>]]></description></item>"#;

        let parsed = parse_rss(body);
        assert_eq!(parsed[0].product_url, "https://a.test/p/9");
        assert_eq!(parsed[0].image_url.as_deref(), Some("https://cdn.test/z.png"));
    }

    #[test]
    fn items_without_link_are_dropped() {
        let body = r"<item><title>no link</title><enclosure url='https://img.test/e.jpg'/></item>";
        assert!(parse_rss(body).is_empty());
    }

    #[test]
    fn items_without_image_are_kept_for_page_fetch() {
        let body = r"<item><link>https://www.next.co.uk/style/st9/a1</link><description>Boden dress</description></item>";

        let parsed = parse_rss(body);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].image_url, None);
        assert_eq!(parsed[0].snippet.as_deref(), Some("Boden dress"));
    }

    #[test]
    fn snippet_joins_title_and_description_text() {
        let body = r#"<item><title>Boden Linen Midi Dress | Next UK</title>
            <link>https://www.next.co.uk/style/abc/123</link>
            <description><![CDATA[<p>Shop the <b>linen</b> edit</p><img src="https://img.test/a.jpg">]]></description></item>"#;

        assert_eq!(
            parse_rss(body)[0].snippet.as_deref(),
            Some("Boden Linen Midi Dress | Next UK Shop the linen edit")
        );
    }

    #[test]
    fn malformed_body_yields_nothing() {
        assert!(parse_rss("<item><link>https://a.test").is_empty());
        assert!(parse_rss("").is_empty());
    }
}
