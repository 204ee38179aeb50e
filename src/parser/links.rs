use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use super::absolute_http_url;

/// Extracts organic result links from a DuckDuckGo HTML results page.
///
/// Result anchors point at a `/l/?uddg=<target>` redirect; the target is decoded.
/// Ads and links back into DuckDuckGo are skipped, and repeats within the page dropped.
pub fn parse_link_results(body: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("a.result__a") else {
        return Vec::new();
    };
    let document = Html::parse_document(body);

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(target) = resolve_result_href(href) else {
            continue;
        };

        if seen.insert(target.clone()) {
            links.push(target);
        }
    }

    links
}

fn resolve_result_href(href: &str) -> Option<String> {
    let absolute = absolute_http_url(href)?;
    let url = Url::parse(&absolute).ok()?;

    let target = if is_search_engine_host(&url) {
        let (_, value) = url.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&value).ok()?
    } else {
        url
    };

    if is_search_engine_host(&target) || !matches!(target.scheme(), "http" | "https") {
        return None;
    }

    Some(target.to_string())
}

fn is_search_engine_host(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(href: &str) -> String {
        format!(r#"<div class="result"><h2><a class="result__a" href="{href}">Title</a></h2></div>"#)
    }

    #[test]
    fn decodes_uddg_redirects() {
        let body = result(
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.next.co.uk%2Fstyle%2Fst123%2Fa456&amp;rut=abc",
        );

        assert_eq!(
            parse_link_results(&body),
            vec!["https://www.next.co.uk/style/st123/a456"]
        );
    }

    #[test]
    fn keeps_direct_links_and_drops_repeats() {
        let body = format!(
            "{}{}{}",
            result("https://www.asos.com/prd/1"),
            result("https://www.asos.com/prd/1"),
            result("https://www.johnlewis.com/p123"),
        );

        assert_eq!(
            parse_link_results(&body),
            vec!["https://www.asos.com/prd/1", "https://www.johnlewis.com/p123"]
        );
    }

    #[test]
    fn skips_ads_and_relative_links() {
        let body = format!(
            "{}{}",
            result("https://duckduckgo.com/y.js?ad_provider=bing&amp;u3=x"),
            result("/html/?q=next+page"),
        );

        assert!(parse_link_results(&body).is_empty());
    }
}
