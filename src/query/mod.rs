//! Search query generation from brand, keywords and target domains

use crate::config::GalleryConfig;

/// Builds the query list for a run, in issue order and without repeats.
///
/// Per target domain: `"brand" site:domain`. Per keyword: `"brand" keyword`.
/// With `combine_site_and_keywords`, also `"brand" keyword site:domain` for every pair.
pub fn generate_queries(config: &GalleryConfig) -> Vec<String> {
    let brand = config.brand.trim().replace('"', "");
    if brand.is_empty() {
        return Vec::new();
    }
    let quoted = format!("\"{brand}\"");

    let domains: Vec<&str> = config
        .target_domains
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .collect();
    let keywords: Vec<&str> = config
        .apparel_keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();

    let mut queries = Vec::new();
    let mut push = |query: String| {
        if !queries.contains(&query) {
            queries.push(query);
        }
    };

    for domain in &domains {
        push(format!("{quoted} site:{domain}"));
    }

    for keyword in &keywords {
        push(format!("{quoted} {keyword}"));
    }

    if config.combine_site_and_keywords {
        for domain in &domains {
            for keyword in &keywords {
                push(format!("{quoted} {keyword} site:{domain}"));
            }
        }
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(domains: &[&str], keywords: &[&str]) -> GalleryConfig {
        GalleryConfig {
            brand: "Boden".to_string(),
            target_domains: domains.iter().map(|d| (*d).to_string()).collect(),
            apparel_keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            ..GalleryConfig::default()
        }
    }

    #[test]
    fn site_queries_come_before_keyword_queries() {
        let queries = generate_queries(&config(&["next.co.uk"], &["dress", "coat"]));
        assert_eq!(
            queries,
            vec![
                "\"Boden\" site:next.co.uk",
                "\"Boden\" dress",
                "\"Boden\" coat",
            ]
        );
    }

    #[test]
    fn combined_queries_cover_every_pair() {
        let mut config = config(&["next.co.uk", "asos.com"], &["dress"]);
        config.combine_site_and_keywords = true;

        let queries = generate_queries(&config);
        assert_eq!(queries.len(), 5);
        assert!(queries.contains(&"\"Boden\" dress site:asos.com".to_string()));
    }

    #[test]
    fn duplicates_and_blanks_are_skipped() {
        let queries = generate_queries(&config(&["asos.com", " ", "asos.com"], &["dress", "dress"]));
        assert_eq!(queries, vec!["\"Boden\" site:asos.com", "\"Boden\" dress"]);
    }

    #[test]
    fn empty_brand_yields_no_queries() {
        let mut config = config(&["asos.com"], &["dress"]);
        config.brand = "  ".to_string();
        assert!(generate_queries(&config).is_empty());
    }

    #[test]
    fn quotes_inside_brand_are_removed() {
        let mut config = config(&[], &["dress"]);
        config.brand = "Joe\"s".to_string();
        assert_eq!(generate_queries(&config), vec!["\"Joes\" dress"]);
    }
}
