//! Collapses classified candidates to one gallery item per product style.
//!
//! Two passes: a cheap first-seen image dedupe, then grouping by [`StyleKey`]
//! with the best-scoring image kept per group. Both passes are pure reductions,
//! so running the deduplicator over its own output changes nothing.

mod score;
mod style;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::models::{Candidate, OutputItem, StyleKey};

pub use score::image_score;
pub use style::{IdExtractor, StyleKeyTable, normalized_path, pattern_extractor};

/// Limits and strictness applied after grouping
#[derive(Debug, Clone)]
pub struct DedupeOptions {
    /// Compare image URLs without their query string
    pub strip_image_query: bool,
    pub max_items: usize,
    pub per_retailer_cap: Option<usize>,
    /// Order by image score before applying caps, otherwise keep first-seen order
    pub sort_before_cap: bool,
}

pub struct Deduplicator<'a> {
    styles: &'a StyleKeyTable,
    options: DedupeOptions,
}

struct Scored {
    key: StyleKey,
    candidate: Candidate,
    score: i32,
}

impl<'a> Deduplicator<'a> {
    pub fn new(styles: &'a StyleKeyTable, options: DedupeOptions) -> Self {
        Self { styles, options }
    }

    /// Runs both passes and the caps. Unclassified or incomplete candidates are dropped.
    pub fn dedupe(&self, candidates: Vec<Candidate>) -> Vec<OutputItem> {
        let total = candidates.len();
        let unique_images = self.dedupe_images(candidates);
        let after_images = unique_images.len();

        let mut styles = self.best_per_style(unique_images);
        let after_styles = styles.len();

        if self.options.sort_before_cap {
            // stable, so equal scores keep first-seen order
            styles.sort_by(|a, b| b.score.cmp(&a.score));
        }

        let capped = self.apply_caps(styles);

        debug!(
            "Dedupe: {} candidates -> {} unique images -> {} styles -> {} kept",
            total,
            after_images,
            after_styles,
            capped.len()
        );

        capped
            .into_iter()
            .filter_map(|scored| scored.candidate.into_output())
            .collect()
    }

    /// Drops candidates whose image was already seen, keeping first-seen order
    pub fn dedupe_images(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen = HashSet::new();

        candidates
            .into_iter()
            .filter(|c| {
                c.retailer.as_deref().is_some_and(|r| !r.is_empty())
                    && !c.product_url.is_empty()
                    && !c.image_url.is_empty()
            })
            .filter(|c| seen.insert(self.image_key(&c.image_url)))
            .collect()
    }

    fn best_per_style(&self, candidates: Vec<Candidate>) -> Vec<Scored> {
        let mut groups: Vec<Scored> = Vec::new();
        let mut index: HashMap<StyleKey, usize> = HashMap::new();

        for candidate in candidates {
            let retailer = candidate.retailer.as_deref().unwrap_or_default();
            let key = self.styles.style_key(retailer, &candidate.product_url);
            let score = image_score(&candidate.image_url);

            match index.get(&key) {
                Some(&slot) => {
                    if score > groups[slot].score {
                        debug!("Better image for {}: {}", key, candidate.image_url);
                        groups[slot].candidate = candidate;
                        groups[slot].score = score;
                    }
                }
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(Scored {
                        key,
                        candidate,
                        score,
                    });
                }
            }
        }

        groups
    }

    fn apply_caps(&self, styles: Vec<Scored>) -> Vec<Scored> {
        let mut per_retailer: HashMap<String, usize> = HashMap::new();
        let mut kept = Vec::new();

        for scored in styles {
            if kept.len() >= self.options.max_items {
                break;
            }

            if let Some(cap) = self.options.per_retailer_cap {
                let retailer = scored.candidate.retailer.clone().unwrap_or_default();
                let count = per_retailer.entry(retailer).or_insert(0);
                if *count >= cap {
                    debug!("Per-retailer cap reached, dropping {}", scored.key);
                    continue;
                }
                *count += 1;
            }

            kept.push(scored);
        }

        kept
    }

    fn image_key(&self, image_url: &str) -> String {
        if self.options.strip_image_query {
            image_url
                .split(|c: char| c == '?' || c == '#')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            image_url.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetailerRule;

    fn styles() -> StyleKeyTable {
        StyleKeyTable::from_rules(&[
            RetailerRule::new("next", &["next.co.uk"]).with_id_pattern(r"(?i)/style/([a-z0-9]+)"),
            RetailerRule::new("asos", &["asos.com"]).with_id_pattern(r"(?i)/prd/(\d+)"),
        ])
    }

    fn options(max_items: usize) -> DedupeOptions {
        DedupeOptions {
            strip_image_query: true,
            max_items,
            per_retailer_cap: None,
            sort_before_cap: false,
        }
    }

    fn candidate(retailer: &str, product_url: &str, image_url: &str) -> Candidate {
        Candidate {
            product_url: product_url.to_string(),
            image_url: image_url.to_string(),
            retailer: Some(retailer.to_string()),
        }
    }

    #[test]
    fn repeated_image_is_dropped_even_with_different_query() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(10));

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/1.jpg?w=400"),
            candidate("asos", "https://www.asos.com/prd/9", "https://img.test/1.jpg?w=800"),
        ]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].retailer, "next");
    }

    #[test]
    fn strictly_higher_score_wins_within_a_style() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(10));

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a?size=8", "https://img.test/thumb/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/st1/b", "https://img.test/original/1.jpg"),
        ]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].image_url, "https://img.test/original/1.jpg");
    }

    #[test]
    fn ties_keep_first_seen() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(10));

        let out = dedupe.dedupe(vec![
            candidate("asos", "https://www.asos.com/boden/prd/55", "https://img.test/a.jpg"),
            candidate("asos", "https://www.asos.com/boden/prd/55?clr=red", "https://img.test/b.jpg"),
        ]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].image_url, "https://img.test/a.jpg");
    }

    #[test]
    fn no_two_items_share_a_style_key() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(50));

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/ST1/b", "https://img.test/2.jpg"),
            candidate("next", "https://www.next.co.uk/style/st2/a", "https://img.test/3.jpg"),
            candidate("asos", "https://www.asos.com/prd/1", "https://img.test/4.jpg"),
            candidate("asos", "https://www.asos.com/women/cat/", "https://img.test/5.jpg"),
            candidate("asos", "https://asos.com/women/cat?x=1", "https://img.test/6.jpg"),
        ]);

        let keys: HashSet<StyleKey> = out
            .iter()
            .map(|item| table.style_key(&item.retailer, &item.product_url))
            .collect();
        assert_eq!(keys.len(), out.len());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn dedupe_is_idempotent() {
        let table = styles();
        let dedupe = Deduplicator::new(
            &table,
            DedupeOptions {
                strip_image_query: true,
                max_items: 3,
                per_retailer_cap: Some(2),
                sort_before_cap: true,
            },
        );

        let first = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/st2/a", "https://img.test/original/2.jpg"),
            candidate("next", "https://www.next.co.uk/style/st3/a", "https://img.test/3.jpg?w=1600"),
            candidate("asos", "https://www.asos.com/prd/1", "https://img.test/thumb/4.jpg"),
            candidate("asos", "https://www.asos.com/prd/2", "https://img.test/5.jpg"),
        ]);
        let second = dedupe.dedupe(first.iter().cloned().map(Candidate::from).collect());

        assert_eq!(first, second);
    }

    #[test]
    fn sort_before_cap_keeps_best_scores() {
        let table = styles();
        let dedupe = Deduplicator::new(
            &table,
            DedupeOptions {
                sort_before_cap: true,
                ..options(2)
            },
        );

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/thumb/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/st2/a", "https://img.test/2.jpg"),
            candidate("next", "https://www.next.co.uk/style/st3/a", "https://img.test/original/3.jpg"),
        ]);

        let images: Vec<&str> = out.iter().map(|i| i.image_url.as_str()).collect();
        assert_eq!(
            images,
            vec!["https://img.test/original/3.jpg", "https://img.test/2.jpg"]
        );
    }

    #[test]
    fn truncation_without_sort_keeps_first_seen() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(2));

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/thumb/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/st2/a", "https://img.test/2.jpg"),
            candidate("next", "https://www.next.co.uk/style/st3/a", "https://img.test/original/3.jpg"),
        ]);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].image_url, "https://img.test/thumb/1.jpg");
    }

    #[test]
    fn per_retailer_cap_limits_noisy_sources() {
        let table = styles();
        let dedupe = Deduplicator::new(
            &table,
            DedupeOptions {
                per_retailer_cap: Some(1),
                ..options(10)
            },
        );

        let out = dedupe.dedupe(vec![
            candidate("next", "https://www.next.co.uk/style/st1/a", "https://img.test/1.jpg"),
            candidate("next", "https://www.next.co.uk/style/st2/a", "https://img.test/2.jpg"),
            candidate("asos", "https://www.asos.com/prd/1", "https://img.test/3.jpg"),
        ]);

        let retailers: Vec<&str> = out.iter().map(|i| i.retailer.as_str()).collect();
        assert_eq!(retailers, vec!["next", "asos"]);
    }

    #[test]
    fn unclassified_candidates_are_dropped() {
        let table = styles();
        let dedupe = Deduplicator::new(&table, options(10));

        let out = dedupe.dedupe(vec![Candidate::new(
            "https://www.next.co.uk/style/st1/a",
            "https://img.test/1.jpg",
        )]);

        assert!(out.is_empty());
    }
}
