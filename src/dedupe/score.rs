use std::sync::LazyLock;

use regex::Regex;

static DIMENSION_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2,4})\s*x\s*(\d{2,4})").expect("valid dimension regex"));
static DIMENSION_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&;,](?:w|wid|width|h|hei|height|size|sz|imwidth|imheight)=(\d{2,4})\b")
        .expect("valid dimension param regex")
});
static DIMENSION_SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[/_\-,](?:w|h|s)_?(\d{3,4})\b").expect("valid dimension segment regex")
});

const ORIGINAL_TOKENS: [&str; 9] = [
    "original", "hires", "hi-res", "high-res", "highres", "fullsize", "full-size", "zoom", "master",
];
const LARGE_TOKENS: [&str; 5] = ["xxlarge", "xlarge", "large", "_xl", "big"];
const THUMBNAIL_TOKENS: [&str; 7] = ["thumb", "small", "tiny", "icon", "mini", "preview", "_sm."];
const PROXY_HOSTS: [&str; 4] = [
    ".mm.bing.net",
    "bing.com/th",
    "external-content.duckduckgo.com",
    "encrypted-tbn",
];

/// Heuristic quality estimate of an image URL. Higher is better.
///
/// Original/high-resolution markers and large explicit dimensions add to the score;
/// thumbnail markers, small dimensions and search engine thumbnail proxies subtract.
pub fn image_score(image_url: &str) -> i32 {
    let url = image_url.to_ascii_lowercase();
    let mut score = 0;

    if ORIGINAL_TOKENS.iter().any(|token| url.contains(token)) {
        score += 30;
    }
    if LARGE_TOKENS.iter().any(|token| url.contains(token)) {
        score += 15;
    }
    if THUMBNAIL_TOKENS.iter().any(|token| url.contains(token)) {
        score -= 40;
    }
    if PROXY_HOSTS.iter().any(|host| url.contains(host)) {
        score -= 25;
    }

    if let Some(dimension) = largest_dimension(&url) {
        if dimension < 300 {
            score -= 20;
        } else {
            score += i32::try_from(dimension / 100).unwrap_or(30).min(30);
        }
    }

    score
}

fn largest_dimension(url: &str) -> Option<u32> {
    let pairs = DIMENSION_PAIR_RE
        .captures_iter(url)
        .flat_map(|caps| [caps.get(1), caps.get(2)]);
    let params = DIMENSION_PARAM_RE.captures_iter(url).map(|caps| caps.get(1));
    let segments = DIMENSION_SEGMENT_RE.captures_iter(url).map(|caps| caps.get(1));

    pairs
        .chain(params)
        .chain(segments)
        .flatten()
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
}
