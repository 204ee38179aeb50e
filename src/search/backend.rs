use std::fmt;
use std::str::FromStr;

use crate::parser::ResultFormat;

/// Search engine endpoint the collector talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    /// Bing web search with `format=rss`
    BingRss,
    /// Bing image search async endpoint, results carry `m="{json}"` blobs
    BingImages,
    /// DuckDuckGo's no-JS HTML results, links only
    DuckDuckGoHtml,
}

impl SearchBackend {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::BingRss | Self::BingImages => "https://www.bing.com",
            Self::DuckDuckGoHtml => "https://html.duckduckgo.com",
        }
    }

    /// Builds the request URL for a zero-based result page
    pub fn endpoint(self, base_url: &str, query: &str, page: u32) -> String {
        let base = base_url.trim_end_matches('/');
        let encoded = urlencoding::encode(query);

        match self {
            Self::BingRss => {
                let first = 1 + page * 10;
                format!("{base}/search?format=rss&q={encoded}&first={first}")
            }
            Self::BingImages => {
                let first = page * 35;
                format!("{base}/images/async?q={encoded}&first={first}&count=35&mmasync=1")
            }
            Self::DuckDuckGoHtml => {
                let offset = page * 30;
                format!("{base}/html/?q={encoded}&s={offset}")
            }
        }
    }

    pub fn format(self) -> ResultFormat {
        match self {
            Self::BingRss => ResultFormat::Rss,
            Self::BingImages => ResultFormat::ImageBlobs,
            Self::DuckDuckGoHtml => ResultFormat::LinkResults,
        }
    }

    pub fn accept_header(self) -> &'static str {
        match self {
            Self::BingRss => "application/rss+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5",
            Self::BingImages | Self::DuckDuckGoHtml => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
            }
        }
    }

    /// Link-only backends need the product page for an image
    pub fn needs_page_fetch(self) -> bool {
        matches!(self, Self::DuckDuckGoHtml)
    }
}

impl fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BingRss => "bing-rss",
            Self::BingImages => "bing-images",
            Self::DuckDuckGoHtml => "duckduckgo",
        };
        f.write_str(name)
    }
}

impl FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bing-rss" | "bing" | "rss" => Ok(Self::BingRss),
            "bing-images" | "images" => Ok(Self::BingImages),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGoHtml),
            other => Err(format!("unknown search backend: {other}")),
        }
    }
}
