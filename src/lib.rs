//! Brand product gallery collector.
//!
//! Searches Bing or DuckDuckGo for retailer product pages that mention a brand,
//! keeps the relevant ones, collapses them to one tile per product style and
//! writes the JSON array the static gallery page reads.

pub mod config;
pub mod debug;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod gallery_finder;
pub mod models;
pub mod output;
pub mod parser;
pub mod query;
pub mod search;
pub mod traits;

pub use config::GalleryConfig;
pub use gallery_finder::{GalleryFinder, RunSummary};
