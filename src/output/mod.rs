//! Gallery JSON output with an overwrite guard.
//!
//! The file is a bare array of `{retailer, product_url, image_url}` objects read
//! directly by the static gallery page. Filesystem errors are the only failures
//! allowed to abort a run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::OutputItem;

/// What happened to the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    /// The previous file was kept; holds the previous item count
    Preserved(usize),
}

pub struct OutputWriter {
    path: PathBuf,
    min_items: usize,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>, min_items: usize) -> Self {
        Self {
            path: path.into(),
            min_items,
        }
    }

    /// Writes `items`, unless the guard decides the previous file is better.
    ///
    /// Guard: an empty result never replaces an existing file, and a result below
    /// `min_items` never replaces an existing file holding more items. Without a
    /// previous file the result is always written.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, temp file or rename fails.
    pub async fn write(&self, items: &[OutputItem]) -> Result<WriteOutcome> {
        if let Some(previous) = self.previous_count().await {
            let too_small = items.len() < self.min_items && previous > items.len();
            if items.is_empty() || too_small {
                warn!(
                    "Keeping previous {} ({} items) instead of writing {} items",
                    self.path.display(),
                    previous,
                    items.len()
                );
                return Ok(WriteOutcome::Preserved(previous));
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(items).context("Failed to serialize gallery items")?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!("Wrote {} items to {}", items.len(), self.path.display());
        Ok(WriteOutcome::Written(items.len()))
    }

    /// Item count of the existing file; unreadable or malformed files count as 0
    async fn previous_count(&self) -> Option<usize> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<Vec<OutputItem>>(&raw) {
            Ok(items) => Some(items.len()),
            Err(e) => {
                warn!("Existing {} is not a gallery file: {}", self.path.display(), e);
                Some(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: usize) -> OutputItem {
        OutputItem {
            retailer: "next".to_string(),
            product_url: format!("https://www.next.co.uk/style/st{n}/a1"),
            image_url: format!("https://xcdn.next.co.uk/{n}.jpg"),
        }
    }

    fn items(count: usize) -> Vec<OutputItem> {
        (0..count).map(item).collect()
    }

    async fn read(path: &Path) -> Vec<OutputItem> {
        let raw = tokio::fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn writes_bare_array_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/products.json");
        let writer = OutputWriter::new(&path, 1);

        let outcome = writer.write(&items(2)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written(2));
        let raw: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert!(raw.is_array());
        assert_eq!(raw[0]["retailer"], "next");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn empty_result_preserves_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        let writer = OutputWriter::new(&path, 1);
        writer.write(&items(3)).await.unwrap();

        let outcome = writer.write(&[]).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Preserved(3));
        assert_eq!(read(&path).await.len(), 3);
    }

    #[tokio::test]
    async fn empty_result_is_written_when_no_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");

        let outcome = OutputWriter::new(&path, 5).write(&[]).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written(0));
        assert!(read(&path).await.is_empty());
    }

    #[tokio::test]
    async fn small_result_only_replaces_smaller_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        OutputWriter::new(&path, 1).write(&items(10)).await.unwrap();

        let writer = OutputWriter::new(&path, 5);
        assert_eq!(writer.write(&items(2)).await.unwrap(), WriteOutcome::Preserved(10));

        OutputWriter::new(&path, 1).write(&items(1)).await.unwrap();
        assert_eq!(writer.write(&items(2)).await.unwrap(), WriteOutcome::Written(2));
    }

    #[tokio::test]
    async fn malformed_previous_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let outcome = OutputWriter::new(&path, 5).write(&items(1)).await.unwrap();

        assert_eq!(outcome, WriteOutcome::Written(1));
    }

    #[tokio::test]
    async fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "file, not a directory").await.unwrap();

        let writer = OutputWriter::new(blocker.join("products.json"), 1);
        assert!(writer.write(&items(1)).await.is_err());
    }
}
