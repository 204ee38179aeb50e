//! Diagnostic store for a single run: a timestamped log file and raw response snapshots.
//!
//! Nothing here is part of the output contract. Every write failure is logged and
//! swallowed so that troubleshooting aids can never fail a run.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DebugStore {
    run_dir: PathBuf,
    log_path: PathBuf,
    sequence: Arc<AtomicU32>,
}

impl DebugStore {
    /// Creates `<root>/run-<timestamp>/` and the path of the matching run log.
    ///
    /// # Errors
    ///
    /// Returns an error if the run directory cannot be created.
    pub fn create(root: &Path) -> Result<Self> {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
        let run_dir = root.join(format!("run-{stamp}"));
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create debug directory {}", run_dir.display()))?;

        Ok(Self {
            log_path: root.join(format!("run-{stamp}.log")),
            run_dir,
            sequence: Arc::new(AtomicU32::new(0)),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Opens the run log for the tracing file layer
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created.
    pub fn open_log(&self) -> Result<File> {
        File::create(&self.log_path)
            .with_context(|| format!("Failed to create run log {}", self.log_path.display()))
    }

    /// Persists a raw body as `<seq>-<md5(label)>-p<page>.html`
    pub async fn save_snapshot(&self, label: &str, page: u32, body: &str) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let name = format!("{seq:04}-{:x}-p{page}.html", md5::compute(label));
        let path = self.run_dir.join(name);

        match tokio::fs::write(&path, body).await {
            Ok(()) => debug!("Saved snapshot for '{}' to {}", label, path.display()),
            Err(e) => warn!("Failed to save snapshot {}: {}", path.display(), e),
        }
    }
}
