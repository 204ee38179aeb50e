use std::fs::File;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use gallery_finder::debug::DebugStore;
use gallery_finder::{GalleryConfig, GalleryFinder};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GalleryConfig::from_env();

    let debug_store = config.debug_dir.as_deref().map(DebugStore::create);
    let log_file = match &debug_store {
        Some(Ok(store)) => store.open_log().ok(),
        _ => None,
    };
    init_tracing(log_file);

    let debug_store = match debug_store {
        Some(Ok(store)) => Some(store),
        Some(Err(e)) => {
            warn!("Debug store disabled: {:#}", e);
            None
        }
        None => None,
    };

    info!("Starting gallery finder for '{}'", config.brand);

    let finder = GalleryFinder::new(config, debug_store)?;

    // Only output write failures get here; empty searches still exit 0
    let summary = finder.run().await?;
    info!("Finished with {} gallery items", summary.items);

    Ok(())
}

fn init_tracing(log_file: Option<File>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Arc::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
}
