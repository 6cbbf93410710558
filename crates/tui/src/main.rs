mod app;

use std::{
    fs::{self, OpenOptions},
    path::Path,
    sync::Mutex,
};

use anyhow::{Context, Result};
use snowseeker_core::{
    config::{self, AppConfig},
    Catalog, FavoritesStore, FileStore,
};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config.log_dir)?;
    info!(data_dir = %config.data_dir.display(), sort = ?config.default_sort, "Configuration loaded");

    let catalog = load_catalog(&config)?;
    let favorites = FavoritesStore::load(FileStore::new(&config.data_dir));
    info!(
        resorts = catalog.len(),
        favorites = favorites.len(),
        store = %favorites.storage().root().display(),
        "Startup complete"
    );

    let mut app = app::SnowSeekerApp::new(catalog, favorites, config.default_sort);
    app.run().await
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    let loaded = match &config.catalog_path {
        Some(path) => Catalog::from_path(path),
        None => Catalog::bundled(),
    };
    loaded
        .inspect_err(|err| error!(%err, "Resort catalog failed to load"))
        .context("resort catalog is unusable")
}

fn init_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("snowseeker.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal is in raw mode while the UI runs, so only the file layer is installed.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
