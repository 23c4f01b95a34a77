//! Initialize tessera in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{ConfigFile, DEFAULT_CONFIG};

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing tessera...");

    if config_path.exists() && !yes {
        tracing::warn!(
            "{} already exists. Use --yes to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    fs::write(config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    tracing::info!("Created {}", config_path.display());

    // Create the store directory next to the config
    let config = ConfigFile::load(config_path)?;
    let store_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(&config.store.dir);
    if !store_dir.exists() {
        fs::create_dir_all(&store_dir).context("Failed to create store directory")?;
        tracing::info!("Created {}", store_dir.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'tessera export' then 'tessera hydrate --click 1' to try it.");

    Ok(())
}
