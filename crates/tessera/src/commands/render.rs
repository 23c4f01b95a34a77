//! Print the root component's markup.

use anyhow::{Context, Result};
use tessera_server::{render_root, server_panel};

use crate::config::ConfigFile;

/// Run the render command.
pub async fn run(config: &ConfigFile) -> Result<()> {
    let markup = render_root(&server_panel(), config.data_delay())
        .await
        .context("Failed to render component")?;

    println!("{}", markup);
    Ok(())
}
