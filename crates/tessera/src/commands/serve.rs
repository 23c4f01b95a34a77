//! HTTP server command.

use anyhow::Result;
use tessera_server::AppServer;

use crate::config::ConfigFile;

/// Run the server.
pub async fn run(config: &ConfigFile, port: Option<u16>, open: bool) -> Result<()> {
    let mut server_config = config.server_config();
    if let Some(port) = port {
        server_config.port = port;
    }
    server_config.open |= open;

    tracing::info!("Starting server on port {}", server_config.port);

    AppServer::new(server_config).start().await?;

    Ok(())
}
