//! Tessera CLI - serialize component trees and hydrate them elsewhere.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::ConfigFile;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Serialize component trees to markup and hydrate them elsewhere")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to tessera.toml config file
    #[arg(short, long, default_value = "tessera.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default tessera.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        yes: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open browser on start
        #[arg(long)]
        open: bool,
    },

    /// Print the root component's markup
    Render,

    /// Serialize the counter into a store slot
    Export {
        /// Slot to write (defaults to config)
        #[arg(short, long)]
        slot: Option<String>,
    },

    /// Hydrate a stored envelope and interact with it
    Hydrate {
        /// Slot to read (defaults to config)
        #[arg(short, long)]
        slot: Option<String>,

        /// Override prop, as key=value (value parsed as JSON when possible)
        #[arg(long = "prop", value_name = "KEY=VALUE")]
        props: Vec<String>,

        /// Number of clicks to dispatch
        #[arg(long, default_value = "0")]
        click: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Logs go to stderr so markup on stdout stays clean
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.config, yes).await?;
        }
        Commands::Serve { port, open } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::serve::run(&config, port, open).await?;
        }
        Commands::Render => {
            let config = ConfigFile::load(&cli.config)?;
            commands::render::run(&config).await?;
        }
        Commands::Export { slot } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::export::run(&config, slot).await?;
        }
        Commands::Hydrate { slot, props, click } => {
            let config = ConfigFile::load(&cli.config)?;
            commands::hydrate::run(&config, slot, &props, click).await?;
        }
    }

    Ok(())
}
