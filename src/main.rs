mod auth;
mod config;
mod db;
mod embedding;
mod error;
mod notes;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dossier", version, about = "Profile-scoped notes with semantic search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to a config file (defaults to ~/.dossier/config.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config: config_path } => {
            let config = match config_path {
                Some(path) => config::DossierConfig::load_from(path)?,
                None => config::DossierConfig::load()?,
            };

            let filter = EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();

            server::serve(config).await?;
        }
    }

    Ok(())
}
