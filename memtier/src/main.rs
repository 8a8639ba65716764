//! memtier - Tiered Memory Cache CLI
//!
//! Indexes agent log entries into hot, warm and cold tiers, runs lifecycle
//! cycles and answers semantic and heat-weighted queries.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("memtier=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::load(cli.config.as_deref(), cli.data_dir.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Cycle(cmd) => commands::cycle::execute(cmd, &config).await,
        Commands::Search(cmd) => commands::search::execute(cmd, &config).await,
        Commands::Recall(cmd) => commands::recall::execute(cmd, &config).await,
        Commands::Stats { json } => commands::stats::execute(json, &config).await,
        Commands::Decay(cmd) => commands::decay::execute(cmd, &config).await,
        Commands::Forget { ids } => commands::forget::execute(&ids, &config).await,
        Commands::Version => {
            println!("memtier {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
