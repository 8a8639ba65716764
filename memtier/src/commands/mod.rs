//! Command implementations for the memtier CLI.
//!
//! Each submodule implements the logic for one subcommand. Shared setup
//! (embedding provider, manager) lives here.

pub mod cycle;
pub mod decay;
pub mod forget;
pub mod recall;
pub mod search;
pub mod stats;

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use memtier_core::{
    EmbeddingBackend, EmbeddingProvider, EntrySource, HashingEmbeddingProvider, LifecycleManager,
    MemtierConfig, StaticEntrySource, Tier,
};

/// Build the embedding provider named in the config.
pub fn build_provider(config: &MemtierConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedding.provider {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbeddingProvider::new(
            config.embedding.dimensions,
        ))),
        #[cfg(feature = "embeddings")]
        EmbeddingBackend::Fastembed => Ok(Arc::new(memtier_core::FastEmbedProvider::new())),
        #[cfg(not(feature = "embeddings"))]
        EmbeddingBackend::Fastembed => anyhow::bail!(
            "embedding.provider = \"fastembed\" requires memtier built with --features embeddings"
        ),
    }
}

/// Open the manager with an explicit entry source.
pub async fn open_with_source(
    config: &MemtierConfig,
    source: Box<dyn EntrySource>,
) -> Result<LifecycleManager> {
    let provider = build_provider(config)?;
    LifecycleManager::open(config.clone(), provider, source)
        .await
        .with_context(|| {
            format!(
                "Failed to open memory cache at {}",
                config.paths.data_dir.display()
            )
        })
}

/// Open the manager for commands that never sync a log source.
pub async fn open(config: &MemtierConfig) -> Result<LifecycleManager> {
    open_with_source(config, Box::new(StaticEntrySource::default())).await
}

/// Colored tier label.
pub fn tier_label(tier: Tier) -> ColoredString {
    match tier {
        Tier::Hot => "hot".red(),
        Tier::Warm => "warm".yellow(),
        Tier::Cold => "cold".blue(),
    }
}

/// Shorten content for one-line display.
pub fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= max && !text.contains('\n') {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}
