//! Remove entries from every store.

use anyhow::{Context, Result};
use colored::Colorize;
use memtier_core::MemtierConfig;

/// Execute forget command.
pub async fn execute(ids: &[String], config: &MemtierConfig) -> Result<()> {
    let mut manager = super::open(config).await?;
    let removed = manager.forget(ids).await.context("Forget failed")?;
    manager.flush().await.context("Failed to save stores")?;

    if removed == 0 {
        println!("{} No matching entries", "○".dimmed());
    } else {
        println!("{} Forgot {} of {} entries", "✓".green(), removed, ids.len());
    }
    Ok(())
}
