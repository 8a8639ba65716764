//! Heat-weighted recall.

use anyhow::{Context, Result};
use colored::Colorize;
use memtier_core::{MemtierConfig, RankedResult, RecallOptions};

use super::{tier_label, truncate};
use crate::cli::RecallCommand;

/// Execute recall command.
pub async fn execute(cmd: RecallCommand, config: &MemtierConfig) -> Result<()> {
    let options = recall_options(&cmd, config);

    let mut manager = super::open(config).await?;
    let results = manager
        .recall(&cmd.query, &options)
        .await
        .context("Recall failed")?;
    manager.flush().await.context("Failed to save access records")?;

    if cmd.json {
        return super::print_json(&results);
    }
    print_results(&cmd.query, &results);
    Ok(())
}

pub fn recall_options(cmd: &RecallCommand, config: &MemtierConfig) -> RecallOptions {
    let mut options = RecallOptions::from_config(config);
    if let Some(k) = cmd.k {
        options.query.k = k;
    }
    if let Some(weight) = cmd.heat_weight {
        options.heat_weight = weight;
    }
    options.min_tier = cmd.min_tier;
    options.query.track_access = !cmd.no_track;
    options
}

fn print_results(query: &str, results: &[RankedResult]) {
    if results.is_empty() {
        println!("{} Nothing recalled for \"{}\"", "○".dimmed(), query);
        return;
    }

    println!("{} ({} results)", "Recall".cyan().bold(), results.len());
    println!();
    for result in results {
        let tier = result
            .tier
            .map(|t| tier_label(t).to_string())
            .unwrap_or_else(|| "-".dimmed().to_string());
        let heat = match (result.heat_score, result.heat_tier) {
            (Some(score), Some(heat_tier)) => format!("heat {:.2} {}", score, tier_label(heat_tier)),
            _ => "no heat".dimmed().to_string(),
        };

        println!(
            "  {:.3} [{}] {} {}",
            result.combined_score,
            tier,
            result.entry.id.bold(),
            format!("({})", result.entry.kind).dimmed()
        );
        println!("        semantic {:.3}, {}", result.semantic_score, heat);
        println!("        {}", truncate(&result.entry.content, 72));
    }
}
