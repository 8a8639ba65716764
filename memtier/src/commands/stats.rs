//! Tier and heat statistics.

use anyhow::Result;
use colored::Colorize;
use memtier_core::{LifecycleStats, MemtierConfig, Tier};

use super::tier_label;

/// Execute stats command.
pub async fn execute(json: bool, config: &MemtierConfig) -> Result<()> {
    let manager = super::open(config).await?;
    let stats = manager.stats()?;

    if json {
        return super::print_json(&stats);
    }
    print_stats(config, &stats);
    Ok(())
}

fn print_stats(config: &MemtierConfig, stats: &LifecycleStats) {
    println!("{}", "Memory Cache".cyan().bold());
    println!("{}", "═".repeat(40));
    println!("Data dir:   {}", config.paths.data_dir.display());
    println!("Provider:   {} ({} dims)", stats.embedding_provider, stats.dimensions);
    println!("Last cycle: {}", stats.last_cycle);
    println!();

    println!("{}", "Vector Tiers".bold());
    for (tier, count) in [(Tier::Hot, stats.hot), (Tier::Warm, stats.warm), (Tier::Cold, stats.cold)] {
        println!("  {}: {}", tier_label(tier), count);
    }
    println!("  total: {}", stats.total);
    println!("  tracked {}, forgotten {}", stats.tracked, stats.forgotten);
    println!();

    let heat = &stats.heat;
    println!("{}", "Heat".bold());
    println!("  {} hot, {} warm, {} cold", heat.hot, heat.warm, heat.cold);
    println!(
        "  {} innate, {} learned, {} episodic",
        heat.innate, heat.learned, heat.episodic
    );
    println!(
        "  average heat {:.3}, average references {:.1}",
        heat.average_heat, heat.average_references
    );
}
