//! Run one lifecycle cycle against a log file.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use memtier_core::{JsonEntrySource, LifecycleReport, MemtierConfig};

use crate::cli::CycleCommand;

/// Execute cycle command.
pub async fn execute(cmd: CycleCommand, config: &MemtierConfig) -> Result<()> {
    if !cmd.source.exists() {
        bail!("Source file not found: {}", cmd.source.display());
    }

    let source = JsonEntrySource::new(&cmd.source);
    let mut manager = super::open_with_source(config, Box::new(source)).await?;
    let cycle = cmd.cycle.unwrap_or_else(|| manager.current_cycle() + 1);

    let report = manager.run_cycle(cycle).await;
    manager.flush().await.context("Failed to save stores")?;

    if cmd.json {
        super::print_json(&report)?;
    } else {
        print_report(&report);
    }

    if !report.is_ok() {
        bail!("Cycle {} finished with {} error(s)", cycle, report.errors.len());
    }
    Ok(())
}

fn print_report(report: &LifecycleReport) {
    println!(
        "{} {} {}",
        "Cycle".cyan().bold(),
        report.cycle,
        report
            .timestamp
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();

    print_ids("Indexed", &report.newly_indexed, "+".green());
    print_ids("Reindexed", &report.reindexed, "~".cyan());
    print_ids("Promoted to hot", &report.promoted_to_hot, "↑".red());
    print_ids("Demoted to warm", &report.demoted_to_warm, "↓".yellow());
    print_ids("Demoted to cold", &report.demoted_to_cold, "↓".blue());
    print_ids("Forgotten", &report.forgotten, "✗".dimmed());

    if !report.has_changes() {
        println!("{} No changes", "○".dimmed());
    }

    for error in &report.errors {
        println!("{} {}", "✗".red(), error);
    }
    if report.is_ok() {
        println!("{} Cycle complete", "✓".green());
    }
}

fn print_ids(label: &str, ids: &[String], marker: colored::ColoredString) {
    if ids.is_empty() {
        return;
    }
    println!("{} {} ({})", marker, label, ids.len());
    for id in ids {
        println!("    {}", id);
    }
}
