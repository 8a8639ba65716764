//! Heat decay pass.

use anyhow::{Context, Result};
use colored::Colorize;
use memtier_core::{DecayOptions, DecayReport, MemtierConfig};

use super::tier_label;
use crate::cli::DecayCommand;

/// Execute decay command.
pub async fn execute(cmd: DecayCommand, config: &MemtierConfig) -> Result<()> {
    let options = DecayOptions {
        archive_threshold: cmd.archive_threshold.or(config.heat.archive_threshold),
        dry_run: cmd.dry_run,
    };

    let mut manager = super::open(config).await?;
    let report = manager.decay(options).await.context("Decay failed")?;
    manager.flush().await.context("Failed to save stores")?;

    if cmd.json {
        return super::print_json(&report);
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &DecayReport) {
    let title = if report.dry_run {
        format!("{} {}", "Heat Decay".cyan().bold(), "(dry run)".yellow())
    } else {
        "Heat Decay".cyan().bold().to_string()
    };
    println!("{}", title);
    println!(
        "Evaluated {}: {} hot, {} warm, {} cold",
        report.evaluated, report.hot, report.warm, report.cold
    );

    if !report.transitions.is_empty() {
        println!();
        println!("{}", "Transitions".bold());
        for t in &report.transitions {
            println!(
                "  {} {} → {} (heat {:.3})",
                t.id,
                tier_label(t.from),
                tier_label(t.to),
                t.heat
            );
        }
    }

    if !report.first_classified.is_empty() {
        println!("{} {} newly classified", "+".green(), report.first_classified.len());
    }

    if !report.archived.is_empty() {
        let verb = if report.dry_run { "Would archive" } else { "Archived" };
        println!("{} {} {}", "✗".red(), verb, report.archived.len());
        for id in &report.archived {
            println!("    {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CycleCommand;
    use crate::commands::cycle;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_decay_on_empty_cache() {
        let temp = tempdir().expect("Failed to create temp dir");
        let config = MemtierConfig::default().with_data_dir(temp.path());

        execute(
            DecayCommand {
                dry_run: true,
                archive_threshold: Some(0.5),
                json: true,
            },
            &config,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_archive_persists_without_auto_save() {
        let temp = tempdir().expect("Failed to create temp dir");
        let source = temp.path().join("log.jsonl");
        std::fs::write(
            &source,
            r#"{"id":"s-1","kind":"status","content":"Waiting on review"}"#,
        )
        .unwrap();
        let mut config = MemtierConfig::default().with_data_dir(temp.path().join("data"));
        config.lifecycle.auto_save = false;

        cycle::execute(
            CycleCommand {
                source,
                cycle: Some(1),
                json: true,
            },
            &config,
        )
        .await
        .unwrap();

        execute(
            DecayCommand {
                dry_run: false,
                archive_threshold: Some(0.99),
                json: true,
            },
            &config,
        )
        .await
        .unwrap();

        let manager = crate::commands::open(&config).await.unwrap();
        assert_eq!(manager.vectors().count(), 0);
        assert!(!manager.heat().has("s-1").unwrap());
        assert!(!manager.tracker().contains("s-1"));
    }
}
