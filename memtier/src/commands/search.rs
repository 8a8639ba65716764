//! Semantic search across tiers.

use anyhow::{Context, Result};
use colored::Colorize;
use memtier_core::{EntryKind, MemtierConfig, QueryOptions, TieredResult};

use super::{tier_label, truncate};
use crate::cli::SearchCommand;

/// Execute search command.
pub async fn execute(cmd: SearchCommand, config: &MemtierConfig) -> Result<()> {
    let options = query_options(&cmd, config);

    let mut manager = super::open(config).await?;
    let results = manager
        .search(&cmd.query, &options)
        .await
        .context("Search failed")?;
    manager.flush().await.context("Failed to save access records")?;

    if cmd.json {
        return super::print_json(&results);
    }
    print_results(&cmd.query, &results);
    Ok(())
}

/// Translate command flags into query options, falling back to config defaults.
pub fn query_options(cmd: &SearchCommand, config: &MemtierConfig) -> QueryOptions {
    QueryOptions {
        k: cmd.k.unwrap_or(config.retrieval.k),
        tiers: (!cmd.tiers.is_empty()).then(|| cmd.tiers.clone()),
        kinds: (!cmd.kinds.is_empty())
            .then(|| cmd.kinds.iter().map(|k| EntryKind::from(k.as_str())).collect()),
        tags: (!cmd.tags.is_empty()).then(|| cmd.tags.clone()),
        role: cmd.role.clone(),
        min_score: cmd.min_score.unwrap_or(config.retrieval.min_score),
        track_access: !cmd.no_track,
    }
}

fn print_results(query: &str, results: &[TieredResult]) {
    if results.is_empty() {
        println!("{} No matches for \"{}\"", "○".dimmed(), query);
        return;
    }

    println!("{} ({} results)", "Search Results".cyan().bold(), results.len());
    println!();
    for result in results {
        println!(
            "  {:.3} [{}] {} {}",
            result.score,
            tier_label(result.tier),
            result.entry.id.bold(),
            format!("({})", result.entry.kind).dimmed()
        );
        println!("        {}", truncate(&result.entry.content, 72));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memtier_core::Tier;

    fn command() -> SearchCommand {
        SearchCommand {
            query: "heat".into(),
            k: None,
            tiers: vec![],
            kinds: vec![],
            tags: vec![],
            role: None,
            min_score: None,
            no_track: false,
            json: false,
        }
    }

    #[test]
    fn test_defaults_come_from_config() {
        let mut config = MemtierConfig::default();
        config.retrieval.k = 4;
        config.retrieval.min_score = 0.2;

        let options = query_options(&command(), &config);
        assert_eq!(options.k, 4);
        assert_eq!(options.min_score, 0.2);
        assert!(options.tiers.is_none());
        assert!(options.kinds.is_none());
        assert!(options.track_access);
    }

    #[test]
    fn test_flags_override_config() {
        let cmd = SearchCommand {
            k: Some(2),
            tiers: vec![Tier::Cold],
            kinds: vec!["lesson".into()],
            tags: vec!["db".into()],
            role: Some("planner".into()),
            min_score: Some(-1.0),
            no_track: true,
            ..command()
        };

        let options = query_options(&cmd, &MemtierConfig::default());
        assert_eq!(options.k, 2);
        assert_eq!(options.tiers, Some(vec![Tier::Cold]));
        assert_eq!(options.kinds, Some(vec![EntryKind::from("lesson")]));
        assert_eq!(options.tags, Some(vec!["db".to_string()]));
        assert_eq!(options.role.as_deref(), Some("planner"));
        assert_eq!(options.min_score, -1.0);
        assert!(!options.track_access);
    }
}
