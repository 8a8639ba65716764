//! CLI argument definitions using clap derive macros.
//!
//! Command structure for the tiered memory cache.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use memtier_core::Tier;

/// memtier - Tiered Memory Cache for Agent Logs
///
/// Indexes agent log entries into hot, warm and cold tiers and answers
/// semantic queries across them.
#[derive(Parser, Debug)]
#[command(name = "memtier")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config.toml (overrides MEMTIER_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory for the vector, heat and tracker files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one lifecycle cycle against a log source
    Cycle(CycleCommand),

    /// Semantic search across tiers
    Search(SearchCommand),

    /// Semantic search re-ranked by heat
    Recall(RecallCommand),

    /// Show tier and heat statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Recompute heat tiers and archive cold entries
    Decay(DecayCommand),

    /// Remove entries from every store
    Forget {
        /// Entry IDs to forget
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show version
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CycleCommand {
    /// JSON array or JSON Lines file of log entries
    #[arg(short, long)]
    pub source: PathBuf,

    /// Cycle number (defaults to the last recorded cycle + 1)
    #[arg(short, long)]
    pub cycle: Option<u64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DecayCommand {
    /// Report what would change without persisting
    #[arg(long)]
    pub dry_run: bool,

    /// Forget cold entries whose heat falls below this value
    #[arg(long)]
    pub archive_threshold: Option<f64>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Query Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Maximum number of results
    #[arg(short)]
    pub k: Option<usize>,

    /// Tiers to search (hot, warm, cold); repeatable
    #[arg(short, long = "tier")]
    pub tiers: Vec<Tier>,

    /// Entry kinds to include; repeatable
    #[arg(long = "kind")]
    pub kinds: Vec<String>,

    /// Required tags (all must match); repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Only entries written by this role
    #[arg(short, long)]
    pub role: Option<String>,

    /// Drop results scoring below this similarity
    #[arg(long, allow_hyphen_values = true)]
    pub min_score: Option<f32>,

    /// Do not record the search as an access
    #[arg(long)]
    pub no_track: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RecallCommand {
    /// Query text
    pub query: String,

    /// Maximum number of results
    #[arg(short)]
    pub k: Option<usize>,

    /// Weight of heat in the combined score (0.0 - 1.0)
    #[arg(long)]
    pub heat_weight: Option<f64>,

    /// Drop results whose heat tier ranks below this
    #[arg(long)]
    pub min_tier: Option<Tier>,

    /// Do not record the recall as an access
    #[arg(long)]
    pub no_track: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}
