//! Heat-weighted retrieval
//!
//! Re-ranks semantic matches by blending similarity with heat:
//!
//! ```text
//! combined = (1 − w) × semantic + w × heat
//! ```
//!
//! Matches without a heat record keep `combined = semantic`.

use serde::Serialize;

use crate::error::Result;
use crate::heat::HeatStore;
use crate::types::{MemoryEntry, Tier};

/// Semantic match handed in for re-ranking
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub entry: MemoryEntry,
    /// Cached vector-store tier, if known
    pub tier: Option<Tier>,
    pub semantic_score: f64,
}

/// Re-ranking options
#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    /// Weight of heat in the combined score, clamped to [0, 1]
    pub heat_weight: f64,
    /// Drop matches whose current heat tier ranks below this
    pub min_tier: Option<Tier>,
    /// Count each returned match as one heat reference
    pub track_access: bool,
    /// Keep at most this many results
    pub limit: Option<usize>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            heat_weight: 0.4,
            min_tier: None,
            track_access: false,
            limit: None,
        }
    }
}

/// A re-ranked result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub entry: MemoryEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    pub semantic_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat_tier: Option<Tier>,
    pub combined_score: f64,
}

fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// Score, filter, sort and truncate without touching the heat store
pub fn rank_with_heat(
    matches: Vec<SemanticMatch>,
    heat: &HeatStore,
    options: &RetrievalOptions,
) -> Result<Vec<RankedResult>> {
    let weight = clamp_weight(options.heat_weight);

    let mut ranked = Vec::with_capacity(matches.len());
    for m in matches {
        let scored = heat.score(&m.entry.id)?;
        let (heat_score, heat_tier) = match &scored {
            Some(s) => (Some(s.heat), Some(s.tier)),
            None => (None, None),
        };

        if let (Some(min), Some(tier)) = (options.min_tier, heat_tier) {
            if !tier.at_least(min) {
                continue;
            }
        }

        let combined_score = match heat_score {
            Some(h) => (1.0 - weight) * m.semantic_score + weight * h,
            None => m.semantic_score,
        };

        ranked.push(RankedResult {
            entry: m.entry,
            tier: m.tier,
            semantic_score: m.semantic_score,
            heat_score,
            heat_tier,
            combined_score,
        });
    }

    ranked.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then_with(|| b.semantic_score.total_cmp(&a.semantic_score))
    });

    if let Some(limit) = options.limit {
        ranked.truncate(limit);
    }
    Ok(ranked)
}

/// Re-rank and, when asked, record one heat reference per returned result
pub async fn combine_with_heat(
    matches: Vec<SemanticMatch>,
    heat: &mut HeatStore,
    options: &RetrievalOptions,
) -> Result<Vec<RankedResult>> {
    let ranked = rank_with_heat(matches, heat, options)?;

    if options.track_access && !ranked.is_empty() {
        let ids: Vec<&str> = ranked.iter().map(|r| r.entry.id.as_str()).collect();
        heat.increment_many(&ids).await?;
    }

    Ok(ranked)
}
