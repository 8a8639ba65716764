//! Heat scoring
//!
//! Heat is never stored. It is recomputed from a [`HeatEntry`] and the
//! current time:
//!
//! ```text
//! innate:  1.0
//! other:   min(0.99, importance × rate^days × (1 + bonus × (1 − e^(−refs/scale))))
//! ```
//!
//! `rate` depends on the memory class (episodic < learned), so episodic
//! entries cool faster. The reference bonus saturates, so each extra
//! reference is worth less than the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HeatConfig;
use crate::types::{MemoryClass, Tier};
use crate::utils::days_between;

/// Ceiling for decaying classes; only innate entries reach 1.0
pub const MAX_DECAYING_HEAT: f64 = 0.99;

/// Per-entry heat bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatEntry {
    pub id: String,
    pub memory_class: MemoryClass,
    pub base_importance: f64,
    pub reference_count: u64,
    pub last_accessed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Tier recorded by the last live decay pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tier: Option<Tier>,
}

impl HeatEntry {
    /// Fresh record with no references
    pub fn new(
        id: impl Into<String>,
        memory_class: MemoryClass,
        base_importance: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            memory_class,
            base_importance,
            reference_count: 0,
            last_accessed_at: now,
            created_at: now,
            last_tier: None,
        }
    }
}

impl HeatConfig {
    /// Daily retention factor for a class
    pub fn decay_rate(&self, class: MemoryClass) -> f64 {
        match class {
            MemoryClass::Innate => 1.0,
            MemoryClass::Learned => self.learned_decay_rate,
            MemoryClass::Episodic => self.episodic_decay_rate,
        }
    }

    /// Multiplier earned from `references` accesses, in `[1, 1 + max_reference_bonus)`
    pub fn reference_bonus(&self, references: u64) -> f64 {
        let scale = if self.reference_scale > 0.0 {
            self.reference_scale
        } else {
            1.0
        };
        1.0 + self.max_reference_bonus.max(0.0) * (1.0 - (-(references as f64) / scale).exp())
    }
}

/// Heat of `entry` at `now`, in `[0, 1]`
pub fn compute_heat(entry: &HeatEntry, config: &HeatConfig, now: DateTime<Utc>) -> f64 {
    if entry.memory_class == MemoryClass::Innate {
        return 1.0;
    }

    let importance = if entry.base_importance.is_nan() {
        0.0
    } else {
        entry.base_importance.clamp(0.0, 1.0)
    };

    let days = days_between(entry.last_accessed_at, now);
    let recency = config.decay_rate(entry.memory_class).powf(days);
    let score = importance * recency * config.reference_bonus(entry.reference_count);

    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_DECAYING_HEAT)
}

/// Tier for a heat score; a score exactly on a threshold takes the higher tier
pub fn classify(score: f64, config: &HeatConfig) -> Tier {
    if score >= config.hot_threshold {
        Tier::Hot
    } else if score >= config.warm_threshold {
        Tier::Warm
    } else {
        Tier::Cold
    }
}
