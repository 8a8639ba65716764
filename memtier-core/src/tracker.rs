//! Importance Tracker
//!
//! Cycle-based bookkeeping that decides *when* entries migrate between
//! tiers. It counts lifecycle cycles, not wall-clock time, and is separate
//! from the heat store's weighting.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::LifecycleConfig;
use crate::error::{Error, Result};
use crate::types::Tier;
use crate::utils::{read_optional, write_atomic};

/// Current on-disk schema version
pub const TRACKER_SCHEMA_VERSION: u32 = 1;

/// Hot entries whose score falls to this value move to warm
///
/// The score halves every `hot_demotion_cycles` idle cycles, so it reaches
/// the floor after exactly that many cycles without access.
pub const HOT_RETENTION_FLOOR: f64 = 0.5;

/// Per-entry migration state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedRecord {
    pub created_cycle: u64,
    pub last_access_cycle: u64,
    pub access_count: u64,
    pub tier: Tier,
    pub tier_entered_cycle: u64,
    /// Recency as of the last advance, halving every `hot_demotion_cycles` idle cycles
    pub score: f64,
}

impl TrackedRecord {
    fn fresh(cycle: u64, tier: Tier) -> Self {
        Self {
            created_cycle: cycle,
            last_access_cycle: cycle,
            access_count: 0,
            tier,
            tier_entered_cycle: cycle,
            score: 1.0,
        }
    }

    /// Cycles since last access
    pub fn idle_cycles(&self, cycle: u64) -> u64 {
        cycle.saturating_sub(self.last_access_cycle)
    }

    /// Cycles spent in the current tier without access
    pub fn idle_in_tier(&self, cycle: u64) -> u64 {
        cycle.saturating_sub(self.tier_entered_cycle.max(self.last_access_cycle))
    }
}

/// Ids crossing a migration threshold this cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub to_warm: Vec<String>,
    pub to_cold: Vec<String>,
    pub to_hot: Vec<String>,
    pub forget: Vec<String>,
}

impl TransitionPlan {
    pub fn is_empty(&self) -> bool {
        self.to_warm.is_empty()
            && self.to_cold.is_empty()
            && self.to_hot.is_empty()
            && self.forget.is_empty()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackerDocumentRef<'a> {
    version: u32,
    last_cycle: u64,
    records: &'a IndexMap<String, TrackedRecord>,
    forgotten: &'a IndexMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerDocument {
    version: u32,
    #[serde(default)]
    last_cycle: u64,
    #[serde(default)]
    records: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    forgotten: IndexMap<String, String>,
}

/// Cycle-based migration timer
pub struct ImportanceTracker {
    path: Option<PathBuf>,
    last_cycle: u64,
    records: IndexMap<String, TrackedRecord>,
    /// Forgotten id -> fingerprint of the content that was forgotten
    forgotten: IndexMap<String, String>,
    dirty: bool,
}

impl ImportanceTracker {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            last_cycle: 0,
            records: IndexMap::new(),
            forgotten: IndexMap::new(),
            dirty: false,
        }
    }

    /// Open a file-backed tracker; unreadable documents start empty
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut tracker = Self {
            path: Some(path.clone()),
            ..Self::in_memory()
        };

        let Some(contents) = read_optional(&path).await? else {
            return Ok(tracker);
        };

        match serde_json::from_str::<TrackerDocument>(&contents) {
            Ok(doc) if doc.version == TRACKER_SCHEMA_VERSION => {
                tracker.last_cycle = doc.last_cycle;
                tracker.forgotten = doc.forgotten;
                for (id, value) in doc.records.iter() {
                    match serde_json::from_value::<TrackedRecord>(value.clone()) {
                        Ok(record) => {
                            tracker.records.insert(id.clone(), record);
                        }
                        Err(e) => {
                            let err = Error::malformed(format!("tracker record '{}'", id), e.to_string());
                            tracing::warn!("Skipping {}", err);
                        }
                    }
                }
                tracing::info!(
                    "Loaded {} tracker records from {} (last cycle {})",
                    tracker.records.len(),
                    path.display(),
                    tracker.last_cycle
                );
            }
            Ok(doc) => {
                let err = Error::SchemaVersionMismatch {
                    found: doc.version,
                    expected: TRACKER_SCHEMA_VERSION,
                };
                tracing::warn!("Discarding tracker at {}: {}", path.display(), err);
                tracker.dirty = true;
            }
            Err(e) => {
                tracing::warn!("Discarding tracker at {}: {}", path.display(), e);
                tracker.dirty = true;
            }
        }

        Ok(tracker)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Highest cycle passed to [`ImportanceTracker::advance`]
    pub fn last_cycle(&self) -> u64 {
        self.last_cycle
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, id: &str) -> Option<&TrackedRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Start (or restart) tracking an entry in the hot tier
    pub fn track(&mut self, id: &str, cycle: u64) {
        match self.records.get_mut(id) {
            Some(record) => {
                record.tier = Tier::Hot;
                record.tier_entered_cycle = cycle;
                record.last_access_cycle = record.last_access_cycle.max(cycle);
                record.score = 1.0;
            }
            None => {
                self.records.insert(id.to_string(), TrackedRecord::fresh(cycle, Tier::Hot));
            }
        }
        self.dirty = true;
    }

    /// Track an entry in its existing tier if it is not tracked yet
    pub fn adopt(&mut self, id: &str, tier: Tier, cycle: u64) -> bool {
        if self.records.contains_key(id) {
            return false;
        }
        self.records.insert(id.to_string(), TrackedRecord::fresh(cycle, tier));
        self.dirty = true;
        true
    }

    /// Note an access at `cycle`; `false` for untracked ids
    pub fn record_access(&mut self, id: &str, cycle: u64) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        record.access_count = record.access_count.saturating_add(1);
        record.last_access_cycle = record.last_access_cycle.max(cycle);
        self.dirty = true;
        true
    }

    /// Stop tracking; returns how many were tracked
    pub fn untrack<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let removed = ids
            .iter()
            .filter(|id| self.records.shift_remove(id.as_ref()).is_some())
            .count();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Remember that `id` was forgotten while holding `fingerprint`
    pub fn mark_forgotten(&mut self, id: &str, fingerprint: impl Into<String>) {
        self.records.shift_remove(id);
        self.forgotten.insert(id.to_string(), fingerprint.into());
        self.dirty = true;
    }

    /// Fingerprint recorded when `id` was forgotten
    pub fn forgotten_fingerprint(&self, id: &str) -> Option<&str> {
        self.forgotten.get(id).map(String::as_str)
    }

    /// Drop the forgotten marker, e.g. when the entry is superseded
    pub fn clear_forgotten(&mut self, id: &str) -> bool {
        let cleared = self.forgotten.shift_remove(id).is_some();
        if cleared {
            self.dirty = true;
        }
        cleared
    }

    pub fn forgotten_count(&self) -> usize {
        self.forgotten.len()
    }

    /// Recompute every score as of `cycle`
    pub fn advance(&mut self, cycle: u64, config: &LifecycleConfig) {
        let half_life = config.hot_demotion_cycles.max(1) as f64;
        for record in self.records.values_mut() {
            let idle = record.idle_cycles(cycle) as f64;
            record.score = 0.5f64.powf(idle / half_life);
        }
        self.last_cycle = self.last_cycle.max(cycle);
        self.dirty = true;
    }

    /// Decide which ids migrate at `cycle`, given their current tiers
    ///
    /// Hot demotion reads the scores from the latest
    /// [`ImportanceTracker::advance`]. Ids missing from `tiers` are skipped.
    pub fn evaluate(
        &self,
        cycle: u64,
        tiers: &HashMap<String, Tier>,
        config: &LifecycleConfig,
    ) -> TransitionPlan {
        let mut plan = TransitionPlan::default();

        for (id, record) in self.records.iter() {
            let Some(&tier) = tiers.get(id) else {
                continue;
            };

            match tier {
                Tier::Hot => {
                    if record.score <= HOT_RETENTION_FLOOR {
                        plan.to_warm.push(id.to_string());
                    }
                }
                Tier::Warm => {
                    // accessed since entering warm
                    if record.tier == Tier::Warm
                        && record.access_count > 0
                        && record.last_access_cycle >= record.tier_entered_cycle
                    {
                        plan.to_hot.push(id.to_string());
                    } else if record.idle_in_tier(cycle) >= config.warm_demotion_cycles {
                        plan.to_cold.push(id.to_string());
                    }
                }
                Tier::Cold => {
                    if record.idle_in_tier(cycle) >= config.cold_forget_cycles {
                        plan.forget.push(id.to_string());
                    }
                }
            }
        }

        plan
    }

    /// Record that `ids` moved to `tier` at `cycle`
    pub fn set_tier<S: AsRef<str>>(&mut self, ids: &[S], tier: Tier, cycle: u64) {
        for id in ids {
            if let Some(record) = self.records.get_mut(id.as_ref()) {
                if record.tier != tier {
                    record.tier = tier;
                    record.tier_entered_cycle = cycle;
                    if tier == Tier::Hot {
                        record.last_access_cycle = record.last_access_cycle.max(cycle);
                    }
                    self.dirty = true;
                }
            }
        }
    }

    /// Write the tracker document unconditionally
    pub async fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        let doc = TrackerDocumentRef {
            version: TRACKER_SCHEMA_VERSION,
            last_cycle: self.last_cycle,
            records: &self.records,
            forgotten: &self.forgotten,
        };
        let json = serde_json::to_vec_pretty(&doc)?;
        write_atomic(path, &json).await?;

        self.dirty = false;
        Ok(())
    }

    /// Save only if something changed
    pub async fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(hot: u64, warm: u64, forget: u64) -> LifecycleConfig {
        LifecycleConfig {
            hot_demotion_cycles: hot,
            warm_demotion_cycles: warm,
            cold_forget_cycles: forget,
            ..Default::default()
        }
    }

    fn tiers(tracker: &ImportanceTracker) -> HashMap<String, Tier> {
        tracker
            .ids()
            .into_iter()
            .map(|id| {
                let tier = tracker.get(&id).map(|r| r.tier).unwrap_or(Tier::Hot);
                (id, tier)
            })
            .collect()
    }

    fn step(tracker: &mut ImportanceTracker, cycle: u64, config: &LifecycleConfig) -> TransitionPlan {
        tracker.advance(cycle, config);
        let tiers = tiers(tracker);
        tracker.evaluate(cycle, &tiers, config)
    }

    #[test]
    fn test_hot_demotes_after_idle_cycles() {
        let config = config(2, 10, 30);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);

        assert!(step(&mut tracker, 1, &config).is_empty());
        let plan = step(&mut tracker, 3, &config);
        assert_eq!(plan.to_warm, vec!["a"]);
    }

    #[test]
    fn test_access_resets_hot_countdown() {
        let config = config(2, 10, 30);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.record_access("a", 2);

        assert!(step(&mut tracker, 3, &config).to_warm.is_empty());
        assert_eq!(step(&mut tracker, 4, &config).to_warm, vec!["a"]);
    }

    #[test]
    fn test_hot_demotion_reads_advanced_score() {
        let config = config(2, 10, 30);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);

        // fresh records score 1.0 until the next advance
        assert!(tracker.evaluate(5, &tiers(&tracker), &config).is_empty());

        tracker.advance(1, &config);
        assert!(tracker.get("a").unwrap().score > HOT_RETENTION_FLOOR);
        assert!(tracker.evaluate(1, &tiers(&tracker), &config).to_warm.is_empty());

        tracker.advance(2, &config);
        assert_eq!(tracker.get("a").unwrap().score, HOT_RETENTION_FLOOR);
        assert_eq!(tracker.evaluate(2, &tiers(&tracker), &config).to_warm, vec!["a"]);
    }

    #[test]
    fn test_warm_access_promotes() {
        let config = config(1, 5, 30);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.set_tier(&["a"], Tier::Warm, 2);

        assert!(step(&mut tracker, 3, &config).to_hot.is_empty());

        tracker.record_access("a", 3);
        let plan = step(&mut tracker, 4, &config);
        assert_eq!(plan.to_hot, vec!["a"]);
        assert!(plan.to_cold.is_empty());
    }

    #[test]
    fn test_warm_demotes_and_cold_forgets() {
        let config = config(1, 3, 4);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.set_tier(&["a"], Tier::Warm, 1);

        assert!(step(&mut tracker, 3, &config).to_cold.is_empty());
        assert_eq!(step(&mut tracker, 4, &config).to_cold, vec!["a"]);

        tracker.set_tier(&["a"], Tier::Cold, 4);
        assert!(step(&mut tracker, 7, &config).forget.is_empty());
        assert_eq!(step(&mut tracker, 8, &config).forget, vec!["a"]);
    }

    #[test]
    fn test_cold_access_delays_forgetting() {
        let config = config(1, 1, 3);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.set_tier(&["a"], Tier::Cold, 2);
        tracker.record_access("a", 4);

        let plan = step(&mut tracker, 6, &config);
        assert!(plan.forget.is_empty());
        assert!(plan.to_hot.is_empty());
        assert_eq!(step(&mut tracker, 7, &config).forget, vec!["a"]);
    }

    #[test]
    fn test_retrack_reenters_hot() {
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.set_tier(&["a"], Tier::Cold, 5);
        tracker.track("a", 9);

        let record = tracker.get("a").unwrap();
        assert_eq!(record.tier, Tier::Hot);
        assert_eq!(record.tier_entered_cycle, 9);
        assert_eq!(record.created_cycle, 0);
    }

    #[test]
    fn test_untracked_ids_skipped() {
        let config = config(1, 1, 1);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);

        let plan = tracker.evaluate(10, &HashMap::new(), &config);
        assert!(plan.is_empty());
        assert!(!tracker.record_access("ghost", 1));
        assert_eq!(tracker.untrack(&["a", "a"]), 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_advance_scores() {
        let config = config(2, 10, 30);
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("idle", 0);
        tracker.track("busy", 0);
        tracker.record_access("busy", 4);

        tracker.advance(4, &config);
        let idle = tracker.get("idle").unwrap().score;
        let busy = tracker.get("busy").unwrap().score;
        assert!((idle - 0.25).abs() < 1e-9);
        assert_eq!(busy, 1.0);
        assert_eq!(tracker.last_cycle(), 4);

        tracker.advance(2, &config);
        assert_eq!(tracker.last_cycle(), 4);
    }

    #[tokio::test]
    async fn test_save_and_reopen() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join("tracker.json");

        let mut tracker = ImportanceTracker::open(&path).await.unwrap();
        tracker.track("b", 1);
        tracker.track("a", 2);
        tracker.advance(3, &LifecycleConfig::default());
        assert!(tracker.flush().await.unwrap());

        tracker.track("gone", 2);
        tracker.mark_forgotten("gone", "abc123");
        tracker.save().await.unwrap();

        let reopened = ImportanceTracker::open(&path).await.unwrap();
        assert_eq!(reopened.ids(), vec!["b", "a"]);
        assert_eq!(reopened.forgotten_fingerprint("gone"), Some("abc123"));
        assert!(!reopened.contains("gone"));
        assert_eq!(reopened.last_cycle(), 3);
        assert_eq!(reopened.get("a"), tracker.get("a"));
    }

    #[test]
    fn test_forgotten_markers() {
        let mut tracker = ImportanceTracker::in_memory();
        tracker.track("a", 0);
        tracker.mark_forgotten("a", "fp");

        assert!(!tracker.contains("a"));
        assert_eq!(tracker.forgotten_fingerprint("a"), Some("fp"));
        assert_eq!(tracker.forgotten_count(), 1);
        assert!(tracker.clear_forgotten("a"));
        assert!(!tracker.clear_forgotten("a"));
        assert!(tracker.forgotten_fingerprint("a").is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch_starts_empty() {
        let temp = tempdir().expect("Failed to create temp dir");
        let path = temp.path().join("tracker.json");
        std::fs::write(&path, r#"{"version":7,"lastCycle":3,"records":{}}"#).unwrap();

        let tracker = ImportanceTracker::open(&path).await.unwrap();
        assert!(tracker.is_empty());
        assert_eq!(tracker.last_cycle(), 0);
    }
}
