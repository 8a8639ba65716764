//! Heat Store
//!
//! JSON Lines file with one [`HeatEntry`] per line, in write order. Every
//! accessor requires [`HeatStore::load`] first; nothing here silently
//! operates on an empty store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::score::{HeatEntry, classify, compute_heat};
use crate::config::HeatConfig;
use crate::error::{Error, Result};
use crate::types::{MemoryClass, Tier};
use crate::utils::{now_utc, read_optional, write_atomic};

const STORE_NAME: &str = "HeatStore";

/// Options for [`HeatStore::decay`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayOptions {
    /// Delete entries whose heat falls below this value
    pub archive_threshold: Option<f64>,
    /// Report only; leave the store untouched
    pub dry_run: bool,
}

/// One entry whose tier moved since the previous live decay pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierTransition {
    pub id: String,
    pub from: Tier,
    pub to: Tier,
    pub heat: f64,
}

/// Result of a decay pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayReport {
    pub evaluated: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub transitions: Vec<TierTransition>,
    /// Entries classified for the first time
    pub first_classified: Vec<String>,
    pub archived: Vec<String>,
    pub dry_run: bool,
}

/// An entry together with its current heat
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHeat {
    pub entry: HeatEntry,
    pub heat: f64,
    pub tier: Tier,
}

/// Aggregate heat statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatStats {
    pub total: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub innate: usize,
    pub learned: usize,
    pub episodic: usize,
    pub average_heat: f64,
    pub average_references: f64,
}

/// JSONL-backed heat records
pub struct HeatStore {
    path: Option<PathBuf>,
    config: HeatConfig,
    entries: Option<IndexMap<String, HeatEntry>>,
    dirty: bool,
}

impl HeatStore {
    /// File-backed store; call [`HeatStore::load`] before use
    pub fn new(path: impl Into<PathBuf>, config: HeatConfig) -> Self {
        Self {
            path: Some(path.into()),
            config,
            entries: None,
            dirty: false,
        }
    }

    /// Empty, already-loaded store that never touches disk
    pub fn in_memory(config: HeatConfig) -> Self {
        Self {
            path: None,
            config,
            entries: Some(IndexMap::new()),
            dirty: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &HeatConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read the JSONL file; a missing file loads as empty
    ///
    /// Returns the number of records loaded. Malformed lines are skipped.
    pub async fn load(&mut self) -> Result<usize> {
        let mut entries = IndexMap::new();

        let contents = match &self.path {
            Some(path) => read_optional(path).await?,
            None => None,
        };

        if let Some(contents) = contents {
            for (index, line) in contents.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HeatEntry>(line) {
                    Ok(entry) => {
                        entries.insert(entry.id.clone(), entry);
                    }
                    Err(e) => {
                        let err = Error::malformed(format!("line {}", index + 1), e.to_string());
                        tracing::warn!("Skipping heat record: {}", err);
                    }
                }
            }
        }

        let count = entries.len();
        if let Some(path) = &self.path {
            tracing::info!("Loaded {} heat records from {}", count, path.display());
        }
        self.entries = Some(entries);
        self.dirty = false;
        Ok(count)
    }

    fn loaded(&self) -> Result<&IndexMap<String, HeatEntry>> {
        self.entries
            .as_ref()
            .ok_or_else(|| Error::not_loaded(STORE_NAME))
    }

    fn loaded_mut(&mut self) -> Result<&mut IndexMap<String, HeatEntry>> {
        self.entries
            .as_mut()
            .ok_or_else(|| Error::not_loaded(STORE_NAME))
    }

    pub fn get(&self, id: &str) -> Result<Option<&HeatEntry>> {
        Ok(self.loaded()?.get(id))
    }

    pub fn has(&self, id: &str) -> Result<bool> {
        Ok(self.loaded()?.contains_key(id))
    }

    /// Insert or replace a record
    pub fn set(&mut self, entry: HeatEntry) -> Result<()> {
        self.loaded_mut()?.insert(entry.id.clone(), entry);
        self.dirty = true;
        Ok(())
    }

    /// Remove a record; `false` if it was absent
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let removed = self.loaded_mut()?.shift_remove(id).is_some();
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    /// Remove many records; returns how many existed
    pub fn delete_many<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            if self.delete(id.as_ref())? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Add a fresh record unless one already exists; `true` if inserted
    pub fn register(&mut self, id: &str, class: MemoryClass, importance: f64) -> Result<bool> {
        let now = now_utc();
        let entries = self.loaded_mut()?;
        if entries.contains_key(id) {
            return Ok(false);
        }
        entries.insert(id.to_string(), HeatEntry::new(id, class, importance, now));
        self.dirty = true;
        Ok(true)
    }

    /// Record one reference and persist; `None` if the id is unknown
    pub async fn increment(&mut self, id: &str) -> Result<Option<HeatEntry>> {
        let mut updated = self.increment_many(&[id]).await?;
        Ok(updated.pop())
    }

    /// Record one reference for each known id, persisting once
    pub async fn increment_many<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<Vec<HeatEntry>> {
        let now = now_utc();
        let entries = self.loaded_mut()?;

        let mut updated = Vec::new();
        for id in ids {
            if let Some(entry) = entries.get_mut(id.as_ref()) {
                entry.reference_count = entry.reference_count.saturating_add(1);
                entry.last_accessed_at = now;
                updated.push(entry.clone());
            }
        }

        if !updated.is_empty() {
            self.dirty = true;
            self.save().await?;
        }
        Ok(updated)
    }

    /// Current heat of one entry
    pub fn heat(&self, id: &str) -> Result<Option<f64>> {
        let now = now_utc();
        Ok(self
            .loaded()?
            .get(id)
            .map(|entry| compute_heat(entry, &self.config, now)))
    }

    /// Current heat and tier of one entry
    pub fn score(&self, id: &str) -> Result<Option<ScoredHeat>> {
        let now = now_utc();
        Ok(self.loaded()?.get(id).map(|entry| self.scored(entry, now)))
    }

    fn scored(&self, entry: &HeatEntry, now: DateTime<Utc>) -> ScoredHeat {
        let heat = compute_heat(entry, &self.config, now);
        ScoredHeat {
            entry: entry.clone(),
            heat,
            tier: classify(heat, &self.config),
        }
    }

    /// Entries currently in `tier`, hottest first
    pub fn get_by_tier(&self, tier: Tier) -> Result<Vec<ScoredHeat>> {
        let now = now_utc();
        let mut scored: Vec<ScoredHeat> = self
            .loaded()?
            .values()
            .map(|entry| self.scored(entry, now))
            .filter(|s| s.tier == tier)
            .collect();
        scored.sort_by(|a, b| b.heat.total_cmp(&a.heat));
        Ok(scored)
    }

    /// Reclassify every entry and report tier movement
    ///
    /// Transitions are measured against the tier each entry had at the last
    /// live pass. A dry run produces the same report without archiving or
    /// refreshing those snapshots.
    pub async fn decay(&mut self, options: DecayOptions) -> Result<DecayReport> {
        let now = now_utc();
        let mut report = DecayReport {
            dry_run: options.dry_run,
            ..Default::default()
        };
        let mut snapshots: Vec<(String, Tier)> = Vec::new();

        for entry in self.loaded()?.values() {
            let heat = compute_heat(entry, &self.config, now);
            let tier = classify(heat, &self.config);
            report.evaluated += 1;

            match tier {
                Tier::Hot => report.hot += 1,
                Tier::Warm => report.warm += 1,
                Tier::Cold => report.cold += 1,
            }

            match entry.last_tier {
                Some(from) if from != tier => {
                    tracing::debug!("Heat tier {} -> {} for {}", from, tier, entry.id);
                    report.transitions.push(TierTransition {
                        id: entry.id.clone(),
                        from,
                        to: tier,
                        heat,
                    });
                }
                Some(_) => {}
                None => report.first_classified.push(entry.id.clone()),
            }

            if options.archive_threshold.is_some_and(|t| heat < t) {
                report.archived.push(entry.id.clone());
            } else {
                snapshots.push((entry.id.clone(), tier));
            }
        }

        if options.dry_run {
            return Ok(report);
        }

        let entries = self.loaded_mut()?;
        for id in &report.archived {
            entries.shift_remove(id);
        }
        for (id, tier) in snapshots {
            if let Some(entry) = entries.get_mut(&id) {
                entry.last_tier = Some(tier);
            }
        }
        self.dirty = true;
        self.save().await?;

        tracing::info!(
            "Decay pass: {} evaluated, {} transitions, {} archived",
            report.evaluated,
            report.transitions.len(),
            report.archived.len()
        );
        Ok(report)
    }

    /// Counts by tier and class plus averages
    pub fn stats(&self) -> Result<HeatStats> {
        let now = now_utc();
        let entries = self.loaded()?;
        let mut stats = HeatStats {
            total: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            return Ok(stats);
        }

        let mut heat_sum = 0.0;
        let mut reference_sum = 0u64;
        for entry in entries.values() {
            let heat = compute_heat(entry, &self.config, now);
            heat_sum += heat;
            reference_sum = reference_sum.saturating_add(entry.reference_count);

            match classify(heat, &self.config) {
                Tier::Hot => stats.hot += 1,
                Tier::Warm => stats.warm += 1,
                Tier::Cold => stats.cold += 1,
            }
            match entry.memory_class {
                MemoryClass::Innate => stats.innate += 1,
                MemoryClass::Learned => stats.learned += 1,
                MemoryClass::Episodic => stats.episodic += 1,
            }
        }

        stats.average_heat = heat_sum / entries.len() as f64;
        stats.average_references = reference_sum as f64 / entries.len() as f64;
        Ok(stats)
    }

    /// Ids in write order
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.loaded()?.keys().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.loaded()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.loaded()?.is_empty())
    }

    /// Rewrite the JSONL file
    pub async fn save(&mut self) -> Result<()> {
        let entries = self.loaded()?;
        let Some(path) = &self.path else {
            self.dirty = false;
            return Ok(());
        };

        let mut out = String::new();
        for entry in entries.values() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        write_atomic(path, out.as_bytes()).await?;

        tracing::debug!("Saved {} heat records to {}", entries.len(), path.display());
        self.dirty = false;
        Ok(())
    }

    /// Save only if something changed since the last save
    pub async fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }
}
