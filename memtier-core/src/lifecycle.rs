//! Lifecycle Manager
//!
//! Drives entries through the tiers, one externally supplied cycle at a
//! time, and answers queries across tiers.
//!
//! ## Cycle
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          run_cycle(n)                             │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────┐ │
//! │  │   Sync   │─▶│ Advance  │─▶│ Evaluate │─▶│  Apply   │─▶│ Save │ │
//! │  │ entries  │  │ tracker  │  │ tracker  │  │ tiers    │  │      │ │
//! │  └──────────┘  └──────────┘  └──────────┘  └──────────┘  └──────┘ │
//! │        │                                         │                │
//! │        ▼                                         ▼                │
//! │   VectorStore ◀──────── HeatStore ────────▶ ImportanceTracker     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failing step is recorded in [`LifecycleReport::errors`] and the cycle
//! carries on with the remaining steps.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::config::MemtierConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::heat::{DecayOptions, DecayReport, HeatStats, HeatStore};
use crate::retrieval::{RankedResult, RetrievalOptions, SemanticMatch, combine_with_heat};
use crate::source::EntrySource;
use crate::tracker::ImportanceTracker;
use crate::types::{EntryKind, MemoryEntry, SearchFilter, Tier};
use crate::utils::now_utc;
use crate::vector_store::{SearchOptions, VectorStore, VectorUpsert};

/// Outcome of one lifecycle cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleReport {
    pub timestamp: DateTime<Utc>,
    pub cycle: u64,
    pub demoted_to_warm: Vec<String>,
    pub demoted_to_cold: Vec<String>,
    pub promoted_to_hot: Vec<String>,
    pub forgotten: Vec<String>,
    pub newly_indexed: Vec<String>,
    /// Superseded entries re-embedded with new content
    pub reindexed: Vec<String>,
    pub errors: Vec<String>,
}

impl LifecycleReport {
    fn new(cycle: u64) -> Self {
        Self {
            timestamp: now_utc(),
            cycle,
            demoted_to_warm: Vec::new(),
            demoted_to_cold: Vec::new(),
            promoted_to_hot: Vec::new(),
            forgotten: Vec::new(),
            newly_indexed: Vec::new(),
            reindexed: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Check if any entry changed state
    pub fn has_changes(&self) -> bool {
        !(self.demoted_to_warm.is_empty()
            && self.demoted_to_cold.is_empty()
            && self.promoted_to_hot.is_empty()
            && self.forgotten.is_empty()
            && self.newly_indexed.is_empty()
            && self.reindexed.is_empty())
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Cross-tier query options
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Maximum results
    pub k: usize,
    /// Tiers to search; `None` uses the configured defaults
    pub tiers: Option<Vec<Tier>>,
    pub kinds: Option<Vec<EntryKind>>,
    /// Entries must carry every tag
    pub tags: Option<Vec<String>>,
    pub role: Option<String>,
    /// Similarity cutoff applied after over-fetching
    pub min_score: f32,
    /// Count returned entries as accessed
    pub track_access: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            k: 10,
            tiers: None,
            kinds: None,
            tags: None,
            role: None,
            min_score: 0.0,
            track_access: true,
        }
    }
}

impl QueryOptions {
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_tiers(mut self, tiers: impl Into<Vec<Tier>>) -> Self {
        self.tiers = Some(tiers.into());
        self
    }

    pub fn untracked(mut self) -> Self {
        self.track_access = false;
        self
    }
}

/// Recall options: a query plus heat re-ranking
#[derive(Debug, Clone)]
pub struct RecallOptions {
    pub query: QueryOptions,
    pub heat_weight: f64,
    pub min_tier: Option<Tier>,
}

impl RecallOptions {
    /// Defaults taken from the retrieval section of `config`
    pub fn from_config(config: &MemtierConfig) -> Self {
        Self {
            query: QueryOptions {
                k: config.retrieval.k,
                min_score: config.retrieval.min_score,
                ..Default::default()
            },
            heat_weight: config.retrieval.heat_weight,
            min_tier: None,
        }
    }
}

/// A semantic match annotated with its current tier
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TieredResult {
    pub entry: MemoryEntry,
    pub tier: Tier,
    pub score: f32,
}

/// Snapshot of every store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStats {
    pub embedding_provider: String,
    pub dimensions: usize,
    pub total: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub tracked: usize,
    pub forgotten: usize,
    pub last_cycle: u64,
    pub heat: HeatStats,
}

/// Owns the three stores and moves entries between tiers
pub struct LifecycleManager {
    config: MemtierConfig,
    provider: Arc<dyn EmbeddingProvider>,
    source: Box<dyn EntrySource>,
    vectors: VectorStore,
    heat: HeatStore,
    tracker: ImportanceTracker,
}

impl LifecycleManager {
    /// Load every store from the configured data directory
    pub async fn open(
        config: MemtierConfig,
        provider: Arc<dyn EmbeddingProvider>,
        source: Box<dyn EntrySource>,
    ) -> Result<Self> {
        config.validate()?;

        let vectors = VectorStore::open(config.paths.vector_path(), provider.info()).await?;
        let mut heat = HeatStore::new(config.paths.heat_path(), config.heat.clone());
        heat.load().await?;
        let tracker = ImportanceTracker::open(config.paths.tracker_path()).await?;

        tracing::info!(
            "Opened memory cache at {} ({} entries, provider {})",
            config.paths.data_dir.display(),
            vectors.count(),
            provider.info()
        );

        Ok(Self {
            config,
            provider,
            source,
            vectors,
            heat,
            tracker,
        })
    }

    /// Manager whose stores never touch disk
    pub fn in_memory(
        config: MemtierConfig,
        provider: Arc<dyn EmbeddingProvider>,
        source: Box<dyn EntrySource>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            vectors: VectorStore::in_memory(provider.info()),
            heat: HeatStore::in_memory(config.heat.clone()),
            tracker: ImportanceTracker::in_memory(),
            config,
            provider,
            source,
        })
    }

    pub fn config(&self) -> &MemtierConfig {
        &self.config
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    pub fn heat(&self) -> &HeatStore {
        &self.heat
    }

    pub fn tracker(&self) -> &ImportanceTracker {
        &self.tracker
    }

    /// Most recent cycle seen
    pub fn current_cycle(&self) -> u64 {
        self.tracker.last_cycle()
    }

    /// Run one lifecycle cycle
    pub async fn run_cycle(&mut self, cycle: u64) -> LifecycleReport {
        let mut report = LifecycleReport::new(cycle);

        if cycle < self.tracker.last_cycle() {
            tracing::warn!(
                "Cycle {} is behind the last recorded cycle {}",
                cycle,
                self.tracker.last_cycle()
            );
        }

        // 1. Pick up new and superseded entries
        if let Err(e) = self.sync_entries(cycle, &mut report).await {
            tracing::warn!("Entry sync failed: {}", e);
            report.errors.push(format!("Sync failed: {}", e));
        }

        // 2. Advance tracker scores
        self.tracker.advance(cycle, &self.config.lifecycle);

        // 3. Decide migrations from the current tier membership
        let plan = self
            .tracker
            .evaluate(cycle, &self.vectors.tiers(), &self.config.lifecycle);

        // 4. Apply them
        self.apply_tier(&plan.to_warm, Tier::Warm, cycle);
        report.demoted_to_warm = plan.to_warm;

        self.apply_tier(&plan.to_cold, Tier::Cold, cycle);
        report.demoted_to_cold = plan.to_cold;

        self.apply_tier(&plan.to_hot, Tier::Hot, cycle);
        report.promoted_to_hot = plan.to_hot;

        match self.remove_everywhere(&plan.forget) {
            Ok(()) => report.forgotten = plan.forget,
            Err(e) => {
                tracing::warn!("Forgetting failed: {}", e);
                report.errors.push(format!("Forget failed: {}", e));
            }
        }

        // 5. Persist
        if self.config.lifecycle.auto_save {
            if let Err(e) = self.flush().await {
                tracing::warn!("Saving after cycle {} failed: {}", cycle, e);
                report.errors.push(format!("Save failed: {}", e));
            }
        }

        tracing::info!(
            "Cycle {}: {} indexed, {} reindexed, {} to warm, {} to cold, {} to hot, {} forgotten, {} errors",
            cycle,
            report.newly_indexed.len(),
            report.reindexed.len(),
            report.demoted_to_warm.len(),
            report.demoted_to_cold.len(),
            report.promoted_to_hot.len(),
            report.forgotten.len(),
            report.errors.len()
        );

        report
    }

    /// Embed and index new or superseded source entries
    async fn sync_entries(&mut self, cycle: u64, report: &mut LifecycleReport) -> Result<()> {
        let entries = self.source.entries().await?;
        tracing::debug!("Read {} entries from {}", entries.len(), self.source.describe());

        // later duplicates win
        let mut latest: IndexMap<String, MemoryEntry> = IndexMap::new();
        for entry in entries {
            latest.insert(entry.id.clone(), entry);
        }

        let mut fresh = Vec::new();
        let mut superseded = Vec::new();
        for entry in latest.values() {
            let fingerprint = entry.fingerprint();
            match self.vectors.get(&entry.id) {
                Some(stored) if stored.entry.fingerprint() == fingerprint => {}
                Some(_) => superseded.push(entry.clone()),
                None => match self.tracker.forgotten_fingerprint(&entry.id) {
                    Some(buried) if buried == fingerprint => {}
                    Some(_) => superseded.push(entry.clone()),
                    None => fresh.push(entry.clone()),
                },
            }
        }

        if !fresh.is_empty() || !superseded.is_empty() {
            let changed: Vec<MemoryEntry> = fresh.iter().chain(superseded.iter()).cloned().collect();
            let texts: Vec<String> = changed.iter().map(MemoryEntry::embedding_text).collect();
            let vectors = self.provider.embed_batch(&texts).await?;
            if vectors.len() != texts.len() {
                return Err(Error::embedding(format!(
                    "provider returned {} vectors for {} entries",
                    vectors.len(),
                    texts.len()
                )));
            }

            let items = changed
                .into_iter()
                .zip(vectors)
                .map(|(entry, vector)| VectorUpsert::new(entry, vector))
                .collect();
            self.vectors.upsert(items)?;

            for entry in fresh.iter().chain(superseded.iter()) {
                let policy = self.config.lifecycle.policy_for(&entry.kind);
                self.heat.register(&entry.id, policy.class, policy.importance)?;
                self.tracker.clear_forgotten(&entry.id);
                self.tracker.track(&entry.id, cycle);
            }

            let superseded_ids: Vec<&str> = superseded.iter().map(|e| e.id.as_str()).collect();
            self.vectors.set_tier(&superseded_ids, Tier::Hot);

            for entry in &superseded {
                tracing::debug!("Reindexed superseded entry {}", entry.id);
            }

            report.newly_indexed = fresh.into_iter().map(|e| e.id).collect();
            report.reindexed = superseded.into_iter().map(|e| e.id).collect();
        }

        // entries indexed by an earlier run but unknown to the tracker or heat store
        for id in self.vectors.list_ids() {
            if let Some(stored) = self.vectors.get(&id) {
                let tier = stored.tier;
                let policy = self.config.lifecycle.policy_for(&stored.entry.kind);
                if self.tracker.adopt(&id, tier, cycle) {
                    tracing::debug!("Adopted untracked entry {} in {}", id, tier);
                }
                self.heat.register(&id, policy.class, policy.importance)?;
            }
        }

        Ok(())
    }

    fn apply_tier(&mut self, ids: &[String], tier: Tier, cycle: u64) {
        if ids.is_empty() {
            return;
        }
        for id in ids {
            tracing::debug!("{} -> {}", id, tier);
        }
        self.vectors.set_tier(ids, tier);
        self.tracker.set_tier(ids, tier, cycle);
    }

    /// Delete from every store and leave a forgotten marker
    fn remove_everywhere(&mut self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.heat.delete_many(ids)?;
        for id in ids {
            if let Some(stored) = self.vectors.get(id) {
                let fingerprint = stored.entry.fingerprint();
                self.tracker.mark_forgotten(id, fingerprint);
            } else {
                self.tracker.untrack(&[id]);
            }
            tracing::debug!("Forgot {}", id);
        }
        self.vectors.remove(ids);
        Ok(())
    }

    /// Explicitly forget entries; returns how many existed
    pub async fn forget<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();

        let mut existing = HashSet::new();
        for id in &ids {
            if self.vectors.contains(id) || self.heat.has(id)? || self.tracker.contains(id) {
                existing.insert(id.clone());
            }
        }

        self.remove_everywhere(&ids)?;

        if self.config.lifecycle.auto_save {
            self.flush().await?;
        }
        Ok(existing.len())
    }

    /// Semantic search across tiers
    pub async fn search(&mut self, query: &str, options: &QueryOptions) -> Result<Vec<TieredResult>> {
        let mut results = self.candidates(query, options).await?;
        results.truncate(options.k);

        if options.track_access {
            let ids: Vec<String> = results
                .iter()
                .filter(|r| r.score > 0.0)
                .map(|r| r.entry.id.clone())
                .collect();
            if !ids.is_empty() {
                self.note_access(&ids);
                self.heat.increment_many(&ids).await?;
            }
        }

        Ok(results)
    }

    /// Search followed by heat-weighted re-ranking
    ///
    /// Heat re-ranking and `min_tier` see every over-fetched candidate; the
    /// cut to `k` happens afterwards.
    pub async fn recall(&mut self, query: &str, options: &RecallOptions) -> Result<Vec<RankedResult>> {
        let semantic = self.candidates(query, &options.query).await?;

        let matches = semantic
            .into_iter()
            .map(|r| SemanticMatch {
                entry: r.entry,
                tier: Some(r.tier),
                semantic_score: f64::from(r.score),
            })
            .collect();

        let retrieval = RetrievalOptions {
            heat_weight: options.heat_weight,
            min_tier: options.min_tier,
            track_access: false,
            limit: Some(options.query.k),
        };
        let ranked = combine_with_heat(matches, &mut self.heat, &retrieval).await?;

        if options.query.track_access {
            let ids: Vec<String> = ranked
                .iter()
                .filter(|r| r.semantic_score > 0.0)
                .map(|r| r.entry.id.clone())
                .collect();
            if !ids.is_empty() {
                self.note_access(&ids);
                self.heat.increment_many(&ids).await?;
            }
        }

        Ok(ranked)
    }

    /// Over-fetch `k × |tiers|` and cut by score; never records access
    ///
    /// A query that embeds to the zero vector matches nothing.
    async fn candidates(&mut self, query: &str, options: &QueryOptions) -> Result<Vec<TieredResult>> {
        if options.k == 0 {
            return Ok(Vec::new());
        }

        let tiers = match &options.tiers {
            Some(tiers) if !tiers.is_empty() => tiers.clone(),
            _ => self.config.lifecycle.default_search_tiers.clone(),
        };
        let fetch = options.k.saturating_mul(tiers.len().max(1));

        let filter = SearchFilter {
            kinds: options.kinds.clone(),
            tiers: Some(tiers),
            tags: options.tags.clone(),
            role: options.role.clone(),
        };

        let vector = self.provider.embed(query).await?;
        if vector.iter().all(|x| *x == 0.0) {
            tracing::debug!("Query {:?} has no embeddable terms", query);
            return Ok(Vec::new());
        }

        let hits = self
            .vectors
            .search(&vector, fetch, &filter, SearchOptions::untracked())?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.score >= options.min_score)
            .map(|hit| TieredResult {
                tier: hit.entry.tier,
                entry: hit.entry.entry,
                score: hit.score,
            })
            .collect())
    }

    /// Stamp vector access time and tracker access at the current cycle
    fn note_access(&mut self, ids: &[String]) {
        let cycle = self.current_cycle();
        self.vectors.touch(ids);
        for id in ids {
            self.tracker.record_access(id, cycle);
        }
    }

    /// Heat decay pass; archived entries leave every store
    pub async fn decay(&mut self, options: DecayOptions) -> Result<DecayReport> {
        let report = self.heat.decay(options).await?;

        if !options.dry_run && !report.archived.is_empty() {
            self.remove_everywhere(&report.archived)?;
            if self.config.lifecycle.auto_save {
                self.flush().await?;
            }
        }

        Ok(report)
    }

    pub fn stats(&self) -> Result<LifecycleStats> {
        let counts = self.vectors.count_by_tier();
        let count = |tier: Tier| counts.get(&tier).copied().unwrap_or(0);

        Ok(LifecycleStats {
            embedding_provider: self.vectors.provider().name.clone(),
            dimensions: self.vectors.dimensions(),
            total: self.vectors.count(),
            hot: count(Tier::Hot),
            warm: count(Tier::Warm),
            cold: count(Tier::Cold),
            tracked: self.tracker.len(),
            forgotten: self.tracker.forgotten_count(),
            last_cycle: self.tracker.last_cycle(),
            heat: self.heat.stats()?,
        })
    }

    /// Persist whatever changed
    pub async fn flush(&mut self) -> Result<()> {
        self.vectors.flush().await?;
        self.heat.flush().await?;
        self.tracker.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingProvider;
    use crate::source::StaticEntrySource;
    use crate::types::MemoryClass;
    use async_trait::async_trait;
    use tempfile::tempdir;

    fn entries() -> Vec<MemoryEntry> {
        vec![
            MemoryEntry::new("d-1", "decision", "Store heat records as JSON lines"),
            MemoryEntry::new("s-1", "status", "Migration of the vector index is in progress")
                .with_role("backend"),
            MemoryEntry::new("l-1", "lesson", "Always pin the embedding provider version")
                .with_tag("embeddings"),
        ]
    }

    fn config(hot: u64, warm: u64, forget: u64) -> MemtierConfig {
        let mut config = MemtierConfig::default();
        config.embedding.dimensions = 64;
        config.lifecycle.hot_demotion_cycles = hot;
        config.lifecycle.warm_demotion_cycles = warm;
        config.lifecycle.cold_forget_cycles = forget;
        config
    }

    fn manager(config: MemtierConfig) -> (LifecycleManager, StaticEntrySource) {
        let source = StaticEntrySource::new(entries());
        let provider = Arc::new(HashingEmbeddingProvider::new(config.embedding.dimensions));
        let manager =
            LifecycleManager::in_memory(config, provider, Box::new(source.clone())).unwrap();
        (manager, source)
    }

    struct FailingSource;

    #[async_trait]
    impl EntrySource for FailingSource {
        async fn entries(&self) -> Result<Vec<MemoryEntry>> {
            Err(Error::source("extractor unavailable"))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    #[tokio::test]
    async fn test_first_cycle_indexes_everything_hot() {
        let (mut manager, _) = manager(config(3, 10, 30));
        let report = manager.run_cycle(0).await;

        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(report.newly_indexed, vec!["d-1", "s-1", "l-1"]);
        assert_eq!(manager.vectors().count(), 3);
        assert_eq!(manager.vectors().get_entries_by_tier(Tier::Hot).len(), 3);

        let decision = manager.heat().get("d-1").unwrap().unwrap();
        assert_eq!(decision.memory_class, MemoryClass::Learned);
        let status = manager.heat().get("s-1").unwrap().unwrap();
        assert_eq!(status.memory_class, MemoryClass::Episodic);

        let again = manager.run_cycle(1).await;
        assert!(again.newly_indexed.is_empty());
        assert!(again.reindexed.is_empty());
    }

    #[tokio::test]
    async fn test_hot_demotion_after_idle_cycles() {
        let (mut manager, _) = manager(config(2, 10, 30));
        manager.run_cycle(0).await;

        let report = manager.run_cycle(3).await;
        assert_eq!(report.demoted_to_warm, vec!["d-1", "s-1", "l-1"]);
        assert_eq!(manager.vectors().tier_of("d-1"), Some(Tier::Warm));
    }

    #[tokio::test]
    async fn test_full_lifecycle_until_forgotten() {
        let (mut manager, _) = manager(config(1, 1, 1));
        manager.run_cycle(0).await;

        assert_eq!(manager.run_cycle(1).await.demoted_to_warm.len(), 3);
        assert_eq!(manager.run_cycle(2).await.demoted_to_cold.len(), 3);

        let report = manager.run_cycle(3).await;
        assert_eq!(report.forgotten, vec!["d-1", "s-1", "l-1"]);
        assert_eq!(manager.vectors().count(), 0);
        assert!(manager.heat().is_empty().unwrap());
        assert!(manager.tracker().is_empty());

        // forgetting is terminal while the content is unchanged
        let after = manager.run_cycle(4).await;
        assert!(after.newly_indexed.is_empty());
        assert_eq!(manager.vectors().count(), 0);
    }

    #[tokio::test]
    async fn test_superseded_entry_reenters_hot() {
        let (mut manager, source) = manager(config(1, 10, 30));
        manager.run_cycle(0).await;
        manager.run_cycle(1).await;
        assert_eq!(manager.vectors().tier_of("d-1"), Some(Tier::Warm));

        source
            .upsert(MemoryEntry::new("d-1", "decision", "Store heat records in SQLite instead"))
            .await;
        let report = manager.run_cycle(2).await;

        assert_eq!(report.reindexed, vec!["d-1"]);
        assert!(!report.demoted_to_warm.contains(&"d-1".to_string()));
        let stored = manager.vectors().get("d-1").unwrap();
        assert_eq!(stored.tier, Tier::Hot);
        assert!(stored.entry.content.contains("SQLite"));
    }

    #[tokio::test]
    async fn test_forgotten_entry_returns_when_superseded() {
        let (mut manager, source) = manager(config(1, 1, 1));
        for cycle in 0..=3 {
            manager.run_cycle(cycle).await;
        }
        assert!(!manager.vectors().contains("l-1"));

        source
            .upsert(MemoryEntry::new("l-1", "lesson", "Pin the provider and record its dimensions"))
            .await;
        let report = manager.run_cycle(4).await;
        assert_eq!(report.reindexed, vec!["l-1"]);
        assert_eq!(manager.vectors().tier_of("l-1"), Some(Tier::Hot));
    }

    #[tokio::test]
    async fn test_warm_access_promotes_next_cycle() {
        let (mut manager, _) = manager(config(1, 10, 30));
        manager.run_cycle(0).await;
        manager.run_cycle(1).await;

        let results = manager
            .search(
                "heat records as JSON lines",
                &QueryOptions::default().with_k(1).with_tiers([Tier::Warm]),
            )
            .await
            .unwrap();
        assert_eq!(results[0].entry.id, "d-1");
        assert_eq!(results[0].tier, Tier::Warm);

        let report = manager.run_cycle(2).await;
        assert_eq!(report.promoted_to_hot, vec!["d-1"]);
        assert_eq!(manager.vectors().tier_of("d-1"), Some(Tier::Hot));
    }

    #[tokio::test]
    async fn test_failed_sync_still_runs_migrations() {
        let config = config(1, 10, 30);
        let provider = Arc::new(HashingEmbeddingProvider::new(64));
        let mut manager = LifecycleManager::in_memory(
            config.clone(),
            provider.clone(),
            Box::new(StaticEntrySource::new(entries())),
        )
        .unwrap();
        manager.run_cycle(0).await;

        manager.source = Box::new(FailingSource);
        let report = manager.run_cycle(1).await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("extractor unavailable"));
        assert_eq!(report.demoted_to_warm.len(), 3);
        assert_eq!(manager.vectors().count(), 3);
    }

    #[tokio::test]
    async fn test_search_defaults_exclude_cold() {
        let (mut manager, _) = manager(config(1, 1, 30));
        manager.run_cycle(0).await;
        manager.run_cycle(1).await;
        manager.run_cycle(2).await;
        assert_eq!(manager.vectors().get_entries_by_tier(Tier::Cold).len(), 3);

        let default = manager
            .search("embedding provider", &QueryOptions::default().untracked())
            .await
            .unwrap();
        assert!(default.is_empty());

        let cold = manager
            .search(
                "embedding provider",
                &QueryOptions::default().with_tiers([Tier::Cold]).untracked(),
            )
            .await
            .unwrap();
        assert!(!cold.is_empty());
        assert_eq!(cold[0].entry.id, "l-1");
        assert!(cold.iter().all(|r| r.tier == Tier::Cold));
    }

    #[tokio::test]
    async fn test_search_filters_and_min_score() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        let options = QueryOptions {
            role: Some("backend".into()),
            ..QueryOptions::default().untracked()
        };
        let by_role = manager.search("vector index", &options).await.unwrap();
        assert_eq!(by_role.len(), 1);
        assert_eq!(by_role[0].entry.id, "s-1");

        let strict = QueryOptions {
            min_score: 0.99,
            ..QueryOptions::default().untracked()
        };
        assert!(manager.search("unrelated words", &strict).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_tracks_access() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        manager
            .search("JSON lines", &QueryOptions::default().with_k(1))
            .await
            .unwrap();

        let heat = manager.heat().get("d-1").unwrap().unwrap();
        assert_eq!(heat.reference_count, 1);
        assert_eq!(manager.tracker().get("d-1").unwrap().access_count, 1);
        assert!(manager.vectors().get("d-1").unwrap().last_accessed_at.is_some());
        assert_eq!(manager.heat().get("s-1").unwrap().unwrap().reference_count, 0);
    }

    #[tokio::test]
    async fn test_recall_ranks_with_heat() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        let options = RecallOptions {
            query: QueryOptions {
                min_score: -1.0,
                ..QueryOptions::default().with_k(2)
            },
            heat_weight: 0.4,
            min_tier: None,
        };
        let ranked = manager.recall("pin the embedding provider", &options).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entry.id, "l-1");
        assert!(ranked.iter().all(|r| r.heat_score.is_some()));
        assert!(ranked[0].combined_score >= ranked[1].combined_score);

        for r in &ranked {
            let heat = manager.heat().get(&r.entry.id).unwrap().unwrap();
            let expected = if r.semantic_score > 0.0 { 1 } else { 0 };
            assert_eq!(heat.reference_count, expected);
        }
    }

    #[tokio::test]
    async fn test_blank_query_matches_nothing() {
        let (mut manager, _) = manager(config(1, 10, 30));
        manager.run_cycle(0).await;
        manager.run_cycle(1).await;
        assert_eq!(manager.vectors().get_entries_by_tier(Tier::Warm).len(), 3);

        for query in ["   ", "", "?!..."] {
            let hits = manager.search(query, &QueryOptions::default()).await.unwrap();
            assert!(hits.is_empty(), "{:?} returned {:?}", query, hits);
        }
        let recall_options = RecallOptions::from_config(manager.config());
        let recalled = manager.recall("   ", &recall_options).await.unwrap();
        assert!(recalled.is_empty());

        let report = manager.run_cycle(2).await;
        assert!(report.promoted_to_hot.is_empty());
        assert_eq!(manager.tracker().get("d-1").unwrap().access_count, 0);
    }

    #[tokio::test]
    async fn test_zero_score_hits_are_not_accessed() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        let options = QueryOptions {
            min_score: -1.0,
            ..QueryOptions::default()
        };
        let hits = manager.search("JSON lines", &options).await.unwrap();
        assert_eq!(hits.len(), 3);

        for hit in &hits {
            let accessed = manager.tracker().get(&hit.entry.id).unwrap().access_count;
            assert_eq!(accessed > 0, hit.score > 0.0, "{} scored {}", hit.entry.id, hit.score);
        }
    }

    #[tokio::test]
    async fn test_recall_min_tier_fills_k_from_candidates() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        // only l-1 stays hot by heat; the others fall to cold
        let stale = chrono::Utc::now() - chrono::Duration::days(120);
        for id in ["d-1", "s-1"] {
            let mut entry = manager.heat().get(id).unwrap().unwrap().clone();
            entry.last_accessed_at = stale;
            manager.heat.set(entry).unwrap();
        }
        let mut core = manager.heat().get("l-1").unwrap().unwrap().clone();
        core.memory_class = MemoryClass::Innate;
        manager.heat.set(core).unwrap();

        let options = RecallOptions {
            query: QueryOptions {
                min_score: -1.0,
                ..QueryOptions::default().with_k(1).with_tiers(Tier::ALL).untracked()
            },
            heat_weight: 0.4,
            min_tier: Some(Tier::Hot),
        };
        // "JSON lines" ranks d-1 first semantically, but d-1 is cold
        let ranked = manager.recall("heat records as JSON lines", &options).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].entry.id, "l-1");
    }

    #[tokio::test]
    async fn test_forget_is_idempotent() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        assert_eq!(manager.forget(&["s-1"]).await.unwrap(), 1);
        assert_eq!(manager.forget(&["s-1", "missing"]).await.unwrap(), 0);

        assert!(!manager.vectors().contains("s-1"));
        assert!(!manager.heat().has("s-1").unwrap());
        assert!(!manager.tracker().contains("s-1"));
        assert_eq!(manager.vectors().count(), 2);
    }

    #[tokio::test]
    async fn test_decay_archives_across_stores() {
        let (mut manager, _) = manager(config(3, 10, 30));
        manager.run_cycle(0).await;

        let report = manager
            .decay(DecayOptions {
                archive_threshold: Some(0.55),
                dry_run: true,
            })
            .await
            .unwrap();
        assert_eq!(report.archived, vec!["s-1"]);
        assert!(manager.vectors().contains("s-1"));

        let report = manager
            .decay(DecayOptions {
                archive_threshold: Some(0.55),
                dry_run: false,
            })
            .await
            .unwrap();
        assert_eq!(report.archived, vec!["s-1"]);
        assert!(!manager.vectors().contains("s-1"));
        assert!(!manager.tracker().contains("s-1"));
    }

    #[tokio::test]
    async fn test_stats() {
        let (mut manager, _) = manager(config(1, 10, 30));
        manager.run_cycle(0).await;
        manager.run_cycle(1).await;

        let stats = manager.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.warm, 3);
        assert_eq!(stats.hot, 0);
        assert_eq!(stats.tracked, 3);
        assert_eq!(stats.last_cycle, 1);
        assert_eq!(stats.heat.total, 3);
        assert_eq!(stats.dimensions, 64);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp = tempdir().expect("Failed to create temp dir");
        let config = config(1, 10, 30).with_data_dir(temp.path());
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::new(64));

        {
            let mut manager = LifecycleManager::open(
                config.clone(),
                provider.clone(),
                Box::new(StaticEntrySource::new(entries())),
            )
            .await
            .unwrap();
            manager.run_cycle(0).await;
            manager.run_cycle(1).await;
        }

        let mut reopened = LifecycleManager::open(
            config,
            provider,
            Box::new(StaticEntrySource::new(entries())),
        )
        .await
        .unwrap();
        assert_eq!(reopened.vectors().count(), 3);
        assert_eq!(reopened.vectors().tier_of("d-1"), Some(Tier::Warm));
        assert_eq!(reopened.current_cycle(), 1);
        assert_eq!(reopened.heat().len().unwrap(), 3);

        let report = reopened.run_cycle(2).await;
        assert!(report.newly_indexed.is_empty());
        assert!(report.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = config(3, 10, 30);
        config.heat.warm_threshold = 0.95;
        let provider = Arc::new(HashingEmbeddingProvider::new(64));
        let result =
            LifecycleManager::in_memory(config, provider, Box::new(StaticEntrySource::default()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
