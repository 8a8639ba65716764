//! Vector Store
//!
//! Brute-force cosine index over embedded memory entries, persisted as a
//! single JSON document. The document records the embedding provider that
//! produced the vectors; loading it with a different provider or
//! dimensionality discards the persisted state instead of mixing
//! incomparable vectors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::embedding::{ProviderInfo, cosine_similarity};
use crate::error::{Error, Result};
use crate::types::{MemoryEntry, SearchFilter, StoredVectorEntry, Tier};
use crate::utils::{now_utc, read_optional, write_atomic};

/// Current on-disk schema version
pub const VECTOR_SCHEMA_VERSION: u32 = 1;

/// An entry plus its embedding, as handed to [`VectorStore::upsert`]
#[derive(Debug, Clone)]
pub struct VectorUpsert {
    pub entry: MemoryEntry,
    pub vector: Vec<f32>,
}

impl VectorUpsert {
    pub fn new(entry: MemoryEntry, vector: Vec<f32>) -> Self {
        Self { entry, vector }
    }
}

/// Counts from one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Search behavior switches
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Stamp `lastAccessedAt` on returned entries
    pub track_access: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { track_access: true }
    }
}

impl SearchOptions {
    /// Search without touching access timestamps
    pub fn untracked() -> Self {
        Self {
            track_access: false,
        }
    }
}

/// A ranked search result
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub entry: StoredVectorEntry,
    pub score: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorDocumentRef<'a> {
    version: u32,
    embedding_provider: &'a str,
    dimensions: usize,
    last_modified: DateTime<Utc>,
    entry_count: usize,
    entries: &'a IndexMap<String, StoredVectorEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VectorDocument {
    version: u32,
    embedding_provider: String,
    dimensions: usize,
    #[serde(default)]
    entries: IndexMap<String, serde_json::Value>,
}

/// Similarity index keyed by entry id
pub struct VectorStore {
    provider: ProviderInfo,
    path: Option<PathBuf>,
    entries: IndexMap<String, StoredVectorEntry>,
    dirty: bool,
}

impl VectorStore {
    /// Create an empty store that is never written to disk
    pub fn in_memory(provider: ProviderInfo) -> Self {
        Self {
            provider,
            path: None,
            entries: IndexMap::new(),
            dirty: false,
        }
    }

    /// Open a file-backed store, loading any compatible persisted state
    pub async fn open(path: impl Into<PathBuf>, provider: ProviderInfo) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            provider,
            path: Some(path.clone()),
            entries: IndexMap::new(),
            dirty: false,
        };

        let Some(contents) = read_optional(&path).await? else {
            tracing::debug!("No vector store at {}, starting empty", path.display());
            return Ok(store);
        };

        match store.restore(&contents) {
            Ok(skipped) => {
                tracing::info!(
                    "Loaded {} vectors from {} ({} skipped)",
                    store.entries.len(),
                    path.display(),
                    skipped
                );
            }
            Err(e) => {
                tracing::warn!(
                    "Discarding vector store at {}: {}",
                    path.display(),
                    e
                );
                store.entries.clear();
                // the stale document is overwritten on the next flush
                store.dirty = true;
            }
        }

        Ok(store)
    }

    /// Replace in-memory state from a persisted document; returns skipped entry count
    fn restore(&mut self, contents: &str) -> Result<usize> {
        let doc: VectorDocument = serde_json::from_str(contents)?;

        if doc.version != VECTOR_SCHEMA_VERSION {
            return Err(Error::SchemaVersionMismatch {
                found: doc.version,
                expected: VECTOR_SCHEMA_VERSION,
            });
        }

        let stored = ProviderInfo::new(doc.embedding_provider, doc.dimensions);
        if !stored.compatible_with(&self.provider) {
            return Err(Error::ProviderMismatch {
                stored: stored.name,
                stored_dimensions: stored.dimensions,
                configured: self.provider.name.clone(),
                configured_dimensions: self.provider.dimensions,
            });
        }

        let mut skipped = 0;
        for (key, value) in doc.entries.iter() {
            match self.parse_entry(key, value) {
                Ok(entry) => {
                    self.entries.insert(key.clone(), entry);
                }
                Err(e) => {
                    tracing::warn!("Skipping vector entry: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok(skipped)
    }

    fn parse_entry(&self, key: &str, value: &serde_json::Value) -> Result<StoredVectorEntry> {
        let entry: StoredVectorEntry = serde_json::from_value(value.clone())
            .map_err(|e| Error::malformed(format!("entry '{}'", key), e.to_string()))?;

        if entry.id() != key {
            return Err(Error::malformed(
                format!("entry '{}'", key),
                format!("id field is '{}'", entry.id()),
            ));
        }
        if entry.vector.len() != self.provider.dimensions {
            return Err(Error::dimension_mismatch(
                key,
                self.provider.dimensions,
                entry.vector.len(),
            ));
        }

        Ok(entry)
    }

    /// Provider identity the vectors belong to
    pub fn provider(&self) -> &ProviderInfo {
        &self.provider
    }

    pub fn dimensions(&self) -> usize {
        self.provider.dimensions
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert or replace entries
    ///
    /// Every vector is validated before anything is written, so a single
    /// wrong-length or non-finite vector rejects the whole batch.
    pub fn upsert(&mut self, items: Vec<VectorUpsert>) -> Result<UpsertSummary> {
        for item in &items {
            if item.vector.len() != self.provider.dimensions {
                return Err(Error::dimension_mismatch(
                    &item.entry.id,
                    self.provider.dimensions,
                    item.vector.len(),
                ));
            }
            if item.vector.iter().any(|x| !x.is_finite()) {
                return Err(Error::embedding(format!(
                    "Vector for {} has non-finite components",
                    item.entry.id
                )));
            }
        }

        let now = now_utc();
        let mut summary = UpsertSummary::default();

        for VectorUpsert { entry, vector } in items {
            match self.entries.get_mut(&entry.id) {
                Some(existing) => {
                    existing.entry = entry;
                    existing.vector = vector;
                    summary.updated += 1;
                }
                None => {
                    let id = entry.id.clone();
                    self.entries.insert(
                        id,
                        StoredVectorEntry {
                            entry,
                            vector,
                            tier: Tier::Hot,
                            added_at: now,
                            last_accessed_at: None,
                        },
                    );
                    summary.inserted += 1;
                }
            }
        }

        if summary.inserted + summary.updated > 0 {
            self.dirty = true;
        }
        Ok(summary)
    }

    /// Top-`k` entries by cosine similarity among those passing `filter`
    ///
    /// Equal scores keep insertion order.
    pub fn search(
        &mut self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
        options: SearchOptions,
    ) -> Result<Vec<VectorHit>> {
        if query.len() != self.provider.dimensions {
            return Err(Error::dimension_mismatch(
                "<query>",
                self.provider.dimensions,
                query.len(),
            ));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .values()
            .enumerate()
            .filter(|(_, stored)| filter.matches(stored))
            .map(|(pos, stored)| (pos, cosine_similarity(query, &stored.vector)))
            .collect();

        // stable sort: ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        let ids: Vec<String> = scored
            .iter()
            .filter_map(|(pos, _)| self.entries.get_index(*pos).map(|(id, _)| id.clone()))
            .collect();

        if options.track_access && !ids.is_empty() {
            let now = now_utc();
            for id in &ids {
                if let Some(stored) = self.entries.get_mut(id) {
                    stored.last_accessed_at = Some(now);
                }
            }
            self.dirty = true;
        }

        Ok(ids
            .iter()
            .zip(scored.iter())
            .filter_map(|(id, (_, score))| {
                self.entries.get(id).map(|stored| VectorHit {
                    entry: stored.clone(),
                    score: *score,
                })
            })
            .collect())
    }

    /// Stamp `lastAccessedAt` on the given entries
    pub fn touch<S: AsRef<str>>(&mut self, ids: &[S]) {
        let now = now_utc();
        for id in ids {
            if let Some(stored) = self.entries.get_mut(id.as_ref()) {
                stored.last_accessed_at = Some(now);
                self.dirty = true;
            }
        }
    }

    /// Remove entries; missing ids are ignored. Returns the number removed.
    pub fn remove<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let removed = ids
            .iter()
            .filter(|id| self.entries.shift_remove(id.as_ref()).is_some())
            .count();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<&StoredVectorEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Ids in insertion order
    pub fn list_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Cached tier of one entry
    pub fn tier_of(&self, id: &str) -> Option<Tier> {
        self.entries.get(id).map(|stored| stored.tier)
    }

    /// Snapshot of every entry's cached tier
    pub fn tiers(&self) -> HashMap<String, Tier> {
        self.entries
            .iter()
            .map(|(id, stored)| (id.to_string(), stored.tier))
            .collect()
    }

    /// Entry counts per tier
    pub fn count_by_tier(&self) -> HashMap<Tier, usize> {
        let mut counts: HashMap<Tier, usize> = Tier::ALL.iter().map(|t| (*t, 0)).collect();
        for stored in self.entries.values() {
            *counts.entry(stored.tier).or_default() += 1;
        }
        counts
    }

    /// Move entries to `tier`; returns how many actually changed
    pub fn set_tier<S: AsRef<str>>(&mut self, ids: &[S], tier: Tier) -> usize {
        let mut changed = 0;
        for id in ids {
            if let Some(stored) = self.entries.get_mut(id.as_ref()) {
                if stored.tier != tier {
                    stored.tier = tier;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.dirty = true;
        }
        changed
    }

    /// Entries currently cached in `tier`, insertion order
    pub fn get_entries_by_tier(&self, tier: Tier) -> Vec<&StoredVectorEntry> {
        self.entries.values().filter(|s| s.tier == tier).collect()
    }

    /// Write the whole store unconditionally
    pub async fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return Ok(());
        };

        let doc = VectorDocumentRef {
            version: VECTOR_SCHEMA_VERSION,
            embedding_provider: &self.provider.name,
            dimensions: self.provider.dimensions,
            last_modified: now_utc(),
            entry_count: self.entries.len(),
            entries: &self.entries,
        };
        let json = serde_json::to_vec_pretty(&doc)?;
        write_atomic(&path, &json).await?;

        tracing::debug!("Saved {} vectors to {}", self.entries.len(), path.display());
        self.dirty = false;
        Ok(())
    }

    /// Write only if something changed since the last save
    pub async fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        self.save().await?;
        Ok(true)
    }
}
