//! Entry Sources
//!
//! The lifecycle manager re-reads the full set of extracted entries at the
//! start of every cycle. Extraction itself happens elsewhere; a source only
//! hands over the current records.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::MemoryEntry;

/// Supplier of the current extracted entries
#[async_trait]
pub trait EntrySource: Send + Sync {
    /// Every entry as of now; ids are unique, later duplicates win
    async fn entries(&self) -> Result<Vec<MemoryEntry>>;

    /// Human-readable origin, for logs
    fn describe(&self) -> String;
}

/// In-memory source; clones share the same entry list
#[derive(Debug, Clone, Default)]
pub struct StaticEntrySource {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl StaticEntrySource {
    pub fn new(entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Replace the whole entry list
    pub async fn replace(&self, entries: Vec<MemoryEntry>) {
        *self.entries.write().await = entries;
    }

    /// Add or supersede one entry
    pub async fn upsert(&self, entry: MemoryEntry) {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}

#[async_trait]
impl EntrySource for StaticEntrySource {
    async fn entries(&self) -> Result<Vec<MemoryEntry>> {
        Ok(self.entries.read().await.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Entries read from a JSON array or JSON Lines file
#[derive(Debug, Clone)]
pub struct JsonEntrySource {
    path: PathBuf,
}

impl JsonEntrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, contents: &str) -> Result<Vec<MemoryEntry>> {
        if contents.trim_start().starts_with('[') {
            return serde_json::from_str(contents).map_err(|e| {
                Error::source(format!("{}: {}", self.path.display(), e))
            });
        }

        let mut entries = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    let err = Error::malformed(
                        format!("{} line {}", self.path.display(), index + 1),
                        e.to_string(),
                    );
                    tracing::warn!("Skipping source entry: {}", err);
                }
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl EntrySource for JsonEntrySource {
    async fn entries(&self) -> Result<Vec<MemoryEntry>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::source(format!("failed to read {}: {}", self.path.display(), e)))?;
        self.parse(&contents)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
