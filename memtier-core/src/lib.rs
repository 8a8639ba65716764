//! memtier - Tiered Semantic Memory for Agent Logs
//!
//! Keeps a growing set of short agent log records (decisions, lessons,
//! status updates, role states) searchable by meaning while bounding recall
//! cost. Entries live in one of three tiers and migrate automatically:
//!
//! - **hot** - always searched
//! - **warm** - searched on explicit query (default search includes it)
//! - **cold** - archived, excluded unless asked for, eventually forgotten
//!
//! # Modules
//!
//! - **embedding** - text → vector providers (hashing, optional fastembed)
//! - **vector_store** - cosine index persisted as one JSON document
//! - **heat** - wall-clock heat scoring and the JSONL heat store
//! - **tracker** - cycle-based timing for tier migration
//! - **lifecycle** - runs cycles across all stores, cross-tier search
//! - **retrieval** - heat-weighted re-ranking
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memtier_core::{
//!     HashingEmbeddingProvider, LifecycleManager, MemoryEntry, MemtierConfig,
//!     QueryOptions, StaticEntrySource,
//! };
//!
//! async fn example() -> memtier_core::Result<()> {
//!     let source = StaticEntrySource::new(vec![
//!         MemoryEntry::new("d-1", "decision", "Store heat records as JSON lines"),
//!     ]);
//!     let mut manager = LifecycleManager::open(
//!         MemtierConfig::default(),
//!         Arc::new(HashingEmbeddingProvider::default()),
//!         Box::new(source),
//!     )
//!     .await?;
//!
//!     let report = manager.run_cycle(1).await;
//!     println!("indexed {}", report.newly_indexed.len());
//!
//!     let hits = manager.search("heat storage", &QueryOptions::default()).await?;
//!     for hit in hits {
//!         println!("{} [{}] {:.3}", hit.entry.id, hit.tier, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod embedding;
pub mod heat;
pub mod lifecycle;
pub mod retrieval;
pub mod source;
pub mod tracker;
pub mod types;
pub mod utils;
pub mod vector_store;

mod error;

pub use config::{
    ConfigValidationError, EmbeddingBackend, EmbeddingConfig, HeatConfig, KindPolicy,
    LifecycleConfig, MemtierConfig, PathsConfig, RetrievalConfig,
};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider, ProviderInfo, cosine_similarity};
pub use error::{Error, Result};
pub use heat::{DecayOptions, DecayReport, HeatEntry, HeatStats, HeatStore, TierTransition};
pub use lifecycle::{
    LifecycleManager, LifecycleReport, LifecycleStats, QueryOptions, RecallOptions, TieredResult,
};
pub use retrieval::{RankedResult, RetrievalOptions, SemanticMatch, combine_with_heat};
pub use source::{EntrySource, JsonEntrySource, StaticEntrySource};
pub use tracker::{ImportanceTracker, TrackedRecord, TransitionPlan};
pub use types::{EntryKind, MemoryClass, MemoryEntry, SearchFilter, StoredVectorEntry, Tier};
pub use vector_store::{SearchOptions, VectorHit, VectorStore, VectorUpsert};

#[cfg(feature = "embeddings")]
pub use embedding::FastEmbedProvider;
