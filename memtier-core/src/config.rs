//! Cache Configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{EntryKind, MemoryClass, Tier};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemtierConfig {
    /// Where persisted state lives
    pub paths: PathsConfig,

    /// Embedding provider selection
    pub embedding: EmbeddingConfig,

    /// Heat scoring parameters
    pub heat: HeatConfig,

    /// Tier migration timing
    pub lifecycle: LifecycleConfig,

    /// Recall defaults
    pub retrieval: RetrievalConfig,
}

/// File locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding all store files (default: .memtier)
    pub data_dir: PathBuf,

    /// Vector store document (default: vectors.json)
    pub vector_file: String,

    /// Heat store JSONL (default: heat.jsonl)
    pub heat_file: String,

    /// Importance tracker document (default: tracker.json)
    pub tracker_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".memtier"),
            vector_file: "vectors.json".into(),
            heat_file: "heat.jsonl".into(),
            tracker_file: "tracker.json".into(),
        }
    }
}

impl PathsConfig {
    pub fn vector_path(&self) -> PathBuf {
        self.data_dir.join(&self.vector_file)
    }

    pub fn heat_path(&self) -> PathBuf {
        self.data_dir.join(&self.heat_file)
    }

    pub fn tracker_path(&self) -> PathBuf {
        self.data_dir.join(&self.tracker_file)
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Feature-hashed term frequencies, no model required
    #[default]
    Hashing,
    /// Local all-MiniLM-L6-v2 (requires the `embeddings` feature)
    Fastembed,
}

/// Embedding provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,

    /// Vector length for the hashing provider (default: 256)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Hashing,
            dimensions: 256,
        }
    }
}

/// Heat scoring parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    /// Minimum score for the hot tier (default: 0.8)
    pub hot_threshold: f64,

    /// Minimum score for the warm tier (default: 0.4)
    pub warm_threshold: f64,

    /// Daily retention factor for learned entries (default: 0.98)
    pub learned_decay_rate: f64,

    /// Daily retention factor for episodic entries (default: 0.90)
    pub episodic_decay_rate: f64,

    /// Upper bound of the reference multiplier minus one (default: 0.5)
    pub max_reference_bonus: f64,

    /// References at which the bonus reaches ~63% of its maximum (default: 5)
    pub reference_scale: f64,

    /// Entries scoring below this are archived by a live decay pass (default: none)
    pub archive_threshold: Option<f64>,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            hot_threshold: 0.8,
            warm_threshold: 0.4,
            learned_decay_rate: 0.98,
            episodic_decay_rate: 0.90,
            max_reference_bonus: 0.5,
            reference_scale: 5.0,
            archive_threshold: None,
        }
    }
}

/// Heat class and starting importance assigned to a new entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindPolicy {
    pub class: MemoryClass,
    pub importance: f64,
}

impl KindPolicy {
    pub const fn new(class: MemoryClass, importance: f64) -> Self {
        Self { class, importance }
    }
}

/// Tier migration timing, in lifecycle cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Cycles without access before hot demotes to warm (default: 3)
    pub hot_demotion_cycles: u64,

    /// Cycles in warm without access before demoting to cold (default: 10)
    pub warm_demotion_cycles: u64,

    /// Cycles in cold without access before an entry is forgotten (default: 30)
    pub cold_forget_cycles: u64,

    /// Persist all stores at the end of every cycle (default: true)
    pub auto_save: bool,

    /// Tiers searched when the caller names none (default: hot, warm)
    pub default_search_tiers: Vec<Tier>,

    /// Per-kind heat registration, keyed by kind name
    pub kinds: BTreeMap<String, KindPolicy>,

    /// Policy for kinds missing from `kinds`
    pub fallback: KindPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        let kinds = [
            ("role_state", KindPolicy::new(MemoryClass::Learned, 0.9)),
            ("decision", KindPolicy::new(MemoryClass::Learned, 0.85)),
            ("blocker", KindPolicy::new(MemoryClass::Learned, 0.7)),
            ("lesson", KindPolicy::new(MemoryClass::Learned, 0.7)),
            ("question", KindPolicy::new(MemoryClass::Episodic, 0.6)),
            ("status", KindPolicy::new(MemoryClass::Episodic, 0.5)),
        ]
        .into_iter()
        .map(|(kind, policy)| (kind.to_string(), policy))
        .collect();

        Self {
            hot_demotion_cycles: 3,
            warm_demotion_cycles: 10,
            cold_forget_cycles: 30,
            auto_save: true,
            default_search_tiers: vec![Tier::Hot, Tier::Warm],
            kinds,
            fallback: KindPolicy::new(MemoryClass::Episodic, 0.5),
        }
    }
}

impl LifecycleConfig {
    /// Registration policy for a kind
    pub fn policy_for(&self, kind: &EntryKind) -> KindPolicy {
        self.kinds.get(kind.as_str()).copied().unwrap_or(self.fallback)
    }
}

/// Heat-weighted recall defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Share of the combined score taken from heat (default: 0.4)
    pub heat_weight: f64,

    /// Drop semantic matches below this similarity (default: 0.0)
    pub min_score: f32,

    /// Results per query (default: 10)
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            heat_weight: 0.4,
            min_score: 0.0,
            k: 10,
        }
    }
}

impl MemtierConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigValidationError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigValidationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigValidationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigValidationError::Parse(e.to_string()))
    }

    /// Set the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.paths.data_dir = data_dir.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.embedding.dimensions == 0 {
            return Err(invalid("embedding.dimensions", "must be greater than 0"));
        }

        let heat = &self.heat;
        for (field, value) in [
            ("heat.hot_threshold", heat.hot_threshold),
            ("heat.warm_threshold", heat.warm_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "must be between 0 and 1"));
            }
        }
        if heat.warm_threshold > heat.hot_threshold {
            return Err(invalid(
                "heat.warm_threshold",
                "must not exceed heat.hot_threshold",
            ));
        }

        for (field, value) in [
            ("heat.learned_decay_rate", heat.learned_decay_rate),
            ("heat.episodic_decay_rate", heat.episodic_decay_rate),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(field, "must be in (0, 1]"));
            }
        }
        if heat.episodic_decay_rate > heat.learned_decay_rate {
            return Err(invalid(
                "heat.episodic_decay_rate",
                "must not exceed heat.learned_decay_rate",
            ));
        }

        if heat.max_reference_bonus < 0.0 {
            return Err(invalid("heat.max_reference_bonus", "must not be negative"));
        }
        if heat.reference_scale <= 0.0 {
            return Err(invalid("heat.reference_scale", "must be greater than 0"));
        }
        if let Some(threshold) = heat.archive_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(invalid("heat.archive_threshold", "must be between 0 and 1"));
            }
        }

        let lifecycle = &self.lifecycle;
        for (field, value) in [
            ("lifecycle.hot_demotion_cycles", lifecycle.hot_demotion_cycles),
            ("lifecycle.warm_demotion_cycles", lifecycle.warm_demotion_cycles),
            ("lifecycle.cold_forget_cycles", lifecycle.cold_forget_cycles),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        for (kind, policy) in &lifecycle.kinds {
            if !(0.0..=1.0).contains(&policy.importance) {
                return Err(ConfigValidationError::InvalidValue {
                    field: format!("lifecycle.kinds.{}.importance", kind),
                    message: "must be between 0 and 1".into(),
                });
            }
        }

        if !(0.0..=1.0).contains(&self.retrieval.heat_weight) {
            return Err(invalid("retrieval.heat_weight", "must be between 0 and 1"));
        }
        if self.retrieval.k == 0 {
            return Err(invalid("retrieval.k", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MemtierConfig::default();
        assert_eq!(config.heat.hot_threshold, 0.8);
        assert_eq!(config.heat.warm_threshold, 0.4);
        assert_eq!(config.lifecycle.hot_demotion_cycles, 3);
        assert_eq!(config.lifecycle.warm_demotion_cycles, 10);
        assert_eq!(config.lifecycle.cold_forget_cycles, 30);
        assert!(config.lifecycle.auto_save);
        assert_eq!(config.lifecycle.default_search_tiers, vec![Tier::Hot, Tier::Warm]);
        assert_eq!(config.retrieval.heat_weight, 0.4);
        assert_eq!(config.retrieval.k, 10);
        assert_eq!(config.embedding.dimensions, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths() {
        let config = MemtierConfig::default().with_data_dir("/tmp/cache");
        assert_eq!(config.paths.vector_path(), PathBuf::from("/tmp/cache/vectors.json"));
        assert_eq!(config.paths.heat_path(), PathBuf::from("/tmp/cache/heat.jsonl"));
        assert_eq!(config.paths.tracker_path(), PathBuf::from("/tmp/cache/tracker.json"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MemtierConfig::from_toml_str(
            r#"
            [lifecycle]
            hot_demotion_cycles = 2

            [retrieval]
            heat_weight = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.lifecycle.hot_demotion_cycles, 2);
        assert_eq!(config.lifecycle.warm_demotion_cycles, 10);
        assert_eq!(config.retrieval.heat_weight, 0.25);
        assert_eq!(config.heat, HeatConfig::default());

        assert_eq!(MemtierConfig::from_toml_str("").unwrap(), MemtierConfig::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = MemtierConfig::default();
        let toml = config.to_toml_string().unwrap();
        assert_eq!(MemtierConfig::from_toml_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_kind_policy_lookup() {
        let lifecycle = LifecycleConfig::default();
        assert_eq!(
            lifecycle.policy_for(&EntryKind::RoleState).class,
            MemoryClass::Learned
        );
        assert_eq!(
            lifecycle.policy_for(&EntryKind::Status).class,
            MemoryClass::Episodic
        );
        assert_eq!(
            lifecycle.policy_for(&EntryKind::Other("retro".into())),
            lifecycle.fallback
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = MemtierConfig::default();
        config.heat.warm_threshold = 0.9;
        assert!(config.validate().is_err());

        let mut config = MemtierConfig::default();
        config.heat.episodic_decay_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = MemtierConfig::default();
        config.embedding.dimensions = 0;
        assert!(config.validate().is_err());

        let mut config = MemtierConfig::default();
        config.retrieval.heat_weight = 1.5;
        assert!(config.validate().is_err());

        let mut config = MemtierConfig::default();
        config.lifecycle.hot_demotion_cycles = 0;
        assert!(config.validate().is_err());

        assert!(MemtierConfig::from_toml_str("[heat]\nhot_threshold = \"high\"").is_err());
    }
}
