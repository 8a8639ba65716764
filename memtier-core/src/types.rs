//! Memory Type Definitions
//!
//! Defines the core types shared by the vector store, heat store and
//! lifecycle manager.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::content_hash;

/// Retrieval tier (hot, warm, cold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Hot,
    Warm,
    Cold,
}

impl Tier {
    /// All tiers, highest priority first
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Warm, Tier::Cold];

    /// Rank for ordering comparisons (hot > warm > cold)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Hot => 2,
            Self::Warm => 1,
            Self::Cold => 0,
        }
    }

    /// Whether this tier is at least as high as `other`
    pub fn at_least(&self, other: Tier) -> bool {
        self.rank() >= other.rank()
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hot" | "h" => Ok(Self::Hot),
            "warm" | "w" => Ok(Self::Warm),
            "cold" | "c" => Ok(Self::Cold),
            other => Err(format!("invalid tier: {other} (expected hot, warm or cold)")),
        }
    }
}

/// Memory class, controls how fast heat decays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryClass {
    /// Never decays
    Innate,
    /// Slow decay
    Learned,
    /// Fast decay
    Episodic,
}

impl MemoryClass {
    pub const ALL: [MemoryClass; 3] = [
        MemoryClass::Innate,
        MemoryClass::Learned,
        MemoryClass::Episodic,
    ];

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Innate => "innate",
            Self::Learned => "learned",
            Self::Episodic => "episodic",
        }
    }
}

impl std::fmt::Display for MemoryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemoryClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "innate" => Ok(Self::Innate),
            "learned" => Ok(Self::Learned),
            "episodic" => Ok(Self::Episodic),
            other => Err(format!("invalid memory class: {other}")),
        }
    }
}

/// Kind of log record produced by the extractor
///
/// The set is open: unknown kinds round-trip through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntryKind {
    Decision,
    Lesson,
    Status,
    Blocker,
    RoleState,
    Question,
    Other(String),
}

impl EntryKind {
    /// Convert to string
    pub fn as_str(&self) -> &str {
        match self {
            Self::Decision => "decision",
            Self::Lesson => "lesson",
            Self::Status => "status",
            Self::Blocker => "blocker",
            Self::RoleState => "role_state",
            Self::Question => "question",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for EntryKind {
    fn from(s: &str) -> Self {
        match s {
            "decision" => Self::Decision,
            "lesson" => Self::Lesson,
            "status" => Self::Status,
            "blocker" => Self::Blocker,
            "role_state" => Self::RoleState,
            "question" => Self::Question,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EntryKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<EntryKind> for String {
    fn from(kind: EntryKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single extracted log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub kind: EntryKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl MemoryEntry {
    /// Create an entry with no role, date or tags
    pub fn new(id: impl Into<String>, kind: impl Into<EntryKind>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            content: content.into(),
            role: None,
            date: None,
            tags: BTreeSet::new(),
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Hash of every field except the id
    ///
    /// Two records with the same id but different fingerprints mean the
    /// extractor superseded the entry.
    pub fn fingerprint(&self) -> String {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        let canonical = format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.kind.as_str(),
            self.content,
            self.role.as_deref().unwrap_or(""),
            self.date.as_deref().unwrap_or(""),
            tags.join("\u{1e}"),
        );
        content_hash(&canonical)
    }

    /// Text handed to the embedding provider
    pub fn embedding_text(&self) -> String {
        match &self.role {
            Some(role) => format!("{} ({}): {}", self.kind, role, self.content),
            None => format!("{}: {}", self.kind, self.content),
        }
    }
}

/// An entry as held by the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVectorEntry {
    #[serde(flatten)]
    pub entry: MemoryEntry,
    pub vector: Vec<f32>,
    pub tier: Tier,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl StoredVectorEntry {
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}

/// Filter applied before ranking in vector search
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Only these kinds
    pub kinds: Option<Vec<EntryKind>>,
    /// Only these tiers
    pub tiers: Option<Vec<Tier>>,
    /// Entry must carry every listed tag
    pub tags: Option<Vec<String>>,
    /// Only this role
    pub role: Option<String>,
}

impl SearchFilter {
    /// Restrict to the given tiers
    pub fn with_tiers(mut self, tiers: impl Into<Vec<Tier>>) -> Self {
        self.tiers = Some(tiers.into());
        self
    }

    /// Check whether a stored entry passes the filter
    pub fn matches(&self, stored: &StoredVectorEntry) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.is_empty() && !kinds.contains(&stored.entry.kind) {
                return false;
            }
        }
        if let Some(ref tiers) = self.tiers {
            if !tiers.is_empty() && !tiers.contains(&stored.tier) {
                return false;
            }
        }
        if let Some(ref tags) = self.tags {
            if !tags.iter().all(|t| stored.entry.tags.contains(t)) {
                return false;
            }
        }
        if let Some(ref role) = self.role {
            if stored.entry.role.as_deref() != Some(role.as_str()) {
                return false;
            }
        }
        true
    }
}
