use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved payload key carrying the commit hash that produced a point.
pub const VERSION_KEY: &str = "__clamp_ver";
/// Reserved payload key marking whether a point belongs to the deployed commit.
pub const ACTIVE_KEY: &str = "__clamp_active";
/// Reserved payload key carrying the group a point belongs to.
pub const GROUP_KEY: &str = "__clamp_group";

/// Length of a full commit hash (blake3, lowercase hex).
pub const COMMIT_HASH_LEN: usize = 64;
/// Length of the abbreviated hash used in human-facing output.
pub const SHORT_HASH_LEN: usize = 8;

/// External identifier of a point in the data-plane store.
///
/// Vector stores accept either unsigned integers or string ids; the
/// untagged encoding round-trips both shapes unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Int(u64),
    Str(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Int(n) => write!(f, "{n}"),
            PointId::Str(s) => f.write_str(s),
        }
    }
}

impl From<&PointId> for Value {
    fn from(id: &PointId) -> Self {
        match id {
            PointId::Int(n) => Value::from(*n),
            PointId::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Int(n)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::Str(s.to_string())
    }
}

/// A caller-supplied document: an optional external id, an optional
/// embedding vector, and an arbitrary key-value payload.
///
/// The flattened payload means a JSON object like
/// `{"id": 1, "vector": [...], "text": "..."}` deserializes directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<PointId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Immutable, content-addressed record of one ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Content address: 64-char lowercase hex digest.
    pub hash: String,
    /// Owning group; never changes.
    pub group: String,
    /// Creation instant; the ledger breaks ties by insertion order.
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub author: Option<String>,
}

impl Commit {
    pub fn new(
        hash: impl Into<String>,
        group: impl Into<String>,
        message: impl Into<String>,
        author: Option<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            group: group.into(),
            timestamp: Utc::now(),
            message: message.into(),
            author,
        }
    }

    /// Abbreviated hash for human-facing output.
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(SHORT_HASH_LEN);
        &self.hash[..end]
    }

    /// Author name, with the sentinel used when none was recorded.
    pub fn author_or_unknown(&self) -> &str {
        self.author.as_deref().unwrap_or("Unknown")
    }
}

/// Mutable pointer recording which commit is deployed for a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub group: String,
    pub active_commit_hash: String,
}

/// Point-in-time snapshot of a group's deployment and data-plane counts.
///
/// A group without a deployment yields a snapshot with null commit fields
/// and zero counts; requesting status is never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub group: String,
    pub active_commit: Option<String>,
    pub message: Option<String>,
    pub author: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub active_count: u64,
    pub total_count: u64,
}

impl DeploymentStatus {
    /// Snapshot for a group with no deployment.
    pub fn empty(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            active_commit: None,
            message: None,
            author: None,
            timestamp: None,
            active_count: 0,
            total_count: 0,
        }
    }

    /// Abbreviated active commit hash, when one is deployed.
    pub fn active_commit_short(&self) -> Option<&str> {
        self.active_commit
            .as_deref()
            .map(|hash| &hash[..hash.len().min(SHORT_HASH_LEN)])
    }
}
