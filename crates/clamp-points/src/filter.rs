//! Filter expressions over point payloads.
//!
//! The shape mirrors the Qdrant REST filter object (`must` of field/match
//! conditions), so a [`PointFilter`] serializes directly into a similarity
//! search request and callers can scope queries to the active version of a
//! group without knowing the reserved keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use clamp_types::{ACTIVE_KEY, GROUP_KEY, VERSION_KEY};

/// Exact-match value for one payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    pub value: Value,
}

/// One field condition: `key == match.value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub r#match: MatchValue,
}

impl FieldCondition {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            r#match: MatchValue {
                value: value.into(),
            },
        }
    }
}

/// Conjunction of field conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFilter {
    pub must: Vec<FieldCondition>,
}

impl PointFilter {
    /// All points ever tagged with `group`, any version.
    pub fn group(group: &str) -> Self {
        Self {
            must: vec![FieldCondition::new(GROUP_KEY, group)],
        }
    }

    /// `group = G AND active = true`: scopes queries to the currently
    /// deployed version of a group.
    pub fn active(group: &str) -> Self {
        Self {
            must: vec![
                FieldCondition::new(GROUP_KEY, group),
                FieldCondition::new(ACTIVE_KEY, true),
            ],
        }
    }

    /// All points produced by one commit of a group.
    pub fn version(group: &str, version: &str) -> Self {
        Self {
            must: vec![
                FieldCondition::new(GROUP_KEY, group),
                FieldCondition::new(VERSION_KEY, version),
            ],
        }
    }

    /// Whether a payload satisfies every condition. Used by the in-memory
    /// backend; remote backends push the filter down to the store.
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        self.must
            .iter()
            .all(|cond| payload.get(&cond.key) == Some(&cond.r#match.value))
    }
}
