use std::fmt;

use thiserror::Error;

/// Result type for Clamp operations.
pub type ClampResult<T> = Result<T, ClampError>;

/// Phase of a rollback in which a data-plane or ledger write failed.
///
/// Reported inside [`ClampError::RollbackFailed`] so callers know which
/// mixed state the system may be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStage {
    /// Flipping the currently active version's points to inactive.
    DeactivateCurrent,
    /// Flipping the target version's points to active.
    ActivateTarget,
    /// Updating the deployment pointer in the ledger.
    UpdatePointer,
}

impl fmt::Display for RollbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RollbackStage::DeactivateCurrent => "deactivate-current",
            RollbackStage::ActivateTarget => "activate-target",
            RollbackStage::UpdatePointer => "update-pointer",
        };
        f.write_str(name)
    }
}

/// Error taxonomy for Clamp operations.
///
/// Every variant carries enough structured context for callers to
/// pattern-match and react; none is a bare string.
#[derive(Debug, Error)]
pub enum ClampError {
    /// Ingest called with an empty document batch. Rejected before any I/O.
    #[error("cannot ingest an empty document batch")]
    EmptyDocuments,

    /// A document in the batch has no embedding vector. Rejected before any
    /// I/O; `index` names the first offending document.
    #[error("document at index {index} has no embedding vector")]
    MissingVector { index: usize },

    /// Ledger integrity violation: a commit with this hash already exists.
    /// Under correct content addressing this only occurs when the same
    /// batch, group, and message are re-ingested. Never overwritten.
    #[error("commit {commit_hash} already exists in the ledger")]
    DuplicateCommit { commit_hash: String },

    /// The referenced commit is absent from the ledger.
    #[error("commit not found: {commit_hash}")]
    CommitNotFound { commit_hash: String },

    /// Rollback target belongs to a different group than requested.
    #[error("commit belongs to group '{actual_group}', not '{expected_group}'")]
    GroupMismatch {
        expected_group: String,
        actual_group: String,
    },

    /// Rollback requested for a group that has no active deployment.
    #[error("group '{group}' has no active deployment")]
    NoDeployment { group: String },

    /// A short commit reference matched more than one commit.
    #[error("commit reference '{prefix}' is ambiguous ({n} matches)", n = .matches.len())]
    AmbiguousCommit {
        prefix: String,
        matches: Vec<String>,
    },

    /// Partial failure mid-rollback. The system may be in a mixed state:
    /// which state depends on the stage that failed.
    #[error("rollback failed during {stage}: {source}")]
    RollbackFailed {
        stage: RollbackStage,
        #[source]
        source: Box<ClampError>,
    },

    /// Transient failure reaching an external store. Propagated, never
    /// retried inside a single logical operation.
    #[error("{store} store unavailable: {reason}")]
    StoreUnavailable { store: String, reason: String },

    /// Canonical encoding of a document batch failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ClampError {
    /// Shorthand for data-plane store failures.
    pub fn points_unavailable(reason: impl Into<String>) -> Self {
        ClampError::StoreUnavailable {
            store: "point".to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for control-plane store failures.
    pub fn ledger_unavailable(reason: impl Into<String>) -> Self {
        ClampError::StoreUnavailable {
            store: "ledger".to_string(),
            reason: reason.into(),
        }
    }
}
