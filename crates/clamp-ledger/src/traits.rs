use async_trait::async_trait;
use clamp_types::{ClampResult, Commit, Deployment};

/// Durable store of commit records and deployment pointers.
///
/// Operations on a given group are linearizable; the orchestrator
/// additionally serializes read-modify-write sequences (ingest, rollback)
/// per group, so a `Ledger` implementation only has to make each call
/// individually atomic.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a commit. Fails with [`ClampError::DuplicateCommit`] when a
    /// commit with the same hash already exists; never overwrites.
    ///
    /// [`ClampError::DuplicateCommit`]: clamp_types::ClampError::DuplicateCommit
    async fn save_commit(&self, commit: &Commit) -> ClampResult<()>;

    /// Look up one commit by full hash.
    async fn get_commit(&self, commit_hash: &str) -> ClampResult<Option<Commit>>;

    /// Commits for a group, newest first by `(timestamp, insertion order)`,
    /// truncated to `limit` when given. Unknown groups yield an empty list.
    async fn get_history(&self, group: &str, limit: Option<usize>) -> ClampResult<Vec<Commit>>;

    /// Current deployment pointer for a group, if any.
    async fn get_deployment(&self, group: &str) -> ClampResult<Option<Deployment>>;

    /// Create or replace the deployment pointer for a group. Fails with
    /// [`ClampError::CommitNotFound`] when the commit does not exist.
    ///
    /// [`ClampError::CommitNotFound`]: clamp_types::ClampError::CommitNotFound
    async fn set_deployment(&self, group: &str, commit_hash: &str) -> ClampResult<()>;

    /// Distinct group names across all commits, lexicographically sorted.
    /// A group whose deployment was purged but whose commits remain still
    /// counts.
    async fn list_groups(&self) -> ClampResult<Vec<String>>;

    /// Remove all commits and the deployment pointer for a group as one
    /// unit. Other groups are untouched.
    async fn delete_group(&self, group: &str) -> ClampResult<()>;
}
