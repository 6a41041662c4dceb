use std::sync::Arc;

use clamp_ledger::Ledger;
use clamp_points::{PointFilter, PointStore};
use clamp_types::{
    hash::commit_hash, ClampError, ClampResult, Commit, Deployment, DeploymentStatus, Document,
    RollbackStage, COMMIT_HASH_LEN,
};
use tracing::{debug, info, warn};

use crate::locks::GroupLocks;

/// Minimum length accepted for an abbreviated commit reference.
const MIN_PREFIX_LEN: usize = 4;

/// Client-facing version orchestrator.
///
/// All mutating operations on a group are serialized against each other;
/// operations on different groups proceed concurrently.
pub struct ClampClient {
    ledger: Arc<dyn Ledger>,
    points: Arc<dyn PointStore>,
    locks: GroupLocks,
}

impl ClampClient {
    pub fn new(ledger: Arc<dyn Ledger>, points: Arc<dyn PointStore>) -> Self {
        Self {
            ledger,
            points,
            locks: GroupLocks::new(),
        }
    }

    /// Ingest a new version of `group` into `collection`.
    ///
    /// Creates a content-addressed commit and makes it the group's active
    /// deployment. Step order matters: new points are written and tagged
    /// before the previous version is deactivated, so a crash mid-operation
    /// can leave two versions active (self-healing on the next successful
    /// ingest or rollback) but never zero. The ledger is written last; a
    /// crash before it leaves the data-plane ahead of the control-plane
    /// without corrupting either.
    pub async fn ingest(
        &self,
        collection: &str,
        group: &str,
        documents: &[Document],
        message: &str,
        author: Option<&str>,
    ) -> ClampResult<String> {
        if documents.is_empty() {
            return Err(ClampError::EmptyDocuments);
        }
        if let Some(index) = documents.iter().position(|doc| doc.vector.is_none()) {
            return Err(ClampError::MissingVector { index });
        }

        let _guard = self.locks.lock(group).await;

        let hash = commit_hash(documents, group, message)?;
        let short = &hash[..8.min(hash.len())];
        debug!(group, commit = short, "computed commit hash");

        self.points
            .upsert_tagged(collection, documents, &hash, group)
            .await?;

        let previous = self.ledger.get_deployment(group).await?;
        if let Some(deployment) = &previous {
            // Skip the flip when re-ingesting identical content: the save
            // below will still fail with DuplicateCommit, but the points
            // just written must not be deactivated on the way there.
            if deployment.active_commit_hash != hash {
                let deactivated = self
                    .points
                    .deactivate(collection, group, &deployment.active_commit_hash)
                    .await?;
                debug!(group, deactivated, "deactivated previous version");
            }
        }

        let commit = Commit::new(
            hash.clone(),
            group,
            message,
            author.map(str::to_string),
        );
        self.ledger.save_commit(&commit).await?;
        self.ledger.set_deployment(group, &hash).await?;

        info!(
            group,
            commit = commit.short_hash(),
            documents = documents.len(),
            "ingested new version"
        );
        Ok(hash)
    }

    /// Switch `group` back to a previously committed version.
    ///
    /// Rolling back to the currently active commit is an idempotent no-op.
    /// A data-plane or pointer failure mid-switch surfaces as
    /// [`ClampError::RollbackFailed`] naming the phase, because the system
    /// may then be in a mixed state the caller has to know about.
    pub async fn rollback(
        &self,
        collection: &str,
        group: &str,
        target_commit_hash: &str,
    ) -> ClampResult<()> {
        let _guard = self.locks.lock(group).await;

        let commit = self
            .ledger
            .get_commit(target_commit_hash)
            .await?
            .ok_or_else(|| ClampError::CommitNotFound {
                commit_hash: target_commit_hash.to_string(),
            })?;
        if commit.group != group {
            return Err(ClampError::GroupMismatch {
                expected_group: group.to_string(),
                actual_group: commit.group,
            });
        }

        let deployment = self
            .ledger
            .get_deployment(group)
            .await?
            .ok_or_else(|| ClampError::NoDeployment {
                group: group.to_string(),
            })?;

        if deployment.active_commit_hash == target_commit_hash {
            info!(group, commit = commit.short_hash(), "already at commit, nothing to do");
            return Ok(());
        }

        self.points
            .deactivate(collection, group, &deployment.active_commit_hash)
            .await
            .map_err(|e| rollback_failed(RollbackStage::DeactivateCurrent, e))?;
        self.points
            .activate(collection, group, target_commit_hash)
            .await
            .map_err(|e| rollback_failed(RollbackStage::ActivateTarget, e))?;
        self.ledger
            .set_deployment(group, target_commit_hash)
            .await
            .map_err(|e| rollback_failed(RollbackStage::UpdatePointer, e))?;

        info!(group, commit = commit.short_hash(), "rolled back");
        Ok(())
    }

    /// Deployment snapshot for a group. Never errors on a group without a
    /// deployment: that yields null commit fields and zero counts.
    pub async fn status(&self, collection: &str, group: &str) -> ClampResult<DeploymentStatus> {
        let Some(deployment) = self.ledger.get_deployment(group).await? else {
            return Ok(DeploymentStatus::empty(group));
        };

        let commit = self.ledger.get_commit(&deployment.active_commit_hash).await?;
        if commit.is_none() {
            // Data-plane got ahead of the control-plane, or the ledger was
            // edited out-of-band. Counts still tell the caller what is live.
            warn!(
                group,
                commit = %deployment.active_commit_hash,
                "deployment points at a commit missing from the ledger"
            );
        }

        let active_count = self.points.count_active(collection, group).await?;
        let total_count = self.points.count_total(collection, group).await?;

        Ok(DeploymentStatus {
            group: group.to_string(),
            active_commit: Some(deployment.active_commit_hash),
            message: commit.as_ref().map(|c| c.message.clone()),
            author: commit.as_ref().and_then(|c| c.author.clone()),
            timestamp: commit.as_ref().map(|c| c.timestamp),
            active_count,
            total_count,
        })
    }

    /// Commit history for a group, newest first. Empty for unknown groups.
    pub async fn history(&self, group: &str, limit: Option<usize>) -> ClampResult<Vec<Commit>> {
        self.ledger.get_history(group, limit).await
    }

    /// Current deployment pointer for a group, if any. Control-plane read
    /// only; no data-plane round trip.
    pub async fn deployment(&self, group: &str) -> ClampResult<Option<Deployment>> {
        self.ledger.get_deployment(group).await
    }

    /// All versioned groups, lexicographically sorted.
    pub async fn groups(&self) -> ClampResult<Vec<String>> {
        self.ledger.list_groups().await
    }

    /// Purge a group: its data-plane points, commits, and deployment, as a
    /// unit. Points go first so a failure leaves the ledger intact.
    pub async fn delete_group(&self, collection: &str, group: &str) -> ClampResult<()> {
        let _guard = self.locks.lock(group).await;

        let removed = self.points.delete_group_points(collection, group).await?;
        self.ledger.delete_group(group).await?;
        info!(group, points_removed = removed, "deleted group");
        Ok(())
    }

    /// Resolve a full hash or an unambiguous prefix (≥ 4 chars) against a
    /// group's history.
    pub async fn resolve_commit(&self, group: &str, reference: &str) -> ClampResult<Commit> {
        if reference.len() == COMMIT_HASH_LEN {
            if let Some(commit) = self.ledger.get_commit(reference).await? {
                return Ok(commit);
            }
        }

        if reference.len() >= MIN_PREFIX_LEN {
            let history = self.ledger.get_history(group, None).await?;
            let matches: Vec<&Commit> = history
                .iter()
                .filter(|c| c.hash.starts_with(reference))
                .collect();
            match matches.as_slice() {
                [] => {}
                [only] => return Ok((*only).clone()),
                many => {
                    return Err(ClampError::AmbiguousCommit {
                        prefix: reference.to_string(),
                        matches: many.iter().map(|c| c.hash.clone()).collect(),
                    })
                }
            }
        }

        Err(ClampError::CommitNotFound {
            commit_hash: reference.to_string(),
        })
    }

    /// Filter scoping data-plane queries to the active version of `group`.
    pub fn active_filter(&self, group: &str) -> PointFilter {
        PointFilter::active(group)
    }
}

fn rollback_failed(stage: RollbackStage, source: ClampError) -> ClampError {
    warn!(%stage, error = %source, "rollback failed mid-flight; stores may disagree");
    ClampError::RollbackFailed {
        stage,
        source: Box::new(source),
    }
}
