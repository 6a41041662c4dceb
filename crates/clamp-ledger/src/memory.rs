//! In-memory reference implementation of the ledger.
//!
//! Deterministic and test-friendly. Real deployments should use the
//! SQLite backend so commits survive the process.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use clamp_types::{ClampError, ClampResult, Commit, Deployment};

use crate::traits::Ledger;

#[derive(Default)]
struct LedgerState {
    /// Commit records keyed by hash, with their insertion sequence number.
    commits: HashMap<String, (Commit, u64)>,
    deployments: HashMap<String, Deployment>,
    next_seq: u64,
}

/// In-memory ledger backend.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn save_commit(&self, commit: &Commit) -> ClampResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;

        if state.commits.contains_key(&commit.hash) {
            return Err(ClampError::DuplicateCommit {
                commit_hash: commit.hash.clone(),
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.commits.insert(commit.hash.clone(), (commit.clone(), seq));
        Ok(())
    }

    async fn get_commit(&self, commit_hash: &str) -> ClampResult<Option<Commit>> {
        let state = self
            .state
            .read()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;
        Ok(state.commits.get(commit_hash).map(|(c, _)| c.clone()))
    }

    async fn get_history(&self, group: &str, limit: Option<usize>) -> ClampResult<Vec<Commit>> {
        let state = self
            .state
            .read()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;

        let mut entries: Vec<(&Commit, u64)> = state
            .commits
            .values()
            .filter(|(c, _)| c.group == group)
            .map(|(c, seq)| (c, *seq))
            .collect();
        // Newest first; ties broken by insertion order.
        entries.sort_by(|a, b| (b.0.timestamp, b.1).cmp(&(a.0.timestamp, a.1)));

        let mut history: Vec<Commit> = entries.into_iter().map(|(c, _)| c.clone()).collect();
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        Ok(history)
    }

    async fn get_deployment(&self, group: &str) -> ClampResult<Option<Deployment>> {
        let state = self
            .state
            .read()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;
        Ok(state.deployments.get(group).cloned())
    }

    async fn set_deployment(&self, group: &str, commit_hash: &str) -> ClampResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;

        if !state.commits.contains_key(commit_hash) {
            return Err(ClampError::CommitNotFound {
                commit_hash: commit_hash.to_string(),
            });
        }

        state.deployments.insert(
            group.to_string(),
            Deployment {
                group: group.to_string(),
                active_commit_hash: commit_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn list_groups(&self) -> ClampResult<Vec<String>> {
        let state = self
            .state
            .read()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;
        let groups: BTreeSet<String> = state
            .commits
            .values()
            .map(|(c, _)| c.group.clone())
            .collect();
        Ok(groups.into_iter().collect())
    }

    async fn delete_group(&self, group: &str) -> ClampResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ClampError::ledger_unavailable("state lock poisoned"))?;
        state.commits.retain(|_, (c, _)| c.group != group);
        state.deployments.remove(group);
        Ok(())
    }
}
