//! Per-group mutual exclusion for read-modify-write sequences.
//!
//! Concurrent ingest or rollback on the same group would race on the
//! deployment pointer (both read the old pointer, both set a new one, one
//! update lost). A per-group async mutex serializes those sequences while
//! leaving different groups fully independent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub(crate) struct GroupLocks {
    registry: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GroupLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `group`, creating it on first use. The guard
    /// is owned so it can be held across await points.
    pub(crate) async fn lock(&self, group: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.registry.lock().await;
            Arc::clone(registry.entry(group.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
