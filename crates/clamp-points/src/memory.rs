//! In-memory reference implementation of the point store.
//!
//! Behaves like a vector store reduced to what Clamp needs: payload
//! storage, filtered metadata flips, and counting. No similarity search.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use clamp_types::{ClampError, ClampResult, Document, PointId, ACTIVE_KEY, GROUP_KEY, VERSION_KEY};
use serde_json::Value;
use uuid::Uuid;

use crate::filter::PointFilter;
use crate::traits::{PointStore, StoredPoint};

type Collection = HashMap<PointId, StoredPoint>;

/// In-memory point store backend.
#[derive(Default)]
pub struct MemoryPointStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch points by id, in id order given. Missing ids are skipped.
    /// Diagnostic surface used by tests and demos; not part of the adapter
    /// contract.
    pub fn retrieve(&self, collection: &str, ids: &[PointId]) -> ClampResult<Vec<StoredPoint>> {
        let collections = self.read()?;
        let Some(points) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| points.get(id).cloned()).collect())
    }

    fn read(
        &self,
    ) -> ClampResult<std::sync::RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| ClampError::points_unavailable("collections lock poisoned"))
    }

    fn write(
        &self,
    ) -> ClampResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| ClampError::points_unavailable("collections lock poisoned"))
    }

    fn count_matching(&self, collection: &str, filter: &PointFilter) -> ClampResult<u64> {
        let collections = self.read()?;
        let Some(points) = collections.get(collection) else {
            return Ok(0);
        };
        Ok(points
            .values()
            .filter(|p| filter.matches(&p.payload))
            .count() as u64)
    }

    fn set_active(
        &self,
        collection: &str,
        group: &str,
        version: &str,
        active: bool,
    ) -> ClampResult<u64> {
        let filter = PointFilter::version(group, version);
        let mut collections = self.write()?;
        let Some(points) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut flipped = 0;
        for point in points.values_mut() {
            if filter.matches(&point.payload) {
                point
                    .payload
                    .insert(ACTIVE_KEY.to_string(), Value::Bool(active));
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

#[async_trait]
impl PointStore for MemoryPointStore {
    async fn upsert_tagged(
        &self,
        collection: &str,
        documents: &[Document],
        version: &str,
        group: &str,
    ) -> ClampResult<Vec<PointId>> {
        let mut collections = self.write()?;
        let points = collections.entry(collection.to_string()).or_default();

        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = doc
                .id
                .clone()
                .unwrap_or_else(|| PointId::Str(Uuid::new_v4().to_string()));

            let mut payload = doc.payload.clone();
            // Reserved keys always win over caller data.
            payload.insert(VERSION_KEY.to_string(), Value::String(version.to_string()));
            payload.insert(ACTIVE_KEY.to_string(), Value::Bool(true));
            payload.insert(GROUP_KEY.to_string(), Value::String(group.to_string()));

            points.insert(
                id.clone(),
                StoredPoint {
                    id: id.clone(),
                    vector: doc.vector.clone().unwrap_or_default(),
                    payload,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn deactivate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64> {
        self.set_active(collection, group, version, false)
    }

    async fn activate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64> {
        self.set_active(collection, group, version, true)
    }

    async fn count_active(&self, collection: &str, group: &str) -> ClampResult<u64> {
        self.count_matching(collection, &PointFilter::active(group))
    }

    async fn count_total(&self, collection: &str, group: &str) -> ClampResult<u64> {
        self.count_matching(collection, &PointFilter::group(group))
    }

    async fn delete_group_points(&self, collection: &str, group: &str) -> ClampResult<u64> {
        let filter = PointFilter::group(group);
        let mut collections = self.write()?;
        let Some(points) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = points.len();
        points.retain(|_, p| !filter.matches(&p.payload));
        Ok((before - points.len()) as u64)
    }
}
