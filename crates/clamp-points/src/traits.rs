use async_trait::async_trait;
use clamp_types::{ClampResult, Document, PointId};
use serde_json::{Map, Value};

/// A point as held by the data-plane store: external id, embedding vector,
/// and payload including the reserved version-metadata keys.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// Adapter contract over the external vector store.
///
/// Batch metadata flips are not atomic across points: the underlying store
/// supports per-point atomic payload updates only, so a flip over N points
/// may complete for a prefix and fail partway. Callers treat any failure as
/// terminal for the surrounding operation rather than retrying, which could
/// double-apply a partial flip.
#[async_trait]
pub trait PointStore: Send + Sync {
    /// Write `documents` into `collection`, tagging each payload with
    /// `__clamp_ver = version`, `__clamp_active = true`, and
    /// `__clamp_group = group`. Reserved keys win over colliding caller
    /// keys. Documents without an id are assigned a generated one; ids are
    /// stable on re-read. Returns the ids in document order.
    async fn upsert_tagged(
        &self,
        collection: &str,
        documents: &[Document],
        version: &str,
        group: &str,
    ) -> ClampResult<Vec<PointId>>;

    /// Flip `__clamp_active = false` on every point matching
    /// `(group, version)`. Zero matches is a no-op, not an error. Returns
    /// the number of points matched.
    async fn deactivate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64>;

    /// Flip `__clamp_active = true` on every point matching `(group, version)`.
    async fn activate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64>;

    /// Points currently active for `group`.
    async fn count_active(&self, collection: &str, group: &str) -> ClampResult<u64>;

    /// Points ever tagged with `group`, any version.
    async fn count_total(&self, collection: &str, group: &str) -> ClampResult<u64>;

    /// Remove every point tagged with `group`. Data-plane half of a group
    /// purge. Returns the number of points removed.
    async fn delete_group_points(&self, collection: &str, group: &str) -> ClampResult<u64>;
}
