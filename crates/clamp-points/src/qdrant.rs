//! Qdrant backend, speaking the REST API directly.
//!
//! Only the four operations Clamp needs: point upsert, payload update by
//! filter, count, and delete by filter. All requests use `wait=true` so a
//! returned call means the write is applied, matching the durability
//! contract of the ledger side.

use async_trait::async_trait;
use clamp_types::{
    ClampError, ClampResult, Document, PointId, ACTIVE_KEY, GROUP_KEY, VERSION_KEY,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::filter::PointFilter;
use crate::traits::PointStore;

/// Qdrant-backed point store adapter.
#[derive(Clone)]
pub struct QdrantPointStore {
    http: reqwest::Client,
    base_url: String,
}

impl QdrantPointStore {
    /// `base_url` is the Qdrant HTTP endpoint, e.g. `http://localhost:6333`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> ClampResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClampError::points_unavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClampError::points_unavailable(format!(
                "qdrant returned {status}: {detail}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ClampError::points_unavailable(format!("bad qdrant response: {e}")))
    }

    async fn count(&self, collection: &str, filter: &PointFilter) -> ClampResult<u64> {
        let body = json!({ "filter": to_value(filter)?, "exact": true });
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/count"),
                &body,
            )
            .await?;
        response["result"]["count"]
            .as_u64()
            .ok_or_else(|| ClampError::points_unavailable("count missing from qdrant response"))
    }

    async fn set_active(
        &self,
        collection: &str,
        group: &str,
        version: &str,
        active: bool,
    ) -> ClampResult<u64> {
        let filter = PointFilter::version(group, version);
        // Count first: the payload endpoint acknowledges but does not
        // report how many points matched.
        let matched = self.count(collection, &filter).await?;
        if matched == 0 {
            return Ok(0);
        }

        let body = json!({
            "payload": { ACTIVE_KEY: active },
            "filter": to_value(&filter)?,
        });
        self.request(
            reqwest::Method::POST,
            &format!("/collections/{collection}/points/payload?wait=true"),
            &body,
        )
        .await?;
        Ok(matched)
    }
}

fn to_value(filter: &PointFilter) -> ClampResult<Value> {
    serde_json::to_value(filter).map_err(|e| ClampError::Serialization(e.to_string()))
}

#[async_trait]
impl PointStore for QdrantPointStore {
    async fn upsert_tagged(
        &self,
        collection: &str,
        documents: &[Document],
        version: &str,
        group: &str,
    ) -> ClampResult<Vec<PointId>> {
        let mut ids = Vec::with_capacity(documents.len());
        let mut points = Vec::with_capacity(documents.len());
        for doc in documents {
            let id = doc
                .id
                .clone()
                .unwrap_or_else(|| PointId::Str(Uuid::new_v4().to_string()));

            let mut payload = doc.payload.clone();
            payload.insert(VERSION_KEY.to_string(), Value::String(version.to_string()));
            payload.insert(ACTIVE_KEY.to_string(), Value::Bool(true));
            payload.insert(GROUP_KEY.to_string(), Value::String(group.to_string()));

            points.push(json!({
                "id": Value::from(&id),
                "vector": doc.vector.clone().unwrap_or_default(),
                "payload": payload,
            }));
            ids.push(id);
        }

        self.request(
            reqwest::Method::PUT,
            &format!("/collections/{collection}/points?wait=true"),
            &json!({ "points": points }),
        )
        .await?;
        Ok(ids)
    }

    async fn deactivate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64> {
        self.set_active(collection, group, version, false).await
    }

    async fn activate(&self, collection: &str, group: &str, version: &str) -> ClampResult<u64> {
        self.set_active(collection, group, version, true).await
    }

    async fn count_active(&self, collection: &str, group: &str) -> ClampResult<u64> {
        self.count(collection, &PointFilter::active(group)).await
    }

    async fn count_total(&self, collection: &str, group: &str) -> ClampResult<u64> {
        self.count(collection, &PointFilter::group(group)).await
    }

    async fn delete_group_points(&self, collection: &str, group: &str) -> ClampResult<u64> {
        let filter = PointFilter::group(group);
        let removed = self.count(collection, &filter).await?;
        if removed == 0 {
            return Ok(0);
        }
        self.request(
            reqwest::Method::POST,
            &format!("/collections/{collection}/points/delete?wait=true"),
            &json!({ "filter": to_value(&filter)? }),
        )
        .await?;
        Ok(removed)
    }
}
