//! End-to-end orchestrator tests against the in-memory ledger and point
//! store, plus fault injection at the store seams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clamp_client::ClampClient;
use clamp_ledger::{Ledger, MemoryLedger};
use clamp_points::{MemoryPointStore, PointStore};
use clamp_types::{
    ClampError, Commit, Document, PointId, RollbackStage, ACTIVE_KEY, COMMIT_HASH_LEN,
};

const COLLECTION: &str = "test_collection";

fn setup() -> (ClampClient, Arc<MemoryLedger>, Arc<MemoryPointStore>) {
    let ledger = Arc::new(MemoryLedger::new());
    let points = Arc::new(MemoryPointStore::new());
    let client = ClampClient::new(ledger.clone(), points.clone());
    (client, ledger, points)
}

fn docs(ids: std::ops::Range<u64>) -> Vec<Document> {
    ids.map(|i| {
        Document::new()
            .with_id(i)
            .with_vector(vec![0.1 * i as f32, 0.2, 0.3])
            .with_field("text", format!("Document {i}"))
    })
    .collect()
}

fn is_active(points: &MemoryPointStore, id: u64) -> bool {
    let found = points.retrieve(COLLECTION, &[PointId::Int(id)]).unwrap();
    found[0].payload[ACTIVE_KEY] == true
}

#[tokio::test]
async fn first_ingest_creates_commit_and_deployment() {
    let (client, ledger, _points) = setup();

    let hash = client
        .ingest(COLLECTION, "faq", &docs(1..3), "v1", Some("tester"))
        .await
        .unwrap();

    assert_eq!(hash.len(), COMMIT_HASH_LEN);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    let commit = ledger.get_commit(&hash).await.unwrap().unwrap();
    assert_eq!(commit.group, "faq");
    assert_eq!(commit.message, "v1");
    assert_eq!(commit.author.as_deref(), Some("tester"));

    let status = client.status(COLLECTION, "faq").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(hash.as_str()));
    assert_eq!(status.active_count, 2);
    assert_eq!(status.total_count, 2);
}

#[tokio::test]
async fn second_ingest_supersedes_first() {
    let (client, _ledger, points) = setup();

    let v1 = client
        .ingest(COLLECTION, "faq", &docs(1..3), "v1", None)
        .await
        .unwrap();
    let v2 = client
        .ingest(COLLECTION, "faq", &docs(3..6), "v2", None)
        .await
        .unwrap();
    assert_ne!(v1, v2);

    for id in 1..3 {
        assert!(!is_active(&points, id), "v1 point {id} should be inactive");
    }
    for id in 3..6 {
        assert!(is_active(&points, id), "v2 point {id} should be active");
    }

    let status = client.status(COLLECTION, "faq").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(v2.as_str()));
    assert_eq!(status.active_count, 3);
    assert_eq!(status.total_count, 5);

    let history = client.history("faq", None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].hash, v2);
    assert_eq!(history[1].hash, v1);
}

#[tokio::test]
async fn rollback_restores_previous_version() {
    let (client, _ledger, points) = setup();

    let v1 = client
        .ingest(COLLECTION, "faq", &docs(1..3), "v1", None)
        .await
        .unwrap();
    client
        .ingest(COLLECTION, "faq", &docs(3..6), "v2", None)
        .await
        .unwrap();

    client.rollback(COLLECTION, "faq", &v1).await.unwrap();

    let status = client.status(COLLECTION, "faq").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(v1.as_str()));
    assert_eq!(status.active_count, 2);

    for id in 1..3 {
        assert!(is_active(&points, id));
    }
    for id in 3..6 {
        assert!(!is_active(&points, id));
    }
}

#[tokio::test]
async fn rollback_to_unknown_commit_fails() {
    let (client, _ledger, _points) = setup();
    client
        .ingest(COLLECTION, "faq", &docs(1..2), "v1", None)
        .await
        .unwrap();

    let err = client
        .rollback(COLLECTION, "faq", "nonexistent")
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClampError::CommitNotFound { commit_hash } if commit_hash == "nonexistent")
    );
}

#[tokio::test]
async fn empty_ingest_is_rejected_before_any_write() {
    let (client, _ledger, points) = setup();

    let err = client
        .ingest(COLLECTION, "faq", &[], "v1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClampError::EmptyDocuments));

    assert_eq!(points.count_total(COLLECTION, "faq").await.unwrap(), 0);
    assert!(client.history("faq", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_vector_names_first_offending_index() {
    let (client, _ledger, points) = setup();
    let batch = vec![
        Document::new().with_id(1u64).with_vector(vec![0.1]).with_field("text", "ok"),
        Document::new().with_id(2u64).with_field("text", "no vector"),
        Document::new().with_id(3u64).with_field("text", "also none"),
    ];

    let err = client
        .ingest(COLLECTION, "faq", &batch, "v1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClampError::MissingVector { index: 1 }));
    assert_eq!(points.count_total(COLLECTION, "faq").await.unwrap(), 0);
}

#[tokio::test]
async fn rollback_across_groups_is_rejected() {
    let (client, _ledger, _points) = setup();
    let policies = client
        .ingest(COLLECTION, "policies", &docs(1..2), "v1", None)
        .await
        .unwrap();
    client
        .ingest(COLLECTION, "faq", &docs(2..3), "v1", None)
        .await
        .unwrap();

    let err = client.rollback(COLLECTION, "faq", &policies).await.unwrap_err();
    match err {
        ClampError::GroupMismatch {
            expected_group,
            actual_group,
        } => {
            assert_eq!(expected_group, "faq");
            assert_eq!(actual_group, "policies");
        }
        other => panic!("expected GroupMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn rollback_without_deployment_is_rejected() {
    let (client, ledger, _points) = setup();
    let hash = client
        .ingest(COLLECTION, "docs", &docs(1..2), "v1", None)
        .await
        .unwrap();

    // Purge, then restore only the commit record: group has history but no
    // active deployment.
    client.delete_group(COLLECTION, "docs").await.unwrap();
    ledger
        .save_commit(&Commit::new(hash.clone(), "docs", "v1", None))
        .await
        .unwrap();

    let err = client.rollback(COLLECTION, "docs", &hash).await.unwrap_err();
    assert!(matches!(err, ClampError::NoDeployment { group } if group == "docs"));
}

#[tokio::test]
async fn self_rollback_is_an_idempotent_noop() {
    let (client, _ledger, points) = setup();
    let hash = client
        .ingest(COLLECTION, "docs", &docs(1..3), "v1", None)
        .await
        .unwrap();

    client.rollback(COLLECTION, "docs", &hash).await.unwrap();

    let status = client.status(COLLECTION, "docs").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(hash.as_str()));
    assert_eq!(status.active_count, 2);
    assert!(is_active(&points, 1) && is_active(&points, 2));
}

#[tokio::test]
async fn groups_are_isolated() {
    let (client, _ledger, _points) = setup();
    let faq_v1 = client
        .ingest(COLLECTION, "faq", &docs(1..3), "faq v1", None)
        .await
        .unwrap();
    client
        .ingest(COLLECTION, "faq", &docs(3..5), "faq v2", None)
        .await
        .unwrap();
    let policies = client
        .ingest(COLLECTION, "policies", &docs(10..13), "policies v1", None)
        .await
        .unwrap();

    client.rollback(COLLECTION, "faq", &faq_v1).await.unwrap();

    let status = client.status(COLLECTION, "policies").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(policies.as_str()));
    assert_eq!(status.active_count, 3);
    assert_eq!(status.total_count, 3);
    assert_eq!(client.history("policies", None).await.unwrap().len(), 1);

    assert_eq!(client.groups().await.unwrap(), vec!["faq", "policies"]);
}

#[tokio::test]
async fn status_of_unknown_group_is_empty_not_an_error() {
    let (client, _ledger, _points) = setup();
    let status = client.status(COLLECTION, "nonexistent").await.unwrap();
    assert_eq!(status.group, "nonexistent");
    assert!(status.active_commit.is_none());
    assert!(status.message.is_none());
    assert_eq!(status.active_count, 0);
    assert_eq!(status.total_count, 0);
}

#[tokio::test]
async fn reingesting_identical_content_is_a_duplicate_commit() {
    let (client, _ledger, points) = setup();
    let batch = docs(1..3);
    let hash = client
        .ingest(COLLECTION, "docs", &batch, "v1", None)
        .await
        .unwrap();

    let err = client
        .ingest(COLLECTION, "docs", &batch, "v1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClampError::DuplicateCommit { commit_hash } if commit_hash == hash));

    // The re-written points stay active; the failed ingest must not leave
    // the group with zero active points.
    assert_eq!(points.count_active(COLLECTION, "docs").await.unwrap(), 2);
}

#[tokio::test]
async fn delete_group_purges_both_stores() {
    let (client, _ledger, points) = setup();
    client
        .ingest(COLLECTION, "docs", &docs(1..3), "v1", None)
        .await
        .unwrap();
    client
        .ingest(COLLECTION, "other", &docs(10..11), "v1", None)
        .await
        .unwrap();

    client.delete_group(COLLECTION, "docs").await.unwrap();

    assert!(client.history("docs", None).await.unwrap().is_empty());
    assert_eq!(points.count_total(COLLECTION, "docs").await.unwrap(), 0);
    assert_eq!(client.groups().await.unwrap(), vec!["other"]);
    assert_eq!(points.count_total(COLLECTION, "other").await.unwrap(), 1);
}

#[tokio::test]
async fn resolve_commit_accepts_unambiguous_prefixes() {
    let (client, _ledger, _points) = setup();
    let v1 = client
        .ingest(COLLECTION, "docs", &docs(1..2), "v1", None)
        .await
        .unwrap();

    let resolved = client.resolve_commit("docs", &v1).await.unwrap();
    assert_eq!(resolved.hash, v1);

    let resolved = client.resolve_commit("docs", &v1[..8]).await.unwrap();
    assert_eq!(resolved.hash, v1);

    let err = client.resolve_commit("docs", "ffffffff").await.unwrap_err();
    assert!(matches!(err, ClampError::CommitNotFound { .. }));

    // Too short to be a prefix.
    let err = client.resolve_commit("docs", &v1[..2]).await.unwrap_err();
    assert!(matches!(err, ClampError::CommitNotFound { .. }));
}

#[tokio::test]
async fn resolve_commit_reports_ambiguous_prefixes() {
    let (client, ledger, _points) = setup();
    client
        .ingest(COLLECTION, "docs", &docs(1..2), "v1", None)
        .await
        .unwrap();
    let real = client.history("docs", None).await.unwrap()[0].hash.clone();

    // Forge a sibling commit sharing the first four characters.
    let mut forged = real.clone();
    forged.replace_range(4..5, if &real[4..5] == "0" { "1" } else { "0" });
    ledger
        .save_commit(&Commit::new(forged, "docs", "forged", None))
        .await
        .unwrap();

    let err = client.resolve_commit("docs", &real[..4]).await.unwrap_err();
    match err {
        ClampError::AmbiguousCommit { prefix, matches } => {
            assert_eq!(prefix, real[..4].to_string());
            assert_eq!(matches.len(), 2);
        }
        other => panic!("expected AmbiguousCommit, got {other:?}"),
    }
}

#[tokio::test]
async fn active_filter_matches_only_deployed_version() {
    let (client, _ledger, _points) = setup();
    let filter = client.active_filter("faq");
    assert_eq!(filter, clamp_points::PointFilter::active("faq"));
}

// ---------------------------------------------------------------------------
// Fault injection at the store seams.

#[derive(Debug, Clone, Copy, PartialEq)]
enum FailOp {
    Upsert,
    Deactivate,
    Activate,
}

struct FailingPointStore {
    inner: MemoryPointStore,
    fail_on: std::sync::Mutex<Option<FailOp>>,
}

impl FailingPointStore {
    fn new() -> Self {
        Self {
            inner: MemoryPointStore::new(),
            fail_on: std::sync::Mutex::new(None),
        }
    }

    fn fail_on(&self, op: FailOp) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    fn trip(&self, op: FailOp) -> Result<(), ClampError> {
        if *self.fail_on.lock().unwrap() == Some(op) {
            return Err(ClampError::points_unavailable("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PointStore for FailingPointStore {
    async fn upsert_tagged(
        &self,
        collection: &str,
        documents: &[Document],
        version: &str,
        group: &str,
    ) -> Result<Vec<PointId>, ClampError> {
        self.trip(FailOp::Upsert)?;
        self.inner.upsert_tagged(collection, documents, version, group).await
    }

    async fn deactivate(&self, collection: &str, group: &str, version: &str) -> Result<u64, ClampError> {
        self.trip(FailOp::Deactivate)?;
        self.inner.deactivate(collection, group, version).await
    }

    async fn activate(&self, collection: &str, group: &str, version: &str) -> Result<u64, ClampError> {
        self.trip(FailOp::Activate)?;
        self.inner.activate(collection, group, version).await
    }

    async fn count_active(&self, collection: &str, group: &str) -> Result<u64, ClampError> {
        self.inner.count_active(collection, group).await
    }

    async fn count_total(&self, collection: &str, group: &str) -> Result<u64, ClampError> {
        self.inner.count_total(collection, group).await
    }

    async fn delete_group_points(&self, collection: &str, group: &str) -> Result<u64, ClampError> {
        self.inner.delete_group_points(collection, group).await
    }
}

struct FailingLedger {
    inner: MemoryLedger,
    fail_set_deployment: AtomicBool,
}

impl FailingLedger {
    fn new() -> Self {
        Self {
            inner: MemoryLedger::new(),
            fail_set_deployment: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Ledger for FailingLedger {
    async fn save_commit(&self, commit: &Commit) -> Result<(), ClampError> {
        self.inner.save_commit(commit).await
    }

    async fn get_commit(&self, commit_hash: &str) -> Result<Option<Commit>, ClampError> {
        self.inner.get_commit(commit_hash).await
    }

    async fn get_history(
        &self,
        group: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>, ClampError> {
        self.inner.get_history(group, limit).await
    }

    async fn get_deployment(
        &self,
        group: &str,
    ) -> Result<Option<clamp_types::Deployment>, ClampError> {
        self.inner.get_deployment(group).await
    }

    async fn set_deployment(&self, group: &str, commit_hash: &str) -> Result<(), ClampError> {
        if self.fail_set_deployment.load(Ordering::SeqCst) {
            return Err(ClampError::ledger_unavailable("injected failure"));
        }
        self.inner.set_deployment(group, commit_hash).await
    }

    async fn list_groups(&self) -> Result<Vec<String>, ClampError> {
        self.inner.list_groups().await
    }

    async fn delete_group(&self, group: &str) -> Result<(), ClampError> {
        self.inner.delete_group(group).await
    }
}

async fn two_versions(client: &ClampClient) -> (String, String) {
    let v1 = client
        .ingest(COLLECTION, "docs", &docs(1..3), "v1", None)
        .await
        .unwrap();
    let v2 = client
        .ingest(COLLECTION, "docs", &docs(3..5), "v2", None)
        .await
        .unwrap();
    (v1, v2)
}

#[tokio::test]
async fn ingest_propagates_store_unavailable() {
    let ledger = Arc::new(MemoryLedger::new());
    let points = Arc::new(FailingPointStore::new());
    let client = ClampClient::new(ledger, points.clone());

    points.fail_on(FailOp::Upsert);
    let err = client
        .ingest(COLLECTION, "docs", &docs(1..2), "v1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ClampError::StoreUnavailable { .. }));
    assert!(client.history("docs", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn rollback_reports_deactivate_stage() {
    let ledger = Arc::new(MemoryLedger::new());
    let points = Arc::new(FailingPointStore::new());
    let client = ClampClient::new(ledger, points.clone());
    let (v1, _v2) = two_versions(&client).await;

    points.fail_on(FailOp::Deactivate);
    let err = client.rollback(COLLECTION, "docs", &v1).await.unwrap_err();
    match err {
        ClampError::RollbackFailed { stage, source } => {
            assert_eq!(stage, RollbackStage::DeactivateCurrent);
            assert!(matches!(*source, ClampError::StoreUnavailable { .. }));
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn rollback_reports_activate_stage() {
    let ledger = Arc::new(MemoryLedger::new());
    let points = Arc::new(FailingPointStore::new());
    let client = ClampClient::new(ledger, points.clone());
    let (v1, v2) = two_versions(&client).await;

    points.fail_on(FailOp::Activate);
    let err = client.rollback(COLLECTION, "docs", &v1).await.unwrap_err();
    assert!(matches!(
        err,
        ClampError::RollbackFailed {
            stage: RollbackStage::ActivateTarget,
            ..
        }
    ));

    // Mixed state: the old version was deactivated, the target was not
    // activated. The pointer still names v2.
    assert_eq!(points.count_active(COLLECTION, "docs").await.unwrap(), 0);
    let status = client.status(COLLECTION, "docs").await.unwrap();
    assert_eq!(status.active_commit.as_deref(), Some(v2.as_str()));
}

#[tokio::test]
async fn rollback_reports_pointer_stage() {
    let ledger = Arc::new(FailingLedger::new());
    let points = Arc::new(MemoryPointStore::new());
    let client = ClampClient::new(ledger.clone(), points);
    let (v1, _v2) = two_versions(&client).await;

    ledger.fail_set_deployment.store(true, Ordering::SeqCst);
    let err = client.rollback(COLLECTION, "docs", &v1).await.unwrap_err();
    assert!(matches!(
        err,
        ClampError::RollbackFailed {
            stage: RollbackStage::UpdatePointer,
            ..
        }
    ));
}
