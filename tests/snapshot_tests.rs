//! Snapshot storage tests.

mod common;

use common::{attempt, TestStore};
use pagestream::{meta_keys, ObjectStore, Snapshot};
use serde_json::json;

#[tokio::test]
async fn snapshot_round_trip_honors_max_revision() {
    let ts = TestStore::start().await;

    let snapshot = Snapshot::new("b", "s1", 5, json!({"balance": 42}));
    ts.engine.add_snapshot(&snapshot).await.unwrap();

    let found = ts.engine.get_snapshot("b", "s1", 10).await.unwrap().unwrap();
    assert_eq!(found.stream_revision, 5);
    assert_eq!(found.payload, json!({"balance": 42}));

    // A snapshot newer than the requested revision is not usable.
    assert!(ts.engine.get_snapshot("b", "s1", 4).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_snapshot_is_none() {
    let ts = TestStore::start().await;
    assert!(ts.engine.get_snapshot("b", "s1", 10).await.unwrap().is_none());
}

#[tokio::test]
async fn newer_snapshot_replaces_the_previous_one() {
    let ts = TestStore::start().await;

    ts.engine
        .add_snapshot(&Snapshot::new("b", "s1", 3, json!("old")))
        .await
        .unwrap();
    ts.engine
        .add_snapshot(&Snapshot::new("b", "s1", 8, json!("new")))
        .await
        .unwrap();

    let found = ts.engine.get_snapshot("b", "s1", 100).await.unwrap().unwrap();
    assert_eq!(found.stream_revision, 8);
    assert_eq!(found.payload, json!("new"));

    // Only one snapshot is retained.
    assert!(ts.engine.get_snapshot("b", "s1", 7).await.unwrap().is_none());
}

#[tokio::test]
async fn snapshot_blob_is_not_mistaken_for_a_stream() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    ts.engine
        .add_snapshot(&Snapshot::new("b", "s1", 1, json!("state")))
        .await
        .unwrap();

    // Bucket-wide scans must not surface the snapshot blob as a stream.
    let commits = ts.engine.get_from_bucket_checkpoint("b", 0).await.unwrap();
    assert_eq!(commits.len(), 1);
    let pending = ts.engine.get_undispatched_commits().await.unwrap();
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn zeroed_snapshot_descriptor_reads_as_absent() {
    let ts = TestStore::start().await;

    ts.engine
        .add_snapshot(&Snapshot::new("b", "s1", 5, json!("state")))
        .await
        .unwrap();

    // A torn snapshot write leaves the size descriptor at zero.
    let container = ts.engine.container();
    let mut metadata = ts
        .backing
        .get_blob_properties(container, "b/ss/s1")
        .await
        .unwrap()
        .unwrap()
        .metadata;
    metadata.insert(meta_keys::SNAPSHOT_DATA_SIZE.to_string(), "0".to_string());
    ts.backing
        .set_blob_metadata(container, "b/ss/s1", metadata, None)
        .await
        .unwrap();

    assert!(ts.engine.get_snapshot("b", "s1", 10).await.unwrap().is_none());
}
