//! Commit, query, dispatch, and lifecycle tests.

mod common;

use common::{attempt, stamp, TestStore};
use pagestream::{checkpoint_table_name, StoreError};
use serde_json::json;

#[tokio::test]
async fn commit_and_read_back_round_trip() {
    let ts = TestStore::start().await;

    let a = attempt("b", "s1", 1, 1, &["e0", "e1"]);
    let committed = ts.engine.commit(a.clone()).await.unwrap();
    assert_eq!(committed.checkpoint, 1);
    assert_eq!(committed.commit_id, a.commit_id);

    let commits = ts.engine.get_from("b", "s1", 1, 1).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0], committed);
    assert_eq!(commits[0].events, vec![json!("e0"), json!("e1")]);
}

#[tokio::test]
async fn duplicate_commit_id_is_rejected_and_header_unchanged() {
    let ts = TestStore::start().await;

    let a = attempt("b", "s1", 1, 1, &["e0"]);
    ts.engine.commit(a.clone()).await.unwrap();

    let mut replay = attempt("b", "s1", 2, 2, &["e1"]);
    replay.commit_id = a.commit_id;
    let err = ts.engine.commit(replay).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateCommit { .. }));

    let commits = ts.engine.get_from("b", "s1", 1, u32::MAX).await.unwrap();
    assert_eq!(commits.len(), 1);
}

#[tokio::test]
async fn stale_commit_sequence_is_a_concurrency_error() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b", "s1", 1, 1, &["e0"])).await.unwrap();
    ts.engine.commit(attempt("b", "s1", 2, 2, &["e1"])).await.unwrap();

    let err = ts
        .engine
        .commit(attempt("b", "s1", 2, 3, &["late"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Concurrency(_)));
}

#[tokio::test]
async fn concurrent_committers_produce_exactly_one_winner() {
    let ts = TestStore::start().await;
    ts.engine.commit(attempt("b", "s1", 1, 1, &["e0"])).await.unwrap();

    let left = attempt("b", "s1", 2, 2, &["left"]);
    let right = attempt("b", "s1", 2, 2, &["right"]);
    let (a, b) = tokio::join!(ts.engine.commit(left), ts.engine.commit(right));

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, StoreError::Concurrency(_))));

    let commits = ts.engine.get_from("b", "s1", 1, u32::MAX).await.unwrap();
    assert_eq!(commits.len(), 2);
}

#[tokio::test]
async fn checkpoints_are_globally_monotonic_across_streams() {
    let ts = TestStore::start().await;

    let c1 = ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    let c2 = ts.engine.commit(attempt("b", "s2", 1, 1, &["e"])).await.unwrap();
    let c3 = ts.engine.commit(attempt("b", "s1", 2, 2, &["e"])).await.unwrap();
    assert!(c1.checkpoint < c2.checkpoint);
    assert!(c2.checkpoint < c3.checkpoint);
}

#[tokio::test]
async fn revision_range_queries_span_multi_event_commits() {
    let ts = TestStore::start().await;

    // Three commits of two events each: revisions 1-2, 3-4, 5-6.
    ts.engine.commit(attempt("b", "s1", 1, 2, &["a", "b"])).await.unwrap();
    ts.engine.commit(attempt("b", "s1", 2, 4, &["c", "d"])).await.unwrap();
    ts.engine.commit(attempt("b", "s1", 3, 6, &["e", "f"])).await.unwrap();

    // Revision 3 lives inside the second commit.
    let commits = ts.engine.get_from("b", "s1", 3, 3).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].commit_sequence, 2);

    let commits = ts.engine.get_from("b", "s1", 1, 4).await.unwrap();
    assert_eq!(commits.len(), 2);

    let commits = ts.engine.get_from("b", "s1", 5, u32::MAX).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].commit_sequence, 3);

    let commits = ts.engine.get_from("b", "s1", 7, u32::MAX).await.unwrap();
    assert!(commits.is_empty());
}

#[tokio::test]
async fn query_on_absent_stream_is_empty() {
    let ts = TestStore::start().await;
    let commits = ts.engine.get_from("b", "missing", 1, 10).await.unwrap();
    assert!(commits.is_empty());
}

#[tokio::test]
async fn many_commits_force_resize_and_stay_readable() {
    let ts = TestStore::start().await;

    // The blob starts at 8 pages; this overflows it several times.
    for i in 1..=12u32 {
        ts.engine
            .commit(attempt("b", "s1", i, i, &["padding-padding-padding"]))
            .await
            .unwrap();
    }

    let commits = ts.engine.get_from("b", "s1", 1, u32::MAX).await.unwrap();
    assert_eq!(commits.len(), 12);
    for (i, c) in commits.iter().enumerate() {
        assert_eq!(c.commit_sequence, i as u32 + 1);
    }
}

#[tokio::test]
async fn time_window_queries_filter_and_sort_by_stamp() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap(); // stamp(1)
    ts.engine.commit(attempt("b", "s2", 2, 1, &["e"])).await.unwrap(); // stamp(2)
    ts.engine.commit(attempt("b", "s1", 3, 2, &["e"])).await.unwrap(); // stamp(3)

    let commits = ts.engine.get_from_to("b", stamp(2), stamp(2)).await.unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].stream_id, "s2");

    let commits = ts.engine.get_from_instant("b", stamp(2)).await.unwrap();
    assert_eq!(commits.len(), 2);
    assert!(commits[0].commit_stamp <= commits[1].commit_stamp);
}

#[tokio::test]
async fn checkpoint_queries_enumerate_across_buckets_and_streams() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b1", "s1", 1, 1, &["e"])).await.unwrap(); // checkpoint 1
    ts.engine.commit(attempt("b2", "s1", 1, 1, &["e"])).await.unwrap(); // checkpoint 2
    ts.engine.commit(attempt("b1", "s2", 1, 1, &["e"])).await.unwrap(); // checkpoint 3

    let all = ts.engine.get_from_checkpoint(0).await.unwrap();
    assert_eq!(
        all.iter().map(|c| c.checkpoint).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let after = ts.engine.get_from_checkpoint(1).await.unwrap();
    assert_eq!(after.len(), 2);

    let bucket = ts.engine.get_from_bucket_checkpoint("b1", 0).await.unwrap();
    assert_eq!(
        bucket.iter().map(|c| c.checkpoint).collect::<Vec<_>>(),
        vec![1, 3]
    );
}

#[tokio::test]
async fn undispatched_enumeration_and_dispatch_marking() {
    let ts = TestStore::start().await;

    let c1 = ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    let c2 = ts.engine.commit(attempt("b", "s2", 1, 1, &["e"])).await.unwrap();

    let pending = ts.engine.get_undispatched_commits().await.unwrap();
    assert_eq!(
        pending.iter().map(|c| c.checkpoint).collect::<Vec<_>>(),
        vec![c1.checkpoint, c2.checkpoint]
    );

    ts.engine.mark_commit_dispatched(&c1).await.unwrap();
    let pending = ts.engine.get_undispatched_commits().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].commit_id, c2.commit_id);

    // Marking the same commit twice is a no-op.
    ts.engine.mark_commit_dispatched(&c1).await.unwrap();
    let pending = ts.engine.get_undispatched_commits().await.unwrap();
    assert_eq!(pending.len(), 1);

    ts.engine.mark_commit_dispatched(&c2).await.unwrap();
    assert!(ts.engine.get_undispatched_commits().await.unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_marking_appends_to_the_checkpoint_table() {
    let ts = TestStore::start().await;

    let c1 = ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    ts.engine.mark_commit_dispatched(&c1).await.unwrap();

    let rows = ts.backing.table_rows(&checkpoint_table_name("tests", "b"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("commitId").unwrap(), &c1.commit_id.to_string());
    assert_eq!(rows[0].get("checkpoint").unwrap(), "1");
}

#[tokio::test]
async fn dispatched_commits_survive_further_appends() {
    let ts = TestStore::start().await;

    let c1 = ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    ts.engine.mark_commit_dispatched(&c1).await.unwrap();
    let c2 = ts.engine.commit(attempt("b", "s1", 2, 2, &["e"])).await.unwrap();

    let pending = ts.engine.get_undispatched_commits().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].commit_id, c2.commit_id);

    // The stream itself still reads back whole.
    let commits = ts.engine.get_from("b", "s1", 1, u32::MAX).await.unwrap();
    assert_eq!(commits.len(), 2);
}

#[tokio::test]
async fn purge_bucket_leaves_other_buckets_alone() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b1", "s1", 1, 1, &["e"])).await.unwrap();
    ts.engine.commit(attempt("b2", "s1", 1, 1, &["e"])).await.unwrap();

    ts.engine.purge_bucket("b1").await.unwrap();
    assert!(ts.engine.get_from("b1", "s1", 1, 10).await.unwrap().is_empty());
    assert_eq!(ts.engine.get_from("b2", "s1", 1, 10).await.unwrap().len(), 1);

    ts.engine.purge().await.unwrap();
    assert!(ts.engine.get_from("b2", "s1", 1, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_stream_removes_blob_and_snapshot() {
    let ts = TestStore::start().await;

    ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();
    ts.engine
        .add_snapshot(&pagestream::Snapshot::new("b", "s1", 1, json!("state")))
        .await
        .unwrap();

    ts.engine.delete_stream("b", "s1").await.unwrap();
    assert!(ts.engine.get_from("b", "s1", 1, 10).await.unwrap().is_empty());
    assert!(ts.engine.get_snapshot("b", "s1", 10).await.unwrap().is_none());

    // A deleted stream accepts a fresh history.
    let fresh = ts.engine.commit(attempt("b", "s1", 1, 1, &["new"])).await.unwrap();
    assert_eq!(fresh.commit_sequence, 1);
}

#[tokio::test]
async fn initialize_is_idempotent_and_sets_the_connection_limit() {
    let ts = TestStore::start().await;
    ts.engine.initialize().await.unwrap();
    ts.engine.initialize().await.unwrap();
    assert_eq!(
        ts.backing.connection_limit(),
        pagestream::DEFAULT_PARALLEL_CONNECTION_LIMIT
    );
}

#[tokio::test]
async fn disposed_store_rejects_every_operation() {
    let ts = TestStore::start().await;
    ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();

    ts.engine.dispose();
    ts.engine.dispose();

    let err = ts.engine.commit(attempt("b", "s1", 2, 2, &["e"])).await.unwrap_err();
    assert!(matches!(err, StoreError::Disposed));
    let err = ts.engine.get_from("b", "s1", 1, 10).await.unwrap_err();
    assert!(matches!(err, StoreError::Disposed));
    let err = ts.engine.initialize().await.unwrap_err();
    assert!(matches!(err, StoreError::Disposed));
}

#[tokio::test]
async fn drop_store_deletes_the_container() {
    let ts = TestStore::start().await;
    ts.engine.commit(attempt("b", "s1", 1, 1, &["e"])).await.unwrap();

    ts.engine.drop_store().await.unwrap();

    let err = ts.engine.get_from_bucket_checkpoint("b", 0).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
