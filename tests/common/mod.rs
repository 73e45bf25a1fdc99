//! Common test utilities.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use pagestream::{CommitAttempt, MemoryObjectStore, PageBlobStore, StoreOptions};

/// An engine over a fresh in-memory object store.
pub struct TestStore {
    pub engine: PageBlobStore,
    pub backing: Arc<MemoryObjectStore>,
}

impl TestStore {
    /// Builds and initializes a store provisioned small enough that resize
    /// paths get exercised by ordinary tests.
    pub async fn start() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        let backing = Arc::new(MemoryObjectStore::new());
        let engine = PageBlobStore::new(
            backing.clone(),
            StoreOptions::new("tests").with_blob_num_pages(8),
        );
        engine.initialize().await.unwrap();
        Self { engine, backing }
    }
}

/// Deterministic timestamps spaced a second apart.
pub fn stamp(offset_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap()
}

/// A commit attempt with one event per revision step and a fresh commit id.
pub fn attempt(
    bucket: &str,
    stream: &str,
    sequence: u32,
    revision: u32,
    events: &[&str],
) -> CommitAttempt {
    CommitAttempt {
        bucket_id: bucket.to_string(),
        stream_id: stream.to_string(),
        commit_id: Uuid::new_v4(),
        commit_sequence: sequence,
        stream_revision: revision,
        commit_stamp: stamp(sequence as i64),
        headers: HashMap::new(),
        events: events.iter().map(|e| json!(e)).collect(),
    }
}
