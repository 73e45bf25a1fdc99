//! Commit data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// A commit proposed by the caller, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAttempt {
    /// Tenant / namespace partition.
    pub bucket_id: String,
    /// Aggregate identity within the bucket.
    pub stream_id: String,
    /// Idempotency key for the commit.
    pub commit_id: Uuid,
    /// Dense per-stream sequence, starting at 1.
    pub commit_sequence: u32,
    /// Stream revision after this commit's events are applied.
    pub stream_revision: u32,
    /// Caller-supplied commit timestamp.
    pub commit_stamp: DateTime<Utc>,
    /// Opaque commit-level headers.
    pub headers: HashMap<String, Value>,
    /// Ordered opaque event bodies.
    pub events: Vec<Value>,
}

/// A persisted commit as stored inside the stream blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobCommit {
    pub bucket_id: String,
    pub stream_id: String,
    pub commit_id: Uuid,
    pub commit_sequence: u32,
    pub stream_revision: u32,
    pub commit_stamp: DateTime<Utc>,
    /// Globally monotonic ordering number assigned at commit time.
    pub checkpoint: u64,
    pub headers: HashMap<String, Value>,
    pub events: Vec<Value>,
}

impl BlobCommit {
    /// Binds an attempt to its allocated checkpoint.
    pub fn from_attempt(attempt: CommitAttempt, checkpoint: u64) -> Self {
        Self {
            bucket_id: attempt.bucket_id,
            stream_id: attempt.stream_id,
            commit_id: attempt.commit_id,
            commit_sequence: attempt.commit_sequence,
            stream_revision: attempt.stream_revision,
            commit_stamp: attempt.commit_stamp,
            checkpoint,
            headers: attempt.headers,
            events: attempt.events,
        }
    }

    /// First stream revision covered by this commit.
    pub fn first_stream_revision(&self) -> u32 {
        self.stream_revision
            .saturating_sub(self.events.len().saturating_sub(1) as u32)
    }
}

/// One row of the per-bucket dispatch checkpoint table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointLogEntry {
    pub bucket_id: String,
    pub stream_id: String,
    pub commit_id: Uuid,
    pub checkpoint: u64,
    pub dispatched_at: DateTime<Utc>,
}

impl CheckpointLogEntry {
    pub fn for_commit(commit: &BlobCommit, dispatched_at: DateTime<Utc>) -> Self {
        Self {
            bucket_id: commit.bucket_id.clone(),
            stream_id: commit.stream_id.clone(),
            commit_id: commit.commit_id,
            checkpoint: commit.checkpoint,
            dispatched_at,
        }
    }

    /// Table rows are flat string maps on the wire.
    pub fn to_row(&self) -> HashMap<String, String> {
        HashMap::from([
            ("streamId".to_string(), self.stream_id.clone()),
            ("commitId".to_string(), self.commit_id.to_string()),
            ("checkpoint".to_string(), self.checkpoint.to_string()),
            ("dispatchedAt".to_string(), self.dispatched_at.to_rfc3339()),
        ])
    }
}

/// Name of the per-bucket dispatch checkpoint table.
pub fn checkpoint_table_name(container_name: &str, bucket_id: &str) -> String {
    format!("chpt{container_name}{bucket_id}")
}
