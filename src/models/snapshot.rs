//! Snapshot data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A point-in-time materialization of a stream, stored in a sibling blob.
///
/// Only the latest snapshot per stream is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub bucket_id: String,
    pub stream_id: String,
    /// Stream revision the payload captures.
    pub stream_revision: u32,
    /// Opaque snapshot payload.
    pub payload: Value,
}

impl Snapshot {
    pub fn new(
        bucket_id: impl Into<String>,
        stream_id: impl Into<String>,
        stream_revision: u32,
        payload: Value,
    ) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            stream_id: stream_id.into(),
            stream_revision,
            payload,
        }
    }
}
