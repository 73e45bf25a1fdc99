//! Stream blob header model, descriptor codec, and page math.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// 512-byte addressable unit of the underlying page-blob primitive.
pub const PAGE_SIZE: u64 = 512;

/// Rounds `n` up to the next page boundary.
pub fn page_align(n: u64) -> u64 {
    n.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// Metadata keys persisted on each stream blob.
///
/// These strings are wire format: they must match what existing stores carry,
/// including the historical misspelling of the tertiary key.
pub mod meta_keys {
    /// Literal `"yes"` once the blob holds at least one commit.
    pub const IS_EVENT_STREAM_AGGREGATE: &str = "isEventStreamAggregate";
    /// `"True"`/`"False"` hint for the dispatch scan.
    pub const HAS_UNDISPATCHED_COMMITS: &str = "hasUndispatchedCommits";
    /// `"t"` after the first commit fully persisted, `"f"` between reserving
    /// the primary descriptor and completing the first write.
    pub const FIRST_WRITE_COMPLETED: &str = "firstWriteCompleted";
    /// Intended descriptor for the most recent write.
    pub const PRIMARY_HEADER_DEFINITION: &str = "primaryHeaderDefinition";
    /// Previous committed descriptor, still valid because its pages were
    /// never overwritten.
    pub const FALLBACK_HEADER_DEFINITION: &str = "fallbackHeaderDefinition";
    /// Clone of the previous descriptor re-pointed at the new header offset.
    /// The key is misspelled on the wire; existing stores depend on it.
    pub const TERTIARY_HEADER_DEFINITION: &str = "tertiaryHeaderDefintionKey";

    /// Snapshot blob: serialized payload size in bytes.
    pub const SNAPSHOT_DATA_SIZE: &str = "ss_data_size_bytes";
    /// Snapshot blob: stream revision the snapshot captures.
    pub const SNAPSHOT_STREAM_REVISION: &str = "ss_stream_revision";
}

/// Per-commit entry in the stream blob header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDefinition {
    /// Serialized commit payload size in bytes.
    pub data_size_bytes: u32,
    /// Commit identity.
    pub commit_id: Uuid,
    /// Stream revision after this commit's events are applied.
    pub stream_revision: u32,
    /// Caller-supplied commit timestamp.
    pub commit_stamp: DateTime<Utc>,
    /// Position of this commit within the stream, dense from 0.
    pub ordinal: u32,
    /// First page of the commit payload within the blob.
    pub start_page: u32,
    /// Globally monotonic checkpoint number.
    pub checkpoint: u64,
    /// Whether downstream publication has been confirmed.
    pub is_dispatched: bool,
}

impl CommitDefinition {
    /// Number of whole pages the payload occupies.
    pub fn total_pages_used(&self) -> u32 {
        (page_align(self.data_size_bytes as u64) / PAGE_SIZE) as u32
    }

    /// Byte offset of the payload within the blob.
    pub fn data_offset(&self) -> u64 {
        self.start_page as u64 * PAGE_SIZE
    }

    /// Half-open byte range `[start, end)` holding the payload.
    pub fn data_range(&self) -> (u64, u64) {
        let start = self.data_offset();
        (start, start + self.data_size_bytes as u64)
    }
}

/// Serialized header appended to the stream blob after all commit payloads.
///
/// Rewritten on every commit and on every dispatch flip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBlobHeader {
    /// One entry per commit, in ordinal order.
    pub commit_definitions: Vec<CommitDefinition>,
    /// Count of definitions with `is_dispatched == false`.
    pub undispatched_commit_count: u32,
    /// Highest commit sequence ever accepted by the stream.
    pub last_commit_sequence: u32,
}

impl StreamBlobHeader {
    /// Total pages consumed by all commit payloads; the next commit's
    /// start page.
    pub fn total_pages_used(&self) -> u32 {
        self.commit_definitions
            .iter()
            .map(CommitDefinition::total_pages_used)
            .sum()
    }

    pub fn contains_commit(&self, commit_id: Uuid) -> bool {
        self.commit_definitions
            .iter()
            .any(|d| d.commit_id == commit_id)
    }

    pub fn definition_mut(&mut self, commit_id: Uuid) -> Option<&mut CommitDefinition> {
        self.commit_definitions
            .iter_mut()
            .find(|d| d.commit_id == commit_id)
    }

    /// Appends a definition and updates the counters.
    pub fn push_definition(&mut self, definition: CommitDefinition, commit_sequence: u32) {
        self.commit_definitions.push(definition);
        self.undispatched_commit_count += 1;
        self.last_commit_sequence = commit_sequence;
    }
}

/// Descriptor naming where a serialized header lives in the blob.
///
/// Persisted in blob metadata as base64 of `offset: u64 LE || size: u32 LE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderDefinition {
    /// Byte offset of the serialized header (not page-aligned).
    pub header_start_offset: u64,
    /// Serialized header size in bytes.
    pub header_size: u32,
}

impl HeaderDefinition {
    pub fn new(header_start_offset: u64, header_size: u32) -> Self {
        Self {
            header_start_offset,
            header_size,
        }
    }

    /// An empty descriptor marks a stream with no readable header.
    pub fn is_empty(&self) -> bool {
        self.header_size == 0
    }

    /// Half-open byte range `[start, end)` holding the header.
    pub fn byte_range(&self) -> (u64, u64) {
        (
            self.header_start_offset,
            self.header_start_offset + self.header_size as u64,
        )
    }

    /// Returns a copy re-pointed at `offset`, keeping the recorded size.
    pub fn repointed_at(&self, offset: u64) -> Self {
        Self {
            header_start_offset: offset,
            header_size: self.header_size,
        }
    }

    pub fn to_base64(&self) -> String {
        let mut packed = [0u8; 12];
        packed[..8].copy_from_slice(&self.header_start_offset.to_le_bytes());
        packed[8..].copy_from_slice(&self.header_size.to_le_bytes());
        BASE64.encode(packed)
    }

    pub fn from_base64(encoded: &str) -> StoreResult<Self> {
        let packed = BASE64.decode(encoded).map_err(|e| {
            StoreError::InvalidHeaderData(format!("descriptor is not valid base64: {e}"))
        })?;
        if packed.len() != 12 {
            return Err(StoreError::InvalidHeaderData(format!(
                "descriptor must be 12 bytes, got {}",
                packed.len()
            )));
        }
        let mut offset = [0u8; 8];
        let mut size = [0u8; 4];
        offset.copy_from_slice(&packed[..8]);
        size.copy_from_slice(&packed[8..]);
        Ok(Self {
            header_start_offset: u64::from_le_bytes(offset),
            header_size: u32::from_le_bytes(size),
        })
    }
}
