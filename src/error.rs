//! Commit store error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the commit store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The commit id is already present in the stream header. Re-submitting
    /// the same attempt is harmless; the header is left unchanged.
    #[error("commit {commit_id} already exists in stream {bucket_id}/{stream_id}")]
    DuplicateCommit {
        bucket_id: String,
        stream_id: String,
        commit_id: Uuid,
    },

    /// An etag precondition failed, or the attempt's commit sequence is not
    /// greater than the stream's last committed sequence. The caller may
    /// retry the whole operation after refreshing state.
    #[error("concurrent modification: {0}")]
    Concurrency(String),

    /// All three header descriptor slots failed to yield a parseable header
    /// and the stream is not in the reserved-first-write state. Fatal for the
    /// stream; requires operator action.
    #[error("stream header is unreadable: {0}")]
    InvalidHeaderData(String),

    /// A commit payload failed to deserialize. Fatal for the commit.
    #[error("commit payload is corrupt: {0}")]
    Corrupt(String),

    /// A blob was absent where existence was asserted.
    #[error("not found: {0}")]
    NotFound(String),

    /// The serializer rejected a value on the way in or out.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The store has been disposed; no further operations are accepted.
    #[error("store has been disposed")]
    Disposed,

    /// Any other object-store failure, propagated as-is.
    #[error("object store error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Whether the error is a temporary condition worth retrying.
    ///
    /// `Concurrency` means another writer won the race; re-reading state and
    /// retrying the operation can succeed. `Transport` covers network-level
    /// failures. Everything else is permanent for the given input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Concurrency(_) | Self::Transport(_))
    }
}

/// Result type alias for commit store operations.
pub type StoreResult<T> = Result<T, StoreError>;
