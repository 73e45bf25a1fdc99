//! Object-store abstraction the commit store runs on.
//!
//! The engine only ever talks to this trait: containers, page blobs with
//! etag-guarded conditional writes, a per-blob key/value metadata map, an
//! atomically incremented per-blob sequence number, and a minimal table
//! primitive for the dispatch checkpoint log.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::StoreResult;

pub mod memory;

pub use memory::MemoryObjectStore;

/// Outcome of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Outcome of a table insert.
///
/// Tables are created on demand; a missing table is an expected state, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableInsertOutcome {
    Inserted,
    TableMissing,
}

/// A point-in-time snapshot of a blob's server-side state.
#[derive(Debug, Clone)]
pub struct BlobProperties {
    pub name: String,
    /// Provisioned size in bytes; always a multiple of 512.
    pub size: u64,
    /// Opaque version tag, changed by every mutation.
    pub etag: String,
    /// Per-blob sequence number.
    pub sequence_number: u64,
    pub metadata: HashMap<String, String>,
}

/// Client operations against the object store.
///
/// Conditional operations take an `if_match` etag; a stale etag fails with
/// [`StoreError::Concurrency`](crate::StoreError::Concurrency). Expected
/// races (blob already exists, table missing) are typed outcomes, never
/// errors.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_container_if_not_exists(&self, container: &str) -> StoreResult<CreateOutcome>;

    /// Deletes a container and everything in it. Idempotent.
    async fn delete_container(&self, container: &str) -> StoreResult<()>;

    /// Container names starting with `prefix`, sorted.
    async fn list_containers(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Creates a zero-filled page blob of `size_bytes` (page-aligned).
    async fn create_page_blob_if_not_exists(
        &self,
        container: &str,
        name: &str,
        size_bytes: u64,
    ) -> StoreResult<CreateOutcome>;

    /// Fresh properties fetch; `None` if the blob does not exist.
    async fn get_blob_properties(
        &self,
        container: &str,
        name: &str,
    ) -> StoreResult<Option<BlobProperties>>;

    /// Blobs whose name starts with `prefix`, with metadata, sorted by name.
    async fn list_blobs(&self, container: &str, prefix: &str) -> StoreResult<Vec<BlobProperties>>;

    /// Half-open `[start, end)` range read.
    async fn read_range(
        &self,
        container: &str,
        name: &str,
        start: u64,
        end: u64,
    ) -> StoreResult<Bytes>;

    /// Page-aligned conditional write. Returns the new etag.
    async fn write_pages(
        &self,
        container: &str,
        name: &str,
        offset: u64,
        data: Bytes,
        if_match: Option<&str>,
    ) -> StoreResult<String>;

    /// Extends (or truncates) the blob to `new_size` (page-aligned).
    /// Returns the new etag.
    async fn resize_blob(&self, container: &str, name: &str, new_size: u64) -> StoreResult<String>;

    /// Whole-map conditional metadata replace. Returns the new etag.
    async fn set_blob_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: HashMap<String, String>,
        if_match: Option<&str>,
    ) -> StoreResult<String>;

    /// Atomically increments the blob's sequence number and returns the new
    /// value.
    async fn increment_sequence_number(&self, container: &str, name: &str) -> StoreResult<u64>;

    /// Deletes a blob. Idempotent.
    async fn delete_blob(&self, container: &str, name: &str) -> StoreResult<()>;

    async fn create_table(&self, table: &str) -> StoreResult<()>;

    /// Upserts a row; reports `TableMissing` instead of failing when the
    /// table has not been created yet.
    async fn insert_or_replace_row(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        row: HashMap<String, String>,
    ) -> StoreResult<TableInsertOutcome>;

    /// Raises the client's parallel connection limit. Idempotent.
    fn set_connection_limit(&self, limit: u32);
}
