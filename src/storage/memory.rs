//! In-memory object store used by the test suite.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{StoreError, StoreResult};
use crate::models::PAGE_SIZE;

use super::{BlobProperties, CreateOutcome, ObjectStore, TableInsertOutcome};

/// Key type for blobs: (container, name).
type BlobKey = (String, String);

/// Key type for table rows: (partition, row).
type RowKey = (String, String);

/// Server-side state of one page blob.
#[derive(Debug)]
struct PageBlobState {
    data: Vec<u8>,
    etag: String,
    sequence_number: u64,
    metadata: HashMap<String, String>,
}

/// In-memory implementation of [`ObjectStore`].
///
/// Faithful to the real service where the engine depends on it: etags change
/// on every mutation, writes must be page-aligned and within the provisioned
/// size, metadata replace is whole-map, and sequence-number increments are
/// atomic.
pub struct MemoryObjectStore {
    containers: DashMap<String, ()>,
    blobs: DashMap<BlobKey, PageBlobState>,
    tables: DashMap<String, DashMap<RowKey, HashMap<String, String>>>,
    etag_counter: AtomicU64,
    connection_limit: AtomicU32,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            containers: DashMap::new(),
            blobs: DashMap::new(),
            tables: DashMap::new(),
            etag_counter: AtomicU64::new(1),
            connection_limit: AtomicU32::new(0),
        }
    }

    fn next_etag(&self) -> String {
        format!("0x{:016X}", self.etag_counter.fetch_add(1, Ordering::Relaxed))
    }

    fn ensure_container(&self, container: &str) -> StoreResult<()> {
        if !self.containers.contains_key(container) {
            return Err(StoreError::NotFound(format!(
                "container {container} does not exist"
            )));
        }
        Ok(())
    }

    /// The connection limit last applied via `set_connection_limit`.
    pub fn connection_limit(&self) -> u32 {
        self.connection_limit.load(Ordering::Relaxed)
    }

    /// Rows currently stored in `table`, for assertions.
    pub fn table_rows(&self, table: &str) -> Vec<HashMap<String, String>> {
        self.tables
            .get(table)
            .map(|t| t.iter().map(|r| r.value().clone()).collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_etag(state: &PageBlobState, if_match: Option<&str>) -> StoreResult<()> {
    if let Some(expected) = if_match {
        if state.etag != expected {
            return Err(StoreError::Concurrency(format!(
                "etag mismatch: expected {expected}, current {}",
                state.etag
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_container_if_not_exists(&self, container: &str) -> StoreResult<CreateOutcome> {
        if self.containers.insert(container.to_string(), ()).is_some() {
            Ok(CreateOutcome::AlreadyExists)
        } else {
            Ok(CreateOutcome::Created)
        }
    }

    async fn delete_container(&self, container: &str) -> StoreResult<()> {
        self.containers.remove(container);
        self.blobs.retain(|(c, _), _| c.as_str() != container);
        Ok(())
    }

    async fn list_containers(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .containers
            .iter()
            .map(|e| e.key().clone())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_page_blob_if_not_exists(
        &self,
        container: &str,
        name: &str,
        size_bytes: u64,
    ) -> StoreResult<CreateOutcome> {
        self.ensure_container(container)?;
        if size_bytes % PAGE_SIZE != 0 {
            return Err(StoreError::Transport(format!(
                "page blob size {size_bytes} is not a multiple of {PAGE_SIZE}"
            )));
        }
        let key = (container.to_string(), name.to_string());
        if self.blobs.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        self.blobs.insert(
            key,
            PageBlobState {
                data: vec![0u8; size_bytes as usize],
                etag: self.next_etag(),
                sequence_number: 0,
                metadata: HashMap::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn get_blob_properties(
        &self,
        container: &str,
        name: &str,
    ) -> StoreResult<Option<BlobProperties>> {
        let key = (container.to_string(), name.to_string());
        Ok(self.blobs.get(&key).map(|state| BlobProperties {
            name: name.to_string(),
            size: state.data.len() as u64,
            etag: state.etag.clone(),
            sequence_number: state.sequence_number,
            metadata: state.metadata.clone(),
        }))
    }

    async fn list_blobs(&self, container: &str, prefix: &str) -> StoreResult<Vec<BlobProperties>> {
        self.ensure_container(container)?;
        let mut out: Vec<BlobProperties> = self
            .blobs
            .iter()
            .filter(|entry| {
                let (c, name) = entry.key();
                c.as_str() == container && name.starts_with(prefix)
            })
            .map(|entry| {
                let state = entry.value();
                BlobProperties {
                    name: entry.key().1.clone(),
                    size: state.data.len() as u64,
                    etag: state.etag.clone(),
                    sequence_number: state.sequence_number,
                    metadata: state.metadata.clone(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn read_range(
        &self,
        container: &str,
        name: &str,
        start: u64,
        end: u64,
    ) -> StoreResult<Bytes> {
        let key = (container.to_string(), name.to_string());
        let state = self
            .blobs
            .get(&key)
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
        if start > end || end > state.data.len() as u64 {
            return Err(StoreError::Transport(format!(
                "range [{start}, {end}) is invalid for blob of {} bytes",
                state.data.len()
            )));
        }
        Ok(Bytes::copy_from_slice(
            &state.data[start as usize..end as usize],
        ))
    }

    async fn write_pages(
        &self,
        container: &str,
        name: &str,
        offset: u64,
        data: Bytes,
        if_match: Option<&str>,
    ) -> StoreResult<String> {
        let key = (container.to_string(), name.to_string());
        let mut state = self
            .blobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
        check_etag(&state, if_match)?;
        if offset % PAGE_SIZE != 0 || data.len() as u64 % PAGE_SIZE != 0 {
            return Err(StoreError::Transport(format!(
                "page write at {offset} of {} bytes is not 512-byte aligned",
                data.len()
            )));
        }
        let end = offset as usize + data.len();
        if end > state.data.len() {
            return Err(StoreError::Transport(format!(
                "page write ends at {end}, blob is {} bytes",
                state.data.len()
            )));
        }
        state.data[offset as usize..end].copy_from_slice(&data);
        state.etag = self.next_etag();
        Ok(state.etag.clone())
    }

    async fn resize_blob(&self, container: &str, name: &str, new_size: u64) -> StoreResult<String> {
        let key = (container.to_string(), name.to_string());
        let mut state = self
            .blobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
        if new_size % PAGE_SIZE != 0 {
            return Err(StoreError::Transport(format!(
                "page blob size {new_size} is not a multiple of {PAGE_SIZE}"
            )));
        }
        state.data.resize(new_size as usize, 0);
        state.etag = self.next_etag();
        Ok(state.etag.clone())
    }

    async fn set_blob_metadata(
        &self,
        container: &str,
        name: &str,
        metadata: HashMap<String, String>,
        if_match: Option<&str>,
    ) -> StoreResult<String> {
        let key = (container.to_string(), name.to_string());
        let mut state = self
            .blobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
        check_etag(&state, if_match)?;
        state.metadata = metadata;
        state.etag = self.next_etag();
        Ok(state.etag.clone())
    }

    async fn increment_sequence_number(&self, container: &str, name: &str) -> StoreResult<u64> {
        let key = (container.to_string(), name.to_string());
        let mut state = self
            .blobs
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
        state.sequence_number += 1;
        state.etag = self.next_etag();
        Ok(state.sequence_number)
    }

    async fn delete_blob(&self, container: &str, name: &str) -> StoreResult<()> {
        let key = (container.to_string(), name.to_string());
        self.blobs.remove(&key);
        Ok(())
    }

    async fn create_table(&self, table: &str) -> StoreResult<()> {
        self.tables.entry(table.to_string()).or_default();
        Ok(())
    }

    async fn insert_or_replace_row(
        &self,
        table: &str,
        partition_key: &str,
        row_key: &str,
        row: HashMap<String, String>,
    ) -> StoreResult<TableInsertOutcome> {
        match self.tables.get(table) {
            Some(rows) => {
                rows.insert((partition_key.to_string(), row_key.to_string()), row);
                Ok(TableInsertOutcome::Inserted)
            }
            None => Ok(TableInsertOutcome::TableMissing),
        }
    }

    fn set_connection_limit(&self, limit: u32) {
        self.connection_limit.store(limit, Ordering::Relaxed);
    }
}
