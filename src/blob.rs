//! Typed facade over one object-store page blob.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::models::{page_align, PAGE_SIZE};
use crate::storage::{BlobProperties, ObjectStore};

/// A handle to one page blob, carrying the properties observed when it was
/// fetched.
///
/// Handles are cheap and fetched fresh for every engine operation; the etag
/// captured here is the optimistic-concurrency anchor for every conditional
/// write issued through the handle. A handle is never shared across
/// operations.
pub struct PageBlob {
    store: Arc<dyn ObjectStore>,
    container: String,
    name: String,
    size: u64,
    etag: String,
    metadata: HashMap<String, String>,
}

impl PageBlob {
    /// Creates the blob if missing (provisioned at `num_pages` pages) and
    /// returns a fresh handle. The already-exists race is expected and
    /// absorbed.
    pub async fn create_if_not_exists(
        store: Arc<dyn ObjectStore>,
        container: &str,
        name: &str,
        num_pages: u32,
    ) -> StoreResult<Self> {
        store
            .create_page_blob_if_not_exists(container, name, num_pages as u64 * PAGE_SIZE)
            .await?;
        Self::open(store, container, name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))
    }

    /// Opens an existing blob; `None` if it does not exist.
    pub async fn open(
        store: Arc<dyn ObjectStore>,
        container: &str,
        name: &str,
    ) -> StoreResult<Option<Self>> {
        let props = store.get_blob_properties(container, name).await?;
        Ok(props.map(|p| Self::from_properties(store, container, p)))
    }

    /// Wraps already-fetched properties, as produced by a listing.
    pub fn from_properties(
        store: Arc<dyn ObjectStore>,
        container: &str,
        props: BlobProperties,
    ) -> Self {
        Self {
            store,
            container: container.to_string(),
            name: props.name,
            size: props.size,
            etag: props.etag,
            metadata: props.metadata,
        }
    }

    /// Lists blobs under `prefix`, metadata included.
    pub async fn list(
        store: Arc<dyn ObjectStore>,
        container: &str,
        prefix: &str,
    ) -> StoreResult<Vec<Self>> {
        let listed = store.list_blobs(container, prefix).await?;
        Ok(listed
            .into_iter()
            .map(|p| Self::from_properties(store.clone(), container, p))
            .collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Re-fetches properties, replacing the handle's etag anchor.
    pub async fn refresh(&mut self) -> StoreResult<()> {
        let props = self
            .store
            .get_blob_properties(&self.container, &self.name)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("blob {}/{}", self.container, self.name))
            })?;
        self.size = props.size;
        self.etag = props.etag;
        self.metadata = props.metadata;
        Ok(())
    }

    /// Half-open `[start, end)` range read over a fresh request.
    pub async fn download(&self, start: u64, end: u64) -> StoreResult<Bytes> {
        self.store
            .read_range(&self.container, &self.name, start, end)
            .await
    }

    /// Writes `data` at the page-aligned `offset`, zero-padding the tail to
    /// a page boundary, conditional on the handle's etag. The loser of a
    /// concurrent race gets [`StoreError::Concurrency`].
    pub async fn write_pages(&mut self, offset: u64, data: Vec<u8>) -> StoreResult<()> {
        let padded_len = page_align(data.len() as u64) as usize;
        let mut padded = data;
        padded.resize(padded_len, 0);
        self.etag = self
            .store
            .write_pages(
                &self.container,
                &self.name,
                offset,
                Bytes::from(padded),
                Some(&self.etag),
            )
            .await?;
        Ok(())
    }

    /// Extends the blob so that at least `total_bytes` fit. No-op when the
    /// blob is already large enough; blobs are never shrunk.
    pub async fn ensure_capacity(&mut self, total_bytes: u64) -> StoreResult<()> {
        if self.size >= total_bytes {
            return Ok(());
        }
        let new_size = page_align(total_bytes);
        self.etag = self
            .store
            .resize_blob(&self.container, &self.name, new_size)
            .await?;
        self.size = new_size;
        Ok(())
    }

    /// Whole-map metadata replace, conditional on the handle's etag.
    pub async fn set_metadata(&mut self, metadata: HashMap<String, String>) -> StoreResult<()> {
        self.etag = self
            .store
            .set_blob_metadata(
                &self.container,
                &self.name,
                metadata.clone(),
                Some(&self.etag),
            )
            .await?;
        self.metadata = metadata;
        Ok(())
    }

    pub async fn delete(self) -> StoreResult<()> {
        self.store.delete_blob(&self.container, &self.name).await
    }
}
