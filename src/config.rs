//! Store configuration.

/// Prefix shared by every stream container, ahead of the configured name.
pub const CONTAINER_PREFIX: &str = "evsrc";

/// Default number of 512-byte pages provisioned for a new stream blob.
///
/// Enough for a handful of small commits before the first resize.
pub const DEFAULT_BLOB_NUM_PAGES: u32 = 200;

/// Default parallel connection limit applied to the object-store client pool
/// on first `initialize()`.
pub const DEFAULT_PARALLEL_CONNECTION_LIMIT: u32 = 10;

/// Configuration options for a [`PageBlobStore`](crate::engine::PageBlobStore).
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Lowercase tail of the container name. The container used for stream
    /// blobs is `"evsrc"` + this value, lowercased.
    pub container_name: String,
    /// Initial provisioning of a stream blob, in 512-byte pages.
    pub blob_num_pages: u32,
    /// Connection-pool limit set into the object-store client at first
    /// `initialize()`.
    pub parallel_connection_limit: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            container_name: "default".to_string(),
            blob_num_pages: DEFAULT_BLOB_NUM_PAGES,
            parallel_connection_limit: DEFAULT_PARALLEL_CONNECTION_LIMIT,
        }
    }
}

impl StoreOptions {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            ..Self::default()
        }
    }

    pub fn with_blob_num_pages(mut self, pages: u32) -> Self {
        self.blob_num_pages = pages;
        self
    }

    pub fn with_parallel_connection_limit(mut self, limit: u32) -> Self {
        self.parallel_connection_limit = limit;
        self
    }

    /// Returns the full container name for stream blobs.
    pub fn stream_container(&self) -> String {
        format!("{CONTAINER_PREFIX}{}", self.container_name.to_lowercase())
    }
}
