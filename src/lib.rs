//! Pagestream: append-only event-sourced commit store on page blobs.
//!
//! Each aggregate stream lives in a single page blob holding every commit
//! ever written to it, followed by a serialized header describing the blob's
//! contents. Appends are crash-safe, commits are guarded by optimistic
//! concurrency on their sequence number, torn writes recover deterministically
//! through a three-slot header descriptor chain, and downstream dispatch is
//! tracked at-least-once per commit.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pagestream::{MemoryObjectStore, PageBlobStore, StoreOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = PageBlobStore::new(
//!         Arc::new(MemoryObjectStore::new()),
//!         StoreOptions::new("orders"),
//!     );
//!     store.initialize().await.unwrap();
//! }
//! ```

pub mod blob;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod resolver;
pub mod serializer;
pub mod storage;

// Re-exports for convenience
pub use blob::PageBlob;
pub use checkpoint::{CheckpointAllocator, CHECKPOINT_BLOB, ROOT_CONTAINER};
pub use config::{StoreOptions, DEFAULT_BLOB_NUM_PAGES, DEFAULT_PARALLEL_CONNECTION_LIMIT};
pub use engine::PageBlobStore;
pub use error::{StoreError, StoreResult};
pub use models::{
    checkpoint_table_name, meta_keys, page_align, BlobCommit, CheckpointLogEntry, CommitAttempt,
    CommitDefinition, HeaderDefinition, Snapshot, StreamBlobHeader, PAGE_SIZE,
};
pub use serializer::{JsonSerializer, Serializer};
pub use storage::{
    BlobProperties, CreateOutcome, MemoryObjectStore, ObjectStore, TableInsertOutcome,
};
