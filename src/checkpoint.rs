//! Checkpoint allocation.

use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::PAGE_SIZE;
use crate::storage::ObjectStore;

/// Reserved container holding the checkpoint blob.
pub const ROOT_CONTAINER: &str = "$root";

/// Name of the single-page checkpoint blob.
pub const CHECKPOINT_BLOB: &str = "checkpoint";

/// Hands out globally monotonic 64-bit checkpoint numbers.
///
/// Backed by the object store's atomic per-blob sequence-number increment, so
/// uniqueness and monotonicity hold across every stream and every process.
/// The sequence is not dense: a checkpoint allocated for a commit that later
/// fails leaves a hole.
pub struct CheckpointAllocator {
    store: Arc<dyn ObjectStore>,
}

impl CheckpointAllocator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Creates the `$root` container and the one-page checkpoint blob.
    /// Idempotent.
    pub async fn ensure_provisioned(&self) -> StoreResult<()> {
        self.store
            .create_container_if_not_exists(ROOT_CONTAINER)
            .await?;
        self.store
            .create_page_blob_if_not_exists(ROOT_CONTAINER, CHECKPOINT_BLOB, PAGE_SIZE)
            .await?;
        Ok(())
    }

    /// Allocates the next checkpoint number.
    pub async fn next(&self) -> StoreResult<u64> {
        self.store
            .increment_sequence_number(ROOT_CONTAINER, CHECKPOINT_BLOB)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    #[tokio::test]
    async fn checkpoints_are_strictly_increasing() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryObjectStore::new());
        let allocator = CheckpointAllocator::new(store);
        allocator.ensure_provisioned().await.unwrap();
        allocator.ensure_provisioned().await.unwrap();

        let a = allocator.next().await.unwrap();
        let b = allocator.next().await.unwrap();
        let c = allocator.next().await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }
}
