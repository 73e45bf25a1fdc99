//! Pluggable payload serialization.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{StoreError, StoreResult};

/// Byte-level serialization seam for commits, headers, and snapshot payloads.
///
/// The engine never prescribes a wire format for what it stores inside blob
/// pages; it hands whole values to the serializer and stores whatever bytes
/// come back. Implementations must be deterministic enough that
/// `from_bytes(to_bytes(v)) == v`.
pub trait Serializer: Send + Sync {
    fn to_bytes<T: Serialize>(&self, value: &T) -> StoreResult<Vec<u8>>;

    fn from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T>;
}

/// JSON serializer backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn to_bytes<T: Serialize>(&self, value: &T) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn from_bytes<T: DeserializeOwned>(&self, bytes: &[u8]) -> StoreResult<T> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
