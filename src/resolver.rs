//! Header resolution through the descriptor chain.
//!
//! A commit updates both blob pages and blob metadata, and either can be
//! torn or rejected. Three descriptor slots in metadata make the last fully
//! written header recoverable:
//!
//! - `primary` is the intended descriptor for the most recent write,
//! - `fallback` is the previous committed descriptor, still valid because
//!   its pages were never overwritten,
//! - `tertiary` is a clone of the previous descriptor re-pointed at the new
//!   header offset, covering a write that landed without the primary slot
//!   being readable.

use tracing::warn;

use crate::blob::PageBlob;
use crate::error::{StoreError, StoreResult};
use crate::models::{meta_keys, HeaderDefinition, StreamBlobHeader};
use crate::serializer::Serializer;

/// Marks a stream whose first write was reserved but never completed.
const FIRST_WRITE_PENDING: &str = "f";

/// Locates the newest fully written header of `blob`.
///
/// Returns the header together with the descriptor it was read through; that
/// descriptor is the anchor for the next write. A stream with no
/// `primaryHeaderDefinition` metadata key, or one abandoned mid-first-write,
/// resolves to an empty header with an empty descriptor.
///
/// # Errors
///
/// [`StoreError::InvalidHeaderData`] when every slot fails and the stream is
/// not in the reserved-first-write state. The blob is corrupt at that point
/// and requires operator intervention.
pub async fn resolve_header<S: Serializer>(
    blob: &PageBlob,
    serializer: &S,
) -> StoreResult<(StreamBlobHeader, HeaderDefinition)> {
    let metadata = blob.metadata();
    if !metadata.contains_key(meta_keys::PRIMARY_HEADER_DEFINITION) {
        return Ok((StreamBlobHeader::default(), HeaderDefinition::default()));
    }

    let slots = [
        ("primary", meta_keys::PRIMARY_HEADER_DEFINITION),
        ("fallback", meta_keys::FALLBACK_HEADER_DEFINITION),
        ("tertiary", meta_keys::TERTIARY_HEADER_DEFINITION),
    ];

    let mut last_failure: Option<StoreError> = None;
    for (slot, key) in slots {
        let Some(encoded) = metadata.get(key) else {
            continue;
        };
        let definition = match HeaderDefinition::from_base64(encoded) {
            Ok(d) => d,
            Err(e) => {
                last_failure = Some(e);
                continue;
            }
        };
        if definition.is_empty() {
            continue;
        }
        let (start, end) = definition.byte_range();
        if end > blob.size() {
            last_failure = Some(StoreError::InvalidHeaderData(format!(
                "{slot} descriptor [{start}, {end}) exceeds blob size {}",
                blob.size()
            )));
            continue;
        }
        let bytes = match blob.download(start, end).await {
            Ok(b) => b,
            Err(e) => {
                last_failure = Some(e);
                continue;
            }
        };
        match serializer.from_bytes::<StreamBlobHeader>(&bytes) {
            Ok(header) => {
                if slot != "primary" {
                    warn!(
                        blob = blob.name(),
                        slot, "primary header descriptor was torn, recovered via {slot} slot"
                    );
                }
                return Ok((header, definition));
            }
            Err(e) => last_failure = Some(e),
        }
    }

    if metadata
        .get(meta_keys::FIRST_WRITE_COMPLETED)
        .map(String::as_str)
        == Some(FIRST_WRITE_PENDING)
    {
        // Reserved-but-never-completed first write: the stream is empty.
        return Ok((StreamBlobHeader::default(), HeaderDefinition::default()));
    }

    Err(StoreError::InvalidHeaderData(format!(
        "no descriptor slot yielded a parseable header for {}: {}",
        blob.name(),
        last_failure
            .map(|e| e.to_string())
            .unwrap_or_else(|| "all slots empty".to_string())
    )))
}
