//! The commit store engine.
//!
//! One page blob per `(bucket, stream)` pair holds every commit ever written
//! to the stream, followed by a serialized header describing the blob's
//! contents. Appends are crash-safe: metadata descriptors are published
//! before the data write so that a torn write is always recoverable to the
//! previous good header (see [`crate::resolver`]).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::blob::PageBlob;
use crate::checkpoint::CheckpointAllocator;
use crate::config::{StoreOptions, CONTAINER_PREFIX};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    checkpoint_table_name, meta_keys, page_align, BlobCommit, CheckpointLogEntry,
    CommitAttempt, CommitDefinition, HeaderDefinition, Snapshot, StreamBlobHeader, PAGE_SIZE,
};
use crate::resolver::resolve_header;
use crate::serializer::{JsonSerializer, Serializer};
use crate::storage::{ObjectStore, TableInsertOutcome};

/// Bounded retry count for concurrency losses during the dispatch scan.
const UNDISPATCHED_SCAN_RETRIES: u32 = 20;

/// Append-only event-sourced commit store over page blobs.
///
/// All operations are caller-driven; the engine runs no background tasks and
/// holds no lock across network calls. Mutation ordering is delegated to the
/// object store through etag preconditions, so concurrent callers on any
/// thread are safe: exactly one writer per stream wins, the rest see
/// [`StoreError::Concurrency`].
pub struct PageBlobStore<S: Serializer = JsonSerializer> {
    store: Arc<dyn ObjectStore>,
    serializer: S,
    options: StoreOptions,
    container: String,
    checkpoints: CheckpointAllocator,
    initialized: AtomicBool,
    disposed: AtomicBool,
}

impl PageBlobStore<JsonSerializer> {
    /// Creates a store with the default JSON serializer.
    pub fn new(store: Arc<dyn ObjectStore>, options: StoreOptions) -> Self {
        Self::with_serializer(store, JsonSerializer, options)
    }
}

impl<S: Serializer> PageBlobStore<S> {
    pub fn with_serializer(store: Arc<dyn ObjectStore>, serializer: S, options: StoreOptions) -> Self {
        let container = options.stream_container();
        let checkpoints = CheckpointAllocator::new(store.clone());
        Self {
            store,
            serializer,
            options,
            container,
            checkpoints,
            initialized: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Container holding this store's stream blobs.
    pub fn container(&self) -> &str {
        &self.container
    }

    fn guard(&self) -> StoreResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(StoreError::Disposed);
        }
        Ok(())
    }

    fn stream_blob_name(bucket_id: &str, stream_id: &str) -> String {
        format!("{bucket_id}/{stream_id}")
    }

    fn snapshot_blob_name(bucket_id: &str, stream_id: &str) -> String {
        format!("{bucket_id}/ss/{stream_id}")
    }

    fn is_stream_aggregate(metadata: &HashMap<String, String>) -> bool {
        metadata
            .get(meta_keys::IS_EVENT_STREAM_AGGREGATE)
            .map(String::as_str)
            == Some("yes")
    }

    /// Provisions the stream container, the checkpoint blob, and the client
    /// connection pool. Idempotent; repeat calls short-circuit.
    pub async fn initialize(&self) -> StoreResult<()> {
        self.guard()?;
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }
        let result = async {
            self.store
                .create_container_if_not_exists(&self.container)
                .await?;
            self.checkpoints.ensure_provisioned().await?;
            self.store
                .set_connection_limit(self.options.parallel_connection_limit);
            Ok(())
        }
        .await;
        if result.is_err() {
            self.initialized.store(false, Ordering::SeqCst);
        } else {
            info!(container = %self.container, "commit store initialized");
        }
        result
    }

    /// Appends a commit to its stream.
    ///
    /// Descriptor metadata is published before the data write: a crash in
    /// between leaves the primary slot pointing at unwritten pages, which
    /// the resolver detects and falls back from. The returned commit carries
    /// the checkpoint allocated for it.
    pub async fn commit(&self, attempt: CommitAttempt) -> StoreResult<BlobCommit> {
        self.guard()?;
        let name = Self::stream_blob_name(&attempt.bucket_id, &attempt.stream_id);
        let mut blob = PageBlob::create_if_not_exists(
            self.store.clone(),
            &self.container,
            &name,
            self.options.blob_num_pages,
        )
        .await?;

        let (header, good_definition) = resolve_header(&blob, &self.serializer).await?;
        let start_page = header.total_pages_used();

        if header.contains_commit(attempt.commit_id) {
            return Err(StoreError::DuplicateCommit {
                bucket_id: attempt.bucket_id,
                stream_id: attempt.stream_id,
                commit_id: attempt.commit_id,
            });
        }
        if attempt.commit_sequence <= header.last_commit_sequence {
            return Err(StoreError::Concurrency(format!(
                "commit sequence {} is not greater than last committed {}",
                attempt.commit_sequence, header.last_commit_sequence
            )));
        }

        let checkpoint = self.checkpoints.next().await?;
        let commit_sequence = attempt.commit_sequence;
        let commit = BlobCommit::from_attempt(attempt, checkpoint);
        let payload = self.serializer.to_bytes(&commit)?;

        let mut new_header = header.clone();
        new_header.push_definition(
            CommitDefinition {
                data_size_bytes: payload.len() as u32,
                commit_id: commit.commit_id,
                stream_revision: commit.stream_revision,
                commit_stamp: commit.commit_stamp,
                ordinal: header.commit_definitions.len() as u32,
                start_page,
                checkpoint,
                is_dispatched: false,
            },
            commit_sequence,
        );
        let header_bytes = self.serializer.to_bytes(&new_header)?;

        let write_start = start_page as u64 * PAGE_SIZE;
        let header_offset = write_start + payload.len() as u64;
        let total_needed = write_start + page_align(payload.len() as u64 + header_bytes.len() as u64);
        blob.ensure_capacity(total_needed).await?;

        let first_write = good_definition.is_empty();
        let new_definition = HeaderDefinition::new(header_offset, header_bytes.len() as u32);

        let mut metadata = blob.metadata().clone();
        metadata.insert(
            meta_keys::PRIMARY_HEADER_DEFINITION.to_string(),
            new_definition.to_base64(),
        );
        if first_write {
            metadata.insert(meta_keys::FIRST_WRITE_COMPLETED.to_string(), "f".to_string());
        } else {
            metadata.insert(
                meta_keys::FALLBACK_HEADER_DEFINITION.to_string(),
                good_definition.to_base64(),
            );
            metadata.insert(
                meta_keys::TERTIARY_HEADER_DEFINITION.to_string(),
                good_definition.repointed_at(header_offset).to_base64(),
            );
            metadata.insert(meta_keys::FIRST_WRITE_COMPLETED.to_string(), "t".to_string());
        }
        metadata.insert(
            meta_keys::IS_EVENT_STREAM_AGGREGATE.to_string(),
            "yes".to_string(),
        );
        metadata.insert(
            meta_keys::HAS_UNDISPATCHED_COMMITS.to_string(),
            "True".to_string(),
        );
        blob.set_metadata(metadata).await?;

        let mut body = payload;
        body.extend_from_slice(&header_bytes);
        blob.write_pages(write_start, body).await?;

        if first_write {
            // One extra round-trip turns an ambiguous first write into a
            // recoverable one: a crash before this point leaves
            // firstWriteCompleted == "f" and the stream resolves as empty.
            let mut finalize = blob.metadata().clone();
            finalize.insert(meta_keys::FIRST_WRITE_COMPLETED.to_string(), "t".to_string());
            blob.set_metadata(finalize).await?;
        }

        debug!(
            stream = %name,
            checkpoint,
            sequence = commit_sequence,
            pages = new_header.total_pages_used() - start_page,
            "commit appended"
        );
        Ok(commit)
    }

    /// Materializes one commit from its definition by ranged read.
    async fn read_commit(&self, blob: &PageBlob, def: &CommitDefinition) -> StoreResult<BlobCommit> {
        let (start, end) = def.data_range();
        let bytes = blob.download(start, end).await?;
        self.deserialize_commit(&bytes)
    }

    fn deserialize_commit(&self, bytes: &[u8]) -> StoreResult<BlobCommit> {
        self.serializer
            .from_bytes::<BlobCommit>(bytes)
            .map_err(|e| StoreError::Corrupt(e.to_string()))
    }

    /// Commits of one stream whose revisions intersect `[min_rev, max_rev]`,
    /// in commit order. A single contiguous ranged read covers every
    /// candidate commit; out-of-filter commits are dropped in memory.
    pub async fn get_from(
        &self,
        bucket_id: &str,
        stream_id: &str,
        min_rev: u32,
        max_rev: u32,
    ) -> StoreResult<Vec<BlobCommit>> {
        self.guard()?;
        let name = Self::stream_blob_name(bucket_id, stream_id);
        let Some(blob) = PageBlob::open(self.store.clone(), &self.container, &name).await? else {
            return Ok(Vec::new());
        };
        if !Self::is_stream_aggregate(blob.metadata()) {
            return Ok(Vec::new());
        }
        let (header, _) = resolve_header(&blob, &self.serializer).await?;
        let defs = &header.commit_definitions;

        let Some(start_index) = defs.iter().position(|d| d.stream_revision >= min_rev) else {
            return Ok(Vec::new());
        };
        // The first definition at or past max_rev may still contain max_rev;
        // everything after it cannot.
        let end_index = defs
            .iter()
            .position(|d| d.stream_revision >= max_rev)
            .unwrap_or(defs.len() - 1);
        if end_index < start_index {
            return Ok(Vec::new());
        }

        let base = defs[start_index].data_offset();
        let (_, read_end) = defs[end_index].data_range();
        let bytes = blob.download(base, read_end).await?;

        let mut commits = Vec::with_capacity(end_index - start_index + 1);
        for def in &defs[start_index..=end_index] {
            let offset = (def.data_offset() - base) as usize;
            let commit =
                self.deserialize_commit(&bytes[offset..offset + def.data_size_bytes as usize])?;
            if commit.stream_revision >= min_rev && commit.first_stream_revision() <= max_rev {
                commits.push(commit);
            }
        }
        Ok(commits)
    }

    /// Commits of one bucket stamped at or after `start`, ordered by stamp.
    pub async fn get_from_instant(
        &self,
        bucket_id: &str,
        start: DateTime<Utc>,
    ) -> StoreResult<Vec<BlobCommit>> {
        self.get_from_to(bucket_id, start, DateTime::<Utc>::MAX_UTC)
            .await
    }

    /// Commits of one bucket stamped inside `[start, end]`, ordered by stamp.
    pub async fn get_from_to(
        &self,
        bucket_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<BlobCommit>> {
        self.guard()?;
        let prefix = format!("{bucket_id}/");
        let blobs = PageBlob::list(self.store.clone(), &self.container, &prefix).await?;

        let mut commits = Vec::new();
        for blob in blobs {
            if !Self::is_stream_aggregate(blob.metadata()) {
                continue;
            }
            let header = match resolve_header(&blob, &self.serializer).await {
                Ok((header, _)) => header,
                Err(e @ StoreError::InvalidHeaderData(_)) => {
                    error!(blob = blob.name(), error = %e, "skipping unreadable stream during scan");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for def in &header.commit_definitions {
                if def.commit_stamp >= start && def.commit_stamp <= end {
                    commits.push(self.read_commit(&blob, def).await?);
                }
            }
        }
        commits.sort_by_key(|c| c.commit_stamp);
        Ok(commits)
    }

    /// Every commit in the store with checkpoint greater than `token`,
    /// ordered by checkpoint. O(aggregates): every container with the stream
    /// prefix is enumerated and every header resolved.
    pub async fn get_from_checkpoint(&self, token: u64) -> StoreResult<Vec<BlobCommit>> {
        self.guard()?;
        let containers = self.store.list_containers(CONTAINER_PREFIX).await?;
        let mut located = Vec::new();
        for container in containers {
            self.collect_after_checkpoint(&container, "", token, &mut located)
                .await?;
        }
        self.materialize_sorted(located).await
    }

    /// Commits of one bucket with checkpoint greater than `token`, ordered
    /// by checkpoint.
    pub async fn get_from_bucket_checkpoint(
        &self,
        bucket_id: &str,
        token: u64,
    ) -> StoreResult<Vec<BlobCommit>> {
        self.guard()?;
        let prefix = format!("{bucket_id}/");
        let mut located = Vec::new();
        self.collect_after_checkpoint(&self.container, &prefix, token, &mut located)
            .await?;
        self.materialize_sorted(located).await
    }

    async fn collect_after_checkpoint(
        &self,
        container: &str,
        prefix: &str,
        token: u64,
        out: &mut Vec<(String, String, CommitDefinition)>,
    ) -> StoreResult<()> {
        let blobs = PageBlob::list(self.store.clone(), container, prefix).await?;
        for blob in blobs {
            if !Self::is_stream_aggregate(blob.metadata()) {
                continue;
            }
            let header = match resolve_header(&blob, &self.serializer).await {
                Ok((header, _)) => header,
                Err(e @ StoreError::InvalidHeaderData(_)) => {
                    error!(blob = blob.name(), error = %e, "skipping unreadable stream during scan");
                    continue;
                }
                Err(e) => return Err(e),
            };
            for def in header.commit_definitions {
                if def.checkpoint > token {
                    out.push((container.to_string(), blob.name().to_string(), def));
                }
            }
        }
        Ok(())
    }

    async fn materialize_sorted(
        &self,
        mut located: Vec<(String, String, CommitDefinition)>,
    ) -> StoreResult<Vec<BlobCommit>> {
        located.sort_by_key(|(_, _, def)| def.checkpoint);
        let mut commits = Vec::with_capacity(located.len());
        for (container, name, def) in located {
            let blob = PageBlob::open(self.store.clone(), &container, &name)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("blob {container}/{name}")))?;
            commits.push(self.read_commit(&blob, &def).await?);
        }
        Ok(commits)
    }

    /// Every commit not yet marked dispatched, across all streams in this
    /// store, ordered by checkpoint.
    ///
    /// Streams whose header shows nothing undispatched get their
    /// `hasUndispatchedCommits` hint repaired to `"False"` along the way.
    /// Concurrency losses against live writers are retried per stream with a
    /// fresh handle, up to a bounded count.
    pub async fn get_undispatched_commits(&self) -> StoreResult<Vec<BlobCommit>> {
        self.guard()?;
        let listed = PageBlob::list(self.store.clone(), &self.container, "").await?;

        let mut located: Vec<(String, CommitDefinition)> = Vec::new();
        'blobs: for listed_blob in listed {
            if !Self::is_stream_aggregate(listed_blob.metadata()) {
                continue;
            }
            let name = listed_blob.name().to_string();
            let mut attempts = 0;
            loop {
                match self.collect_undispatched_from(&name).await {
                    Ok(defs) => {
                        located.extend(defs.into_iter().map(|d| (name.clone(), d)));
                        continue 'blobs;
                    }
                    Err(StoreError::Concurrency(reason)) => {
                        attempts += 1;
                        if attempts >= UNDISPATCHED_SCAN_RETRIES {
                            return Err(StoreError::Concurrency(reason));
                        }
                    }
                    Err(e @ (StoreError::InvalidHeaderData(_) | StoreError::Corrupt(_))) => {
                        error!(blob = %name, error = %e, "skipping unreadable stream during dispatch scan");
                        continue 'blobs;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        located.sort_by_key(|(_, def)| def.checkpoint);
        let mut commits = Vec::with_capacity(located.len());
        for (name, def) in located {
            let blob = PageBlob::open(self.store.clone(), &self.container, &name)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("blob {}/{name}", self.container)))?;
            commits.push(self.read_commit(&blob, &def).await?);
        }
        Ok(commits)
    }

    /// One pass over one stream blob with a fresh handle: either the list of
    /// undispatched definitions, or an empty list after repairing the hint.
    async fn collect_undispatched_from(&self, name: &str) -> StoreResult<Vec<CommitDefinition>> {
        let Some(mut blob) = PageBlob::open(self.store.clone(), &self.container, name).await?
        else {
            return Ok(Vec::new());
        };
        if blob
            .metadata()
            .get(meta_keys::HAS_UNDISPATCHED_COMMITS)
            .map(String::as_str)
            != Some("True")
        {
            return Ok(Vec::new());
        }
        let (header, _) = resolve_header(&blob, &self.serializer).await?;
        if header.undispatched_commit_count == 0 {
            let mut metadata = blob.metadata().clone();
            metadata.insert(
                meta_keys::HAS_UNDISPATCHED_COMMITS.to_string(),
                "False".to_string(),
            );
            blob.set_metadata(metadata).await?;
            return Ok(Vec::new());
        }
        Ok(header
            .commit_definitions
            .iter()
            .filter(|d| !d.is_dispatched)
            .cloned()
            .collect())
    }

    /// Records downstream publication of `commit`: a checkpoint-table row,
    /// then a header-only rewrite flipping the definition's dispatched flag.
    pub async fn mark_commit_dispatched(&self, commit: &BlobCommit) -> StoreResult<()> {
        self.guard()?;
        self.append_checkpoint_row(commit).await?;

        let name = Self::stream_blob_name(&commit.bucket_id, &commit.stream_id);
        let mut blob = PageBlob::open(self.store.clone(), &self.container, &name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("stream {name}")))?;
        let (mut header, good_definition) = resolve_header(&blob, &self.serializer).await?;

        let Some(def) = header.definition_mut(commit.commit_id) else {
            warn!(stream = %name, commit_id = %commit.commit_id, "dispatch mark for unknown commit ignored");
            return Ok(());
        };
        if def.is_dispatched {
            return Ok(());
        }
        def.is_dispatched = true;
        header.undispatched_commit_count = header.undispatched_commit_count.saturating_sub(1);

        self.rewrite_header_in_place(&mut blob, &header, good_definition)
            .await
    }

    /// Rewrites the header at its current offset without touching commit
    /// pages, using the same descriptor protocol as a commit.
    async fn rewrite_header_in_place(
        &self,
        blob: &mut PageBlob,
        header: &StreamBlobHeader,
        good_definition: HeaderDefinition,
    ) -> StoreResult<()> {
        let header_bytes = self.serializer.to_bytes(header)?;
        let offset = good_definition.header_start_offset;
        let new_definition = HeaderDefinition::new(offset, header_bytes.len() as u32);
        blob.ensure_capacity(page_align(offset + header_bytes.len() as u64))
            .await?;

        let mut metadata = blob.metadata().clone();
        metadata.insert(
            meta_keys::PRIMARY_HEADER_DEFINITION.to_string(),
            new_definition.to_base64(),
        );
        metadata.insert(
            meta_keys::FALLBACK_HEADER_DEFINITION.to_string(),
            good_definition.to_base64(),
        );
        metadata.insert(
            meta_keys::TERTIARY_HEADER_DEFINITION.to_string(),
            good_definition.repointed_at(offset).to_base64(),
        );
        metadata.insert(meta_keys::FIRST_WRITE_COMPLETED.to_string(), "t".to_string());
        metadata.insert(
            meta_keys::HAS_UNDISPATCHED_COMMITS.to_string(),
            if header.undispatched_commit_count > 0 {
                "True".to_string()
            } else {
                "False".to_string()
            },
        );
        blob.set_metadata(metadata).await?;

        // Page writes are 512-aligned; the header rarely starts on a page
        // boundary, so the head fragment of its first page (the tail of the
        // last commit payload) is read back and rewritten untouched.
        let page_start = offset - offset % PAGE_SIZE;
        let mut body = if offset > page_start {
            blob.download(page_start, offset).await?.to_vec()
        } else {
            Vec::new()
        };
        body.extend_from_slice(&header_bytes);
        blob.write_pages(page_start, body).await
    }

    async fn append_checkpoint_row(&self, commit: &BlobCommit) -> StoreResult<()> {
        let table = checkpoint_table_name(&self.options.container_name, &commit.bucket_id);
        let entry = CheckpointLogEntry::for_commit(commit, Utc::now());
        let row_key = entry.commit_id.to_string();
        let outcome = self
            .store
            .insert_or_replace_row(&table, &entry.stream_id, &row_key, entry.to_row())
            .await?;
        if outcome == TableInsertOutcome::TableMissing {
            self.store.create_table(&table).await?;
            self.store
                .insert_or_replace_row(&table, &entry.stream_id, &row_key, entry.to_row())
                .await?;
        }
        Ok(())
    }

    /// Stores `snapshot` as the stream's only retained snapshot.
    pub async fn add_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.guard()?;
        let name = Self::snapshot_blob_name(&snapshot.bucket_id, &snapshot.stream_id);
        let mut blob = PageBlob::create_if_not_exists(
            self.store.clone(),
            &self.container,
            &name,
            self.options.blob_num_pages,
        )
        .await?;

        // Zero the descriptor first so a torn payload write reads as "no
        // snapshot" instead of a truncated one.
        let mut metadata = blob.metadata().clone();
        metadata.insert(meta_keys::SNAPSHOT_DATA_SIZE.to_string(), "0".to_string());
        metadata.insert(
            meta_keys::SNAPSHOT_STREAM_REVISION.to_string(),
            "0".to_string(),
        );
        blob.set_metadata(metadata).await?;

        let payload = self.serializer.to_bytes(&snapshot.payload)?;
        blob.ensure_capacity(page_align(payload.len() as u64)).await?;
        let payload_len = payload.len();
        blob.write_pages(0, payload).await?;

        let mut metadata = blob.metadata().clone();
        metadata.insert(
            meta_keys::SNAPSHOT_DATA_SIZE.to_string(),
            payload_len.to_string(),
        );
        metadata.insert(
            meta_keys::SNAPSHOT_STREAM_REVISION.to_string(),
            snapshot.stream_revision.to_string(),
        );
        blob.set_metadata(metadata).await
    }

    /// The stored snapshot, if one exists at or below `max_revision`.
    pub async fn get_snapshot(
        &self,
        bucket_id: &str,
        stream_id: &str,
        max_revision: u32,
    ) -> StoreResult<Option<Snapshot>> {
        self.guard()?;
        let name = Self::snapshot_blob_name(bucket_id, stream_id);
        let Some(blob) = PageBlob::open(self.store.clone(), &self.container, &name).await? else {
            return Ok(None);
        };
        let size: u64 = blob
            .metadata()
            .get(meta_keys::SNAPSHOT_DATA_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let revision: u32 = blob
            .metadata()
            .get(meta_keys::SNAPSHOT_STREAM_REVISION)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        if size == 0 || revision > max_revision {
            return Ok(None);
        }
        let bytes = blob.download(0, size).await?;
        let payload = self
            .serializer
            .from_bytes(&bytes)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Some(Snapshot {
            bucket_id: bucket_id.to_string(),
            stream_id: stream_id.to_string(),
            stream_revision: revision,
            payload,
        }))
    }

    /// Deletes every stream blob in the store.
    pub async fn purge(&self) -> StoreResult<()> {
        self.guard()?;
        info!(container = %self.container, "purging all buckets");
        self.delete_by_prefix("").await
    }

    /// Deletes every blob belonging to `bucket_id`.
    pub async fn purge_bucket(&self, bucket_id: &str) -> StoreResult<()> {
        self.guard()?;
        info!(container = %self.container, bucket = bucket_id, "purging bucket");
        self.delete_by_prefix(&format!("{bucket_id}/")).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> StoreResult<()> {
        let blobs = PageBlob::list(self.store.clone(), &self.container, prefix).await?;
        for blob in blobs {
            blob.delete().await?;
        }
        Ok(())
    }

    /// Deletes one stream and its snapshot outright. No tombstones.
    pub async fn delete_stream(&self, bucket_id: &str, stream_id: &str) -> StoreResult<()> {
        self.guard()?;
        self.store
            .delete_blob(&self.container, &Self::stream_blob_name(bucket_id, stream_id))
            .await?;
        self.store
            .delete_blob(
                &self.container,
                &Self::snapshot_blob_name(bucket_id, stream_id),
            )
            .await
    }

    /// Deletes the store's container and everything in it.
    pub async fn drop_store(&self) -> StoreResult<()> {
        self.guard()?;
        info!(container = %self.container, "dropping store");
        self.store.delete_container(&self.container).await
    }

    /// Marks the store disposed; every subsequent operation fails with
    /// [`StoreError::Disposed`]. Idempotent.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}
