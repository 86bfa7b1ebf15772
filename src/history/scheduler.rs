use super::assembler::VersionAssembler;
use super::detector::{ChangeDetector, CommitSnapshot, ContentChange, snapshot_commit};
use crate::cache::DecodeCache;
use crate::config::ExtractionConfig;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressStage};
use crate::store::ObjectStore;
use crate::types::{Commit, ExtractionResult, FileVersion, TrackedPath};
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one extraction run over a chronological commit list
///
/// Commits are processed in fixed-size batches. Within a batch, path lookups
/// run concurrently, change detection runs in commit order, and blob decoding
/// runs concurrently through the shared [`DecodeCache`]. Results do not depend
/// on the batch size or the concurrency width.
pub struct BatchScheduler<'a> {
    store: &'a dyn ObjectStore,
    cache: &'a DecodeCache,
    batch_size: usize,
    file_concurrency: usize,
    detector: ChangeDetector,
    assembler: VersionAssembler,
}

/// Direction of a commit list as handed over by its producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOrder {
    /// Native log order of an [`ObjectStore`]: children before parents
    NewestFirst,
    OldestFirst,
}

/// A change waiting to be decoded, with the chronological position of its commit
struct PendingVersion<'c> {
    sequence: usize,
    commit: &'c Commit,
    change: ContentChange,
}

impl<'a> BatchScheduler<'a> {
    pub fn new(store: &'a dyn ObjectStore, cache: &'a DecodeCache, config: &ExtractionConfig) -> Self {
        Self {
            store,
            cache,
            batch_size: config.batch_size.max(1),
            file_concurrency: config.file_concurrency.max(1),
            detector: ChangeDetector::new(),
            assembler: VersionAssembler::new(),
        }
    }

    /// Process every commit (or up to cancellation) and return the histories
    ///
    /// `order` is the direction `commits` already runs in. Emits a
    /// `processing` event after each batch, a `cancelled` event when stopped
    /// early, and a `file` event per finished history.
    pub async fn run(
        mut self,
        mut commits: Vec<Commit>,
        order: CommitOrder,
        paths: &[TrackedPath],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        let start = Instant::now();
        normalize_chronological(&mut commits, order);

        let total = commits.len();
        let mut processed = 0;
        let mut cancelled = false;

        tracing::info!(
            "Extracting {} files over {} commits (batch size {}, concurrency {})",
            paths.len(),
            total,
            self.batch_size,
            self.file_concurrency
        );

        for (batch_index, batch) in commits.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::info!("Extraction cancelled after {}/{} commits", processed, total);
                cancelled = true;
                break;
            }

            let base = batch_index * self.batch_size;
            let snapshots = self.snapshot_batch(batch, paths).await;

            let mut pending = Vec::new();
            for (offset, (commit, snapshot)) in batch.iter().zip(&snapshots).enumerate() {
                for change in self.detector.observe(snapshot) {
                    pending.push(PendingVersion {
                        sequence: base + offset,
                        commit,
                        change,
                    });
                }
            }

            let changed = pending.len();
            self.decode_batch(pending).await;

            processed += batch.len();
            progress.stage(ProgressStage::Processing { processed, total });
            tracing::debug!(
                "Batch {}: {} commits, {} changes, {}/{} processed",
                batch_index,
                batch.len(),
                changed,
                processed,
                total
            );
        }

        if cancelled {
            progress.emit(ProgressEvent::Cancelled { processed, total });
        }

        let result = self.assembler.finish(total, cancelled);
        for file in &result.files {
            progress.emit(ProgressEvent::File {
                path: file.path.clone(),
                version_count: file.versions.len(),
            });
        }

        tracing::info!(
            "Extracted {} versions across {} files from {} commits in {:.2}s ({} blobs decoded)",
            result.version_count(),
            result.files.len(),
            processed,
            start.elapsed().as_secs_f64(),
            self.cache.decode_count()
        );

        result
    }

    /// Resolve the tracked paths at every commit of the batch concurrently
    async fn snapshot_batch(&self, batch: &[Commit], paths: &[TrackedPath]) -> Vec<CommitSnapshot> {
        let store = self.store;
        let width = self.file_concurrency;

        let mut snapshots: Vec<(usize, CommitSnapshot)> = stream::iter(batch.iter().enumerate())
            .map(|(index, commit)| async move {
                (index, snapshot_commit(store, commit, paths, width).await)
            })
            .buffer_unordered(batch.len().max(1))
            .collect()
            .await;

        snapshots.sort_by_key(|(index, _)| *index);
        snapshots.into_iter().map(|(_, snapshot)| snapshot).collect()
    }

    /// Fetch and decode every pending change, isolating failures per change
    async fn decode_batch(&mut self, pending: Vec<PendingVersion<'_>>) {
        let store = self.store;
        let cache = self.cache;
        let width = self.batch_size * self.file_concurrency;

        let decoded: Vec<_> = stream::iter(pending)
            .map(|item| async move {
                let text = cache
                    .get_or_decode(&item.change.object_id, || {
                        store.read_blob(&item.change.object_id)
                    })
                    .await;
                (item, text)
            })
            .buffer_unordered(width)
            .collect()
            .await;

        for (item, text) in decoded {
            match text {
                Ok(text) => {
                    let version = FileVersion::from_commit(
                        item.commit,
                        item.change.object_id,
                        text.to_string(),
                    );
                    self.assembler.push(item.change.path, item.sequence, version);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping {} at {}: {}",
                        item.change.path,
                        item.commit.id.short(),
                        e
                    );
                }
            }
        }
    }
}

/// Put commits oldest first
///
/// The direction comes from the producer of the list, never from commit
/// timestamps: those have one-second resolution and follow the committer's
/// clock.
pub fn normalize_chronological(commits: &mut [Commit], order: CommitOrder) {
    if order == CommitOrder::NewestFirst {
        commits.reverse();
    }
}
