//! Per-file history extraction over a commit graph
//!
//! [`HistoryExtractor`] is the whole pipeline: list commits, discover the
//! tracked documents at the newest commit, then hand both to a
//! [`BatchScheduler`] that detects content transitions and decodes each
//! distinct blob once.

pub mod assembler;
pub mod detector;
pub mod discovery;
pub mod scheduler;

pub use assembler::VersionAssembler;
pub use detector::{ChangeDetector, CommitSnapshot, ContentChange, PathState};
pub use discovery::{discover_candidates, select_paths};
pub use scheduler::{BatchScheduler, CommitOrder, normalize_chronological};

use crate::cache::DecodeCache;
use crate::config::{Config, DiscoveryConfig, ExtractionConfig};
use crate::decoder::DocumentDecoder;
use crate::error::{ExtractionError, Result};
use crate::progress::{ProgressEvent, ProgressReporter, ProgressStage};
use crate::store::ObjectStore;
use crate::types::{Commit, ExtractionResult, TrackedPath};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Extraction pipeline bound to one object store
pub struct HistoryExtractor {
    store: Arc<dyn ObjectStore>,
    extraction: ExtractionConfig,
    discovery: DiscoveryConfig,
    decoder: DocumentDecoder,
}

impl HistoryExtractor {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            store,
            extraction: config.extraction.clone(),
            discovery: config.discovery.clone(),
            decoder: DocumentDecoder::new(&config.decoder),
        }
    }

    /// Tracked documents present at the newest commit
    pub async fn discover(&self) -> Result<Vec<TrackedPath>> {
        let commits = self.list_commits().await?;
        self.discover_at_newest(&commits).await
    }

    /// Run a full extraction
    ///
    /// `selection` restricts the run to those candidate paths; empty means
    /// every candidate. Setup failures are returned as errors. Once batches
    /// start, failures are per item and the run always produces a result,
    /// partial if `cancel` fires. The final event is `complete`.
    pub async fn extract(
        &self,
        selection: &[String],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let commits = self.list_commits().await?;
        progress.stage(ProgressStage::Commits {
            count: commits.len(),
        });

        let candidates = self.discover_at_newest(&commits).await?;
        let paths = select_paths(candidates, selection);
        if paths.is_empty() {
            return Err(ExtractionError::NoSelectedFiles.into());
        }
        progress.stage(ProgressStage::FilesFound { count: paths.len() });

        // One cache per run; nothing decoded outlives the run
        let cache = DecodeCache::new(self.decoder.clone());
        let scheduler = BatchScheduler::new(self.store.as_ref(), &cache, &self.extraction);
        let result = scheduler
            .run(commits, CommitOrder::NewestFirst, &paths, progress, cancel)
            .await;

        progress.emit(ProgressEvent::Complete(result.clone()));
        Ok(result)
    }

    /// Commits in the store's native order, newest first
    async fn list_commits(&self) -> Result<Vec<Commit>> {
        let commits = self
            .store
            .list_commits()
            .await
            .map_err(|e| ExtractionError::CommitListFailed(e.to_string()))?;

        if commits.is_empty() {
            return Err(ExtractionError::NoCommitsFound.into());
        }

        tracing::info!("Found {} commits", commits.len());
        Ok(commits)
    }

    async fn discover_at_newest(&self, commits: &[Commit]) -> Result<Vec<TrackedPath>> {
        let newest = commits.first().ok_or(ExtractionError::NoCommitsFound)?;

        let candidates = discover_candidates(self.store.as_ref(), &newest.tree_id, &self.discovery)
            .await
            .map_err(|e| ExtractionError::DiscoveryFailed(e.to_string()))?;

        if candidates.is_empty() {
            return Err(ExtractionError::NoTrackedFiles(self.discovery.extension.clone()).into());
        }

        tracing::info!(
            "Found {} {} files at {}",
            candidates.len(),
            self.discovery.extension,
            newest.id.short()
        );
        Ok(candidates)
    }
}
