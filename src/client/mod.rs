//! Core library client for doc-history
//!
//! This module provides the main entry points for extracting document
//! histories, either from a repository already on disk or from an uploaded
//! repository tree that is staged to a temporary directory first.

use crate::config::Config;
use crate::error::HistoryError;
use crate::history::HistoryExtractor;
use crate::progress::{ProgressEvent, ProgressReporter, ProgressStage};
use crate::staging::{StagingArea, UploadedFile};
use crate::store::{GitObjectStore, ObjectStore};
use crate::types::{ExtractionResult, TrackedPath};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Main client for extracting document histories
///
/// # Example
///
/// ```no_run
/// use doc_history::{HistoryClient, ProgressReporter};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = HistoryClient::new()?;
///     let (progress, mut events) = ProgressReporter::channel();
///
///     tokio::spawn(async move {
///         while let Some(event) = events.recv().await {
///             println!("{:?}", event);
///         }
///     });
///
///     let result = client
///         .extract_history("/path/to/repo".as_ref(), &[], progress, CancellationToken::new())
///         .await?;
///     println!("Extracted {} files", result.files.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HistoryClient {
    pub(crate) config: Arc<Config>,
}

impl HistoryClient {
    /// Create a client from the default configuration file and environment
    pub fn new() -> Result<Self> {
        let config = Config::new().context("Failed to load configuration")?;
        Self::with_config(config)
    }

    /// Create a client with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        tracing::debug!(
            "Batch size: {}, file concurrency: {}, max commits: {}",
            config.extraction.batch_size,
            config.extraction.file_concurrency,
            config.extraction.max_commits
        );
        tracing::debug!("Tracked extension: {}", config.discovery.extension);

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the git repository containing `repo_path`
    pub async fn open_store(&self, repo_path: &Path) -> Result<GitObjectStore> {
        let path = repo_path.to_path_buf();
        let max_commits = self.config.extraction.max_commits;

        let store = tokio::task::spawn_blocking(move || GitObjectStore::discover(&path))
            .await
            .context("Failed to spawn blocking task")?
            .map_err(HistoryError::from)
            .with_context(|| format!("Failed to open repository at {}", repo_path.display()))?;

        Ok(store.with_max_commits(max_commits))
    }

    /// Build an extractor over any object store
    pub fn extractor(&self, store: Arc<dyn ObjectStore>) -> HistoryExtractor {
        HistoryExtractor::new(store, &self.config)
    }

    /// Tracked documents present at the newest commit of a repository
    pub async fn discover_files(&self, repo_path: &Path) -> Result<Vec<TrackedPath>> {
        let store = self.open_store(repo_path).await?;
        let paths = self
            .extractor(Arc::new(store))
            .discover()
            .await
            .context("Failed to discover tracked files")?;
        Ok(paths)
    }

    /// Extract the histories of a repository on disk
    ///
    /// On a fatal failure exactly one `error` event is emitted and the error
    /// is returned; otherwise the last event is `complete`.
    pub async fn extract_history(
        &self,
        repo_path: &Path,
        selection: &[String],
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<ExtractionResult> {
        let outcome = self
            .run_extraction(repo_path, selection, &progress, &cancel)
            .await;
        report_failure(&progress, outcome)
    }

    /// Stage an uploaded repository tree, extract its histories and remove
    /// the staged copy
    pub async fn extract_staged(
        &self,
        files: Vec<UploadedFile>,
        selection: &[String],
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<ExtractionResult> {
        let outcome = async {
            let staging = self.stage(files).await?;
            progress.stage(ProgressStage::Uploaded {
                count: staging.staged_count(),
            });

            let root = staging
                .locate_repository_root()
                .map_err(HistoryError::from)
                .context("Uploaded files do not contain a git repository")?;
            self.run_extraction(&root, selection, &progress, &cancel)
                .await
        }
        .await;

        report_failure(&progress, outcome)
    }

    /// List tracked documents in an uploaded repository tree
    pub async fn discover_staged(&self, files: Vec<UploadedFile>) -> Result<Vec<TrackedPath>> {
        let staging = self.stage(files).await?;
        let root = staging
            .locate_repository_root()
            .map_err(HistoryError::from)
            .context("Uploaded files do not contain a git repository")?;
        self.discover_files(&root).await
    }

    async fn run_extraction(
        &self,
        repo_path: &Path,
        selection: &[String],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ExtractionResult> {
        let store = self.open_store(repo_path).await?;
        let result = self
            .extractor(Arc::new(store))
            .extract(selection, progress, cancel)
            .await
            .with_context(|| format!("Failed to extract history of {}", repo_path.display()))?;
        Ok(result)
    }

    async fn stage(&self, files: Vec<UploadedFile>) -> Result<StagingArea> {
        let excluded_dirs = self.config.discovery.excluded_dirs.clone();

        let staging = tokio::task::spawn_blocking(move || {
            let mut staging = StagingArea::new(excluded_dirs)?;
            staging.stage_all(files)?;
            Ok::<_, crate::error::StagingError>(staging)
        })
        .await
        .context("Failed to spawn blocking task")?
        .context("Failed to stage uploaded files")?;

        Ok(staging)
    }

    /// Normalize a path to a canonical absolute form
    pub fn normalize_path(path: &str) -> Result<PathBuf> {
        std::fs::canonicalize(path).with_context(|| format!("Failed to canonicalize path: {}", path))
    }
}

fn report_failure(
    progress: &ProgressReporter,
    outcome: Result<ExtractionResult>,
) -> Result<ExtractionResult> {
    if let Err(e) = &outcome {
        if is_setup_failure(e) {
            tracing::warn!("Nothing to extract: {:#}", e);
        } else {
            tracing::error!("Extraction failed: {:#}", e);
        }
        progress.emit(ProgressEvent::error(format!("{:#}", e)));
    }
    outcome
}

/// The repository or its tracked documents are missing, as opposed to an
/// I/O or git failure along the way
pub(crate) fn is_setup_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<HistoryError>())
        .any(HistoryError::is_fatal_setup)
}

#[cfg(test)]
mod tests;
