//! Temporary on-disk copy of an uploaded repository
//!
//! Uploaded files are written under a fresh temporary directory, the
//! repository root is located by its `.git` directory, and the whole tree is
//! removed when the [`StagingArea`] is dropped, whether the extraction
//! succeeded, failed or was cancelled.

use crate::error::StagingError;
use crate::paths::is_excluded_path;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// One uploaded file and its path relative to the upload root
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }
}

pub struct StagingArea {
    dir: TempDir,
    excluded_dirs: Vec<String>,
    staged: usize,
    skipped: usize,
}

impl StagingArea {
    /// Create a staging area under the system temporary directory
    pub fn new(excluded_dirs: Vec<String>) -> Result<Self, StagingError> {
        let dir = tempfile::Builder::new()
            .prefix("doc-history-")
            .tempdir()
            .map_err(|e| StagingError::CreateFailed(e.to_string()))?;
        Ok(Self::with_dir(dir, excluded_dirs))
    }

    /// Create a staging area under `parent`
    pub fn new_in(parent: &Path, excluded_dirs: Vec<String>) -> Result<Self, StagingError> {
        let dir = tempfile::Builder::new()
            .prefix("doc-history-")
            .tempdir_in(parent)
            .map_err(|e| StagingError::CreateFailed(e.to_string()))?;
        Ok(Self::with_dir(dir, excluded_dirs))
    }

    fn with_dir(dir: TempDir, excluded_dirs: Vec<String>) -> Self {
        tracing::debug!("Created staging area at {}", dir.path().display());
        Self {
            dir,
            excluded_dirs,
            staged: 0,
            skipped: 0,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of files written so far
    pub fn staged_count(&self) -> usize {
        self.staged
    }

    /// Number of files dropped because they lie in a reserved directory
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    /// Write one file into the staging area
    ///
    /// Returns `Ok(false)` when the file lies in a reserved directory and was
    /// not written. Absolute paths and paths leaving the staging root are
    /// rejected.
    pub fn stage_file(&mut self, relative: &str, bytes: &[u8]) -> Result<bool, StagingError> {
        let normalized = relative.replace('\\', "/");
        if is_excluded_path(&normalized, &self.excluded_dirs) {
            self.skipped += 1;
            return Ok(false);
        }

        let target = self.resolve(&normalized)?;
        let write_failed = |e: std::io::Error| StagingError::WriteFailed {
            path: normalized.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }
        fs::write(&target, bytes).map_err(write_failed)?;

        self.staged += 1;
        Ok(true)
    }

    /// Write every uploaded file, returning how many were written
    pub fn stage_all(
        &mut self,
        files: impl IntoIterator<Item = UploadedFile>,
    ) -> Result<usize, StagingError> {
        for file in files {
            self.stage_file(&file.path, &file.bytes)?;
        }

        tracing::info!(
            "Staged {} files ({} skipped in reserved directories)",
            self.staged,
            self.skipped
        );
        Ok(self.staged)
    }

    /// Directory containing the shallowest `.git` directory
    pub fn locate_repository_root(&self) -> Result<PathBuf, StagingError> {
        WalkDir::new(self.dir.path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir() && entry.file_name() == ".git")
            .min_by_key(|entry| entry.depth())
            .and_then(|entry| entry.path().parent().map(Path::to_path_buf))
            .ok_or(StagingError::RepositoryNotFound)
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StagingError> {
        let mut target = self.dir.path().to_path_buf();
        let mut depth = 0;

        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    target.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => return Err(StagingError::InvalidPath(relative.to_string())),
            }
        }

        if depth == 0 {
            return Err(StagingError::InvalidPath(relative.to_string()));
        }
        Ok(target)
    }
}
