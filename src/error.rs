/// Centralized error types for doc-history using thiserror
///
/// Fatal setup failures abort a run and are surfaced once; per-item git
/// failures are caught by the scheduler and only logged.
use thiserror::Error;

/// Main error type for history extraction
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by an object store
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git repository not found at: {0}")]
    RepoNotFound(String),

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Failed to read '{path}' at {commit}: {reason}")]
    PathLookupFailed {
        commit: String,
        path: String,
        reason: String,
    },

    #[error("Failed to read blob {oid}: {reason}")]
    BlobReadFailed { oid: String, reason: String },

    #[error("Repository lock was poisoned")]
    LockPoisoned,

    #[error("Blocking git task failed: {0}")]
    TaskFailed(String),
}

/// Fatal errors that stop an extraction run before any version is produced
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No commits found")]
    NoCommitsFound,

    #[error("No tracked files with extension '{0}' found at the newest commit")]
    NoTrackedFiles(String),

    #[error("None of the selected files are tracked at the newest commit")]
    NoSelectedFiles,

    #[error("Failed to enumerate commits: {0}")]
    CommitListFailed(String),

    #[error("Failed to list tracked files: {0}")]
    DiscoveryFailed(String),
}

/// Errors related to the temporary staging area
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to create staging directory: {0}")]
    CreateFailed(String),

    #[error("Invalid staged path: {0}")]
    InvalidPath(String),

    #[error("Failed to write staged file '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("No .git directory found")]
    RepositoryNotFound,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;

impl From<anyhow::Error> for HistoryError {
    fn from(err: anyhow::Error) -> Self {
        HistoryError::Other(format!("{:#}", err))
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::IterFailed(err.message().to_string())
    }
}

impl HistoryError {
    /// True for failures that leave nothing to extract: no repository, no
    /// commits or no tracked files
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            HistoryError::Extraction(_)
                | HistoryError::Staging(StagingError::RepositoryNotFound)
                | HistoryError::Git(GitError::RepoNotFound(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HistoryError::Extraction(ExtractionError::NoCommitsFound);
        assert_eq!(err.to_string(), "Extraction error: No commits found");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HistoryError = io_err.into();
        assert!(matches!(err, HistoryError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: HistoryError = anyhow::anyhow!("test error").into();
        assert!(matches!(err, HistoryError::Other(_)));
    }

    #[test]
    fn test_fatal_setup_classification() {
        assert!(HistoryError::from(ExtractionError::NoTrackedFiles(".ulyz".into())).is_fatal_setup());
        assert!(HistoryError::from(StagingError::RepositoryNotFound).is_fatal_setup());
        assert!(HistoryError::from(GitError::RepoNotFound("/tmp/x".into())).is_fatal_setup());

        let per_item = HistoryError::from(GitError::BlobReadFailed {
            oid: "abc".to_string(),
            reason: "corrupt".to_string(),
        });
        assert!(!per_item.is_fatal_setup());
    }

    #[test]
    fn test_path_lookup_failed_display() {
        let err = GitError::PathLookupFailed {
            commit: "c1".to_string(),
            path: "a.ulyz".to_string(),
            reason: "odb error".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to read 'a.ulyz' at c1: odb error");
    }

    #[test]
    fn test_no_tracked_files_display() {
        let err = ExtractionError::NoTrackedFiles(".ulyz".to_string());
        assert_eq!(
            err.to_string(),
            "No tracked files with extension '.ulyz' found at the newest commit"
        );
    }

    #[test]
    fn test_error_chain() {
        let err: HistoryError = ConfigError::InvalidValue {
            key: "extraction.batch_size".to_string(),
            reason: "must be greater than 0".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration value for 'extraction.batch_size': must be greater than 0"
        );
    }
}
