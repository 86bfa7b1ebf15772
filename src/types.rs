use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository-relative, `/`-separated path of a tracked document
pub type TrackedPath = String;

/// Content-addressed object identifier (hex encoded)
///
/// Two lookups that yield the same id refer to identical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<git2::Oid> for ObjectId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

/// Information about a commit, produced once by the object store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Commit object id
    pub id: ObjectId,
    /// Commit time in UTC
    pub timestamp: DateTime<Utc>,
    /// Author's name
    pub author_name: String,
    /// Full commit message
    pub message: String,
    /// Root tree of the commit
    pub tree_id: ObjectId,
}

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Tree,
    Blob,
}

/// One entry of a single tree level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeEntry {
    /// Entry name within its parent tree (no `/`)
    pub name: String,
    pub object_id: ObjectId,
    pub kind: EntryKind,
}

/// One distinct content state of a tracked document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    /// Commit at which this content first appeared for the path
    pub commit_id: ObjectId,
    /// Blob holding the content
    pub object_id: ObjectId,
    pub timestamp: DateTime<Utc>,
    pub author_name: String,
    pub message: String,
    /// Visible text decoded from the document
    pub decoded_text: String,
}

impl FileVersion {
    pub fn from_commit(commit: &Commit, object_id: ObjectId, decoded_text: String) -> Self {
        Self {
            commit_id: commit.id.clone(),
            object_id,
            timestamp: commit.timestamp,
            author_name: commit.author_name.clone(),
            message: commit.message.clone(),
            decoded_text,
        }
    }
}

/// Ordered version list of one tracked path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHistory {
    pub path: TrackedPath,
    /// Versions ordered by timestamp, oldest first
    pub versions: Vec<FileVersion>,
}

/// A broken ordering or precision guarantee in a [`FileHistory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryViolation {
    /// `versions[index]` is older than `versions[index - 1]`
    OutOfOrder { index: usize },
    /// `versions[index]` repeats the object id of `versions[index - 1]`
    RepeatedContent { index: usize },
}

impl FileHistory {
    /// Check timestamp ordering and adjacent-content precision
    pub fn check(&self) -> Result<(), HistoryViolation> {
        for (index, pair) in self.versions.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(HistoryViolation::OutOfOrder { index: index + 1 });
            }
            if pair[1].object_id == pair[0].object_id {
                return Err(HistoryViolation::RepeatedContent { index: index + 1 });
            }
        }
        Ok(())
    }
}

/// Terminal output of an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// One entry per tracked path with at least one version, sorted by path
    pub files: Vec<FileHistory>,
    /// Length of the commit list the run was given
    pub total_commits_scanned: usize,
    /// The run stopped at a batch boundary before the last batch
    #[serde(default)]
    pub cancelled: bool,
}

impl ExtractionResult {
    /// Look up the history of a path
    pub fn get(&self, path: &str) -> Option<&FileHistory> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Total number of versions across all files
    pub fn version_count(&self) -> usize {
        self.files.iter().map(|f| f.versions.len()).sum()
    }
}
