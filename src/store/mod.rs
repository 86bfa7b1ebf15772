// git2-backed store over an on-disk repository
pub mod git;
pub use git::GitObjectStore;

// In-memory store for embedding and tests
pub mod memory;
pub use memory::MemoryObjectStore;

use crate::error::GitError;
use crate::types::{Commit, ObjectId, TreeEntry};

/// Read-only access to a content-addressed commit graph
///
/// Extraction treats this as a given capability: it never walks history,
/// diffs trees or decompresses objects itself.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// All commits in the store's native log order: newest first, every
    /// commit ahead of its parents even when timestamps tie or disagree
    async fn list_commits(&self) -> Result<Vec<Commit>, GitError>;

    /// Entries of one tree level
    async fn list_tree(&self, tree_id: &ObjectId) -> Result<Vec<TreeEntry>, GitError>;

    /// Object id of the blob at `path` in `commit_id`, or `None` when the
    /// path does not exist (or is not a blob) at that commit
    async fn resolve_path(
        &self,
        commit_id: &ObjectId,
        path: &str,
    ) -> Result<Option<ObjectId>, GitError>;

    /// Raw bytes of a blob
    async fn read_blob(&self, object_id: &ObjectId) -> Result<Vec<u8>, GitError>;

    /// Resolve and read `path` at `commit_id` in one call
    async fn read_blob_at(
        &self,
        commit_id: &ObjectId,
        path: &str,
    ) -> Result<Option<(ObjectId, Vec<u8>)>, GitError> {
        match self.resolve_path(commit_id, path).await? {
            Some(object_id) => {
                let bytes = self.read_blob(&object_id).await?;
                Ok(Some((object_id, bytes)))
            }
            None => Ok(None),
        }
    }
}
