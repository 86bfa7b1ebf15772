use super::ObjectStore;
use crate::error::GitError;
use crate::types::{Commit, EntryKind, ObjectId, TreeEntry};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Content-addressed object store held entirely in memory
///
/// Commits are recorded as full `path -> bytes` snapshots; blobs and trees
/// are keyed by the SHA-256 of their content so identical content always
/// shares an id. Every path lookup and blob read is recorded.
#[derive(Default)]
pub struct MemoryObjectStore {
    /// Oldest first; `list_commits` reverses to native log order
    commits: Vec<Commit>,
    snapshots: HashMap<ObjectId, BTreeMap<String, ObjectId>>,
    trees: HashMap<ObjectId, Vec<TreeEntry>>,
    blobs: HashMap<ObjectId, Vec<u8>>,
    failing_blobs: HashSet<ObjectId>,
    lookups: Mutex<Vec<(ObjectId, String)>>,
    blob_reads: Mutex<Vec<ObjectId>>,
}

fn digest(kind: &str, bytes: &[u8]) -> ObjectId {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(bytes);
    ObjectId::new(format!("{:x}", hasher.finalize()))
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object id a blob with these bytes receives
    pub fn blob_id(bytes: &[u8]) -> ObjectId {
        digest("blob", bytes)
    }

    /// Record a commit whose tree holds exactly `files`
    ///
    /// Commits must be added oldest first.
    pub fn commit(
        &mut self,
        timestamp: DateTime<Utc>,
        author_name: &str,
        message: &str,
        files: &[(&str, &[u8])],
    ) -> ObjectId {
        let mut snapshot = BTreeMap::new();
        for (path, bytes) in files {
            let oid = Self::blob_id(bytes);
            self.blobs.insert(oid.clone(), bytes.to_vec());
            snapshot.insert(path.to_string(), oid);
        }

        let tree_id = self.build_tree(&snapshot, "");
        let id = digest(
            "commit",
            format!(
                "{}\n{}\n{}\n{}\n{}",
                self.commits.len(),
                tree_id,
                timestamp.timestamp(),
                author_name,
                message
            )
            .as_bytes(),
        );

        self.snapshots.insert(id.clone(), snapshot);
        self.commits.push(Commit {
            id: id.clone(),
            timestamp,
            author_name: author_name.to_string(),
            message: message.to_string(),
            tree_id,
        });
        id
    }

    /// Make every read of this blob fail
    pub fn fail_blob(&mut self, object_id: ObjectId) {
        self.failing_blobs.insert(object_id);
    }

    /// Paths that have been resolved, in any commit
    pub fn looked_up_paths(&self) -> BTreeSet<String> {
        locked(&self.lookups)
            .iter()
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Number of `read_blob` calls
    pub fn blob_read_count(&self) -> usize {
        locked(&self.blob_reads).len()
    }

    /// Number of `read_blob` calls for one blob
    pub fn reads_of(&self, object_id: &ObjectId) -> usize {
        locked(&self.blob_reads)
            .iter()
            .filter(|oid| *oid == object_id)
            .count()
    }

    fn build_tree(&mut self, files: &BTreeMap<String, ObjectId>, prefix: &str) -> ObjectId {
        let mut entries = Vec::new();
        let mut subdirs = BTreeSet::new();

        for (path, oid) in files {
            let Some(rest) = path.strip_prefix(prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    subdirs.insert(dir.to_string());
                }
                None => entries.push(TreeEntry {
                    name: rest.to_string(),
                    object_id: oid.clone(),
                    kind: EntryKind::Blob,
                }),
            }
        }

        for dir in subdirs {
            let child = self.build_tree(files, &format!("{}{}/", prefix, dir));
            entries.push(TreeEntry {
                name: dir,
                object_id: child,
                kind: EntryKind::Tree,
            });
        }

        let listing: String = entries
            .iter()
            .map(|e| format!("{:?} {} {}\n", e.kind, e.object_id, e.name))
            .collect();
        let id = digest("tree", listing.as_bytes());
        self.trees.insert(id.clone(), entries);
        id
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_commits(&self) -> Result<Vec<Commit>, GitError> {
        Ok(self.commits.iter().rev().cloned().collect())
    }

    async fn list_tree(&self, tree_id: &ObjectId) -> Result<Vec<TreeEntry>, GitError> {
        self.trees
            .get(tree_id)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(format!("tree {}", tree_id)))
    }

    async fn resolve_path(
        &self,
        commit_id: &ObjectId,
        path: &str,
    ) -> Result<Option<ObjectId>, GitError> {
        locked(&self.lookups).push((commit_id.clone(), path.to_string()));

        let snapshot = self
            .snapshots
            .get(commit_id)
            .ok_or_else(|| GitError::ObjectNotFound(format!("commit {}", commit_id)))?;
        Ok(snapshot.get(path).cloned())
    }

    async fn read_blob(&self, object_id: &ObjectId) -> Result<Vec<u8>, GitError> {
        locked(&self.blob_reads).push(object_id.clone());

        if self.failing_blobs.contains(object_id) {
            return Err(GitError::BlobReadFailed {
                oid: object_id.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        self.blobs
            .get(object_id)
            .cloned()
            .ok_or_else(|| GitError::ObjectNotFound(format!("blob {}", object_id)))
    }
}
