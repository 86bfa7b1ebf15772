use super::ObjectStore;
use crate::error::GitError;
use crate::types::{Commit, EntryKind, ObjectId, TreeEntry};
use chrono::DateTime;
use git2::{ErrorCode, ObjectType, Oid, Repository, Sort};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Object store over a local git repository
///
/// git2 handles are not `Sync`, so the repository sits behind a mutex and
/// every call runs on tokio's blocking pool.
pub struct GitObjectStore {
    repo: Arc<Mutex<Repository>>,
    repo_path: PathBuf,
    max_commits: usize,
}

impl GitObjectStore {
    /// Discover and open a git repository from any path within it
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            GitError::RepoNotFound(format!("{}: {}", path.display(), e.message()))
        })?;

        let repo_path = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();

        tracing::info!("Opened git repository at: {}", repo_path.display());

        Ok(Self {
            repo: Arc::new(Mutex::new(repo)),
            repo_path,
            max_commits: usize::MAX,
        })
    }

    /// Cap the number of commits returned by [`ObjectStore::list_commits`]
    pub fn with_max_commits(mut self, max_commits: usize) -> Self {
        self.max_commits = max_commits;
        self
    }

    /// Get the repository root path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    async fn with_repo<T, F>(&self, f: F) -> Result<T, GitError>
    where
        F: FnOnce(&Repository) -> Result<T, GitError> + Send + 'static,
        T: Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().map_err(|_| GitError::LockPoisoned)?;
            f(&repo)
        })
        .await
        .map_err(|e| GitError::TaskFailed(e.to_string()))?
    }
}

fn parse_oid(id: &ObjectId) -> Result<Oid, GitError> {
    Oid::from_str(id.as_str()).map_err(|_| GitError::InvalidObjectId(id.to_string()))
}

fn extract_commit_info(commit: &git2::Commit) -> Commit {
    let timestamp = DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();

    Commit {
        id: commit.id().into(),
        timestamp,
        author_name: commit.author().name().unwrap_or("Unknown").to_string(),
        message: commit.message().unwrap_or("").to_string(),
        tree_id: commit.tree_id().into(),
    }
}

#[async_trait::async_trait]
impl ObjectStore for GitObjectStore {
    async fn list_commits(&self) -> Result<Vec<Commit>, GitError> {
        let max = self.max_commits;

        self.with_repo(move |repo| {
            let mut revwalk = repo.revwalk()?;
            // Children always precede parents, whatever the commit clocks say
            revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

            if let Err(e) = revwalk.push_head() {
                // A freshly initialised repository has no HEAD commit yet
                if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) {
                    return Ok(Vec::new());
                }
                return Err(e.into());
            }

            let mut commits = Vec::new();
            for oid in revwalk.take(max) {
                let commit = repo.find_commit(oid?)?;
                commits.push(extract_commit_info(&commit));

                if commits.len() % 500 == 0 {
                    tracing::debug!("Read {} commits", commits.len());
                }
            }

            tracing::debug!("Read {} commits from the log", commits.len());
            Ok(commits)
        })
        .await
    }

    async fn list_tree(&self, tree_id: &ObjectId) -> Result<Vec<TreeEntry>, GitError> {
        let oid = parse_oid(tree_id)?;

        self.with_repo(move |repo| {
            let tree = repo
                .find_tree(oid)
                .map_err(|e| GitError::ObjectNotFound(format!("tree {}: {}", oid, e.message())))?;

            let entries = tree
                .iter()
                .filter_map(|entry| {
                    // Submodule links and other kinds are not part of the document tree
                    let kind = match entry.kind() {
                        Some(ObjectType::Tree) => EntryKind::Tree,
                        Some(ObjectType::Blob) => EntryKind::Blob,
                        _ => return None,
                    };
                    Some(TreeEntry {
                        name: entry.name()?.to_string(),
                        object_id: entry.id().into(),
                        kind,
                    })
                })
                .collect();

            Ok(entries)
        })
        .await
    }

    async fn resolve_path(
        &self,
        commit_id: &ObjectId,
        path: &str,
    ) -> Result<Option<ObjectId>, GitError> {
        let oid = parse_oid(commit_id)?;
        let path = path.to_string();

        self.with_repo(move |repo| {
            let lookup_failed = |e: git2::Error| GitError::PathLookupFailed {
                commit: oid.to_string(),
                path: path.clone(),
                reason: e.message().to_string(),
            };

            let tree = repo
                .find_commit(oid)
                .and_then(|commit| commit.tree())
                .map_err(lookup_failed)?;

            match tree.get_path(Path::new(&path)) {
                Ok(entry) if entry.kind() == Some(ObjectType::Blob) => Ok(Some(entry.id().into())),
                Ok(_) => Ok(None),
                Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
                Err(e) => Err(lookup_failed(e)),
            }
        })
        .await
    }

    async fn read_blob(&self, object_id: &ObjectId) -> Result<Vec<u8>, GitError> {
        let oid = parse_oid(object_id)?;

        self.with_repo(move |repo| {
            let blob = repo.find_blob(oid).map_err(|e| GitError::BlobReadFailed {
                oid: oid.to_string(),
                reason: e.message().to_string(),
            })?;
            Ok(blob.content().to_vec())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, path: &str, content: &[u8], secs: i64, message: &str) {
        let workdir = repo.workdir().unwrap();
        let full = workdir.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new("Ada", "ada@example.com", &Time::new(secs, 0)).unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap();
    }

    fn fixture() -> (TempDir, GitObjectStore) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "docs/a.ulyz", b"first", 1_000, "add a");
        commit_file(&repo, "docs/a.ulyz", b"second", 2_000, "edit a");
        let store = GitObjectStore::discover(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_list_commits_newest_first() {
        let (_dir, store) = fixture();
        let commits = store.list_commits().await.unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].message, "edit a");
        assert_eq!(commits[1].message, "add a");
        assert_eq!(commits[0].author_name, "Ada");
        assert_eq!(commits[0].timestamp.timestamp(), 2_000);
        assert_eq!(commits[0].id.as_str().len(), 40);
    }

    #[tokio::test]
    async fn test_same_second_commits_keep_graph_order() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit_file(&repo, "a.ulyz", b"one", 5, "first");
        commit_file(&repo, "a.ulyz", b"two", 5, "second");
        commit_file(&repo, "a.ulyz", b"three", 5, "third");

        let store = GitObjectStore::discover(dir.path()).unwrap();
        let messages: Vec<_> = store
            .list_commits()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.message)
            .collect();
        assert_eq!(messages, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_max_commits() {
        let (_dir, store) = fixture();
        let store = store.with_max_commits(1);
        let commits = store.list_commits().await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "edit a");
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_commits() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let store = GitObjectStore::discover(dir.path()).unwrap();
        assert!(store.list_commits().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_discover_missing_repository() {
        let dir = TempDir::new().unwrap();
        let result = GitObjectStore::discover(dir.path());
        assert!(matches!(result, Err(GitError::RepoNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_tree_one_level() {
        let (_dir, store) = fixture();
        let commits = store.list_commits().await.unwrap();

        let root = store.list_tree(&commits[0].tree_id).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "docs");
        assert_eq!(root[0].kind, EntryKind::Tree);

        let docs = store.list_tree(&root[0].object_id).await.unwrap();
        assert_eq!(docs[0].name, "a.ulyz");
        assert_eq!(docs[0].kind, EntryKind::Blob);
    }

    #[tokio::test]
    async fn test_resolve_and_read_blob() {
        let (_dir, store) = fixture();
        let commits = store.list_commits().await.unwrap();

        let newest = store
            .read_blob_at(&commits[0].id, "docs/a.ulyz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(newest.1, b"second");

        let oldest = store
            .resolve_path(&commits[1].id, "docs/a.ulyz")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(oldest, newest.0);
        assert_eq!(store.read_blob(&oldest).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_resolve_missing_path_is_none() {
        let (_dir, store) = fixture();
        let commits = store.list_commits().await.unwrap();

        let missing = store
            .resolve_path(&commits[0].id, "docs/b.ulyz")
            .await
            .unwrap();
        assert!(missing.is_none());

        // A directory is not a blob
        let dir = store.resolve_path(&commits[0].id, "docs").await.unwrap();
        assert!(dir.is_none());
    }

    #[tokio::test]
    async fn test_invalid_object_id() {
        let (_dir, store) = fixture();
        let result = store.read_blob(&ObjectId::new("not-hex")).await;
        assert!(matches!(result, Err(GitError::InvalidObjectId(_))));
    }
}
