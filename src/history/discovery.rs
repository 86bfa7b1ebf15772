use crate::config::DiscoveryConfig;
use crate::error::GitError;
use crate::paths::{is_excluded_path, join_repo_path};
use crate::store::ObjectStore;
use crate::types::{EntryKind, ObjectId, TrackedPath};

/// List every tracked document under `root_tree`, sorted by path
///
/// Reserved directories are pruned before they are listed, so nothing
/// beneath them is ever read.
pub async fn discover_candidates(
    store: &dyn ObjectStore,
    root_tree: &ObjectId,
    rules: &DiscoveryConfig,
) -> Result<Vec<TrackedPath>, GitError> {
    let mut candidates = Vec::new();
    let mut pending = vec![(root_tree.clone(), String::new())];

    while let Some((tree_id, prefix)) = pending.pop() {
        for entry in store.list_tree(&tree_id).await? {
            let path = join_repo_path(&prefix, &entry.name);

            match entry.kind {
                EntryKind::Tree => {
                    if is_excluded_path(&format!("{}/", path), &rules.excluded_dirs) {
                        tracing::debug!("Skipping reserved directory: {}", path);
                        continue;
                    }
                    pending.push((entry.object_id, path));
                }
                EntryKind::Blob => {
                    if entry.name.ends_with(&rules.extension) {
                        candidates.push(path);
                    }
                }
            }
        }
    }

    candidates.sort();
    Ok(candidates)
}

/// Restrict candidates to a caller's selection; an empty selection keeps all
pub fn select_paths(candidates: Vec<TrackedPath>, selection: &[String]) -> Vec<TrackedPath> {
    if selection.is_empty() {
        return candidates;
    }

    for selected in selection {
        if !candidates.contains(selected) {
            tracing::debug!("Selected file is not a tracked candidate: {}", selected);
        }
    }

    candidates
        .into_iter()
        .filter(|candidate| selection.contains(candidate))
        .collect()
}
