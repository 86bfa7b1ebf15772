//! Change detection over per-commit snapshots of the tracked paths

use crate::store::ObjectStore;
use crate::types::{Commit, ObjectId, TrackedPath};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

/// What a tracked path resolved to at one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathState {
    Present(ObjectId),
    /// The path does not exist at this commit
    Absent,
    /// The lookup itself failed; nothing is known about this commit
    Unknown,
}

/// Tracked path states at one commit, in tracked-path order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSnapshot {
    pub states: Vec<(TrackedPath, PathState)>,
}

/// Resolve every tracked path at `commit`, up to `width` lookups at a time
///
/// Lookups are independent of each other; a failed lookup is logged and
/// recorded as [`PathState::Unknown`].
pub async fn snapshot_commit(
    store: &dyn ObjectStore,
    commit: &Commit,
    paths: &[TrackedPath],
    width: usize,
) -> CommitSnapshot {
    let mut resolved: Vec<(usize, PathState)> = stream::iter(paths.iter().enumerate())
        .map(|(index, path)| async move {
            let state = match store.resolve_path(&commit.id, path).await {
                Ok(Some(oid)) => PathState::Present(oid),
                Ok(None) => PathState::Absent,
                Err(e) => {
                    tracing::warn!("Failed to resolve {} at {}: {}", path, commit.id.short(), e);
                    PathState::Unknown
                }
            };
            (index, state)
        })
        .buffer_unordered(width.max(1))
        .collect()
        .await;

    resolved.sort_by_key(|(index, _)| *index);

    CommitSnapshot {
        states: resolved
            .into_iter()
            .map(|(index, state)| (paths[index].clone(), state))
            .collect(),
    }
}

/// A tracked path whose content differs from the last content seen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub path: TrackedPath,
    pub object_id: ObjectId,
}

/// Last-seen object id per tracked path
///
/// Snapshots must be observed in chronological order. Absent and unknown
/// states leave the last-seen id untouched, so a deletion produces nothing
/// and a restore of the same content produces nothing either.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_seen: HashMap<TrackedPath, ObjectId>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next commit's snapshot and return the paths whose content
    /// changed at that commit
    pub fn observe(&mut self, snapshot: &CommitSnapshot) -> Vec<ContentChange> {
        let mut changes = Vec::new();

        for (path, state) in &snapshot.states {
            let PathState::Present(oid) = state else {
                continue;
            };
            if self.last_seen.get(path) == Some(oid) {
                continue;
            }
            self.last_seen.insert(path.clone(), oid.clone());
            changes.push(ContentChange {
                path: path.clone(),
                object_id: oid.clone(),
            });
        }

        changes
    }
}
