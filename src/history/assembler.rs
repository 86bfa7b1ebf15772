use crate::types::{ExtractionResult, FileHistory, FileVersion, HistoryViolation, TrackedPath};
use std::collections::BTreeMap;

/// Collects versions as they are decoded, in any order, and produces the
/// per-path histories once the run is over
///
/// Each version carries the chronological position of its commit so that
/// equal timestamps still sort deterministically.
#[derive(Debug, Default)]
pub struct VersionAssembler {
    histories: BTreeMap<TrackedPath, Vec<(usize, FileVersion)>>,
}

impl VersionAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: TrackedPath, sequence: usize, version: FileVersion) {
        self.histories
            .entry(path)
            .or_default()
            .push((sequence, version));
    }

    pub fn version_count(&self) -> usize {
        self.histories.values().map(Vec::len).sum()
    }

    /// Sort each path's versions and build the final result, paths in
    /// lexicographic order
    pub fn finish(self, total_commits_scanned: usize, cancelled: bool) -> ExtractionResult {
        let files = self
            .histories
            .into_iter()
            .map(|(path, mut versions)| {
                versions.sort_by(|(seq_a, a), (seq_b, b)| {
                    a.timestamp.cmp(&b.timestamp).then(seq_a.cmp(seq_b))
                });

                let history = FileHistory {
                    path,
                    versions: versions.into_iter().map(|(_, version)| version).collect(),
                };

                let check = history.check();
                match &check {
                    Ok(()) => {}
                    Err(HistoryViolation::OutOfOrder { index }) => {
                        tracing::error!("History of {} unsorted at version {}", history.path, index);
                    }
                    Err(HistoryViolation::RepeatedContent { index }) => {
                        // Commit timestamps that disagree with graph order, or a skipped
                        // decode between two equal blobs, can bring equal content together
                        tracing::warn!(
                            "History of {} repeats content at version {}",
                            history.path,
                            index
                        );
                    }
                }
                // Repeats are tolerated; disorder after the sort is a bug
                debug_assert!(
                    !matches!(check, Err(HistoryViolation::OutOfOrder { .. })),
                    "history of {} unsorted after sort",
                    history.path
                );

                history
            })
            .collect();

        ExtractionResult {
            files,
            total_commits_scanned,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectId;
    use chrono::{TimeZone, Utc};

    fn version(secs: i64, oid: &str) -> FileVersion {
        FileVersion {
            commit_id: ObjectId::new(format!("c-{}-{}", secs, oid)),
            object_id: ObjectId::new(oid),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            author_name: "Ada".to_string(),
            message: "edit".to_string(),
            decoded_text: oid.to_string(),
        }
    }

    #[test]
    fn test_versions_sorted_by_timestamp() {
        let mut assembler = VersionAssembler::new();
        assembler.push("a.ulyz".to_string(), 2, version(30, "h3"));
        assembler.push("a.ulyz".to_string(), 0, version(10, "h1"));
        assembler.push("a.ulyz".to_string(), 1, version(20, "h2"));
        assert_eq!(assembler.version_count(), 3);

        let result = assembler.finish(5, false);
        let oids: Vec<_> = result.files[0]
            .versions
            .iter()
            .map(|v| v.object_id.as_str())
            .collect();
        assert_eq!(oids, vec!["h1", "h2", "h3"]);
        assert_eq!(result.total_commits_scanned, 5);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_equal_timestamps_use_commit_position() {
        let mut assembler = VersionAssembler::new();
        assembler.push("a.ulyz".to_string(), 4, version(10, "late"));
        assembler.push("a.ulyz".to_string(), 3, version(10, "early"));

        let result = assembler.finish(5, false);
        assert_eq!(result.files[0].versions[0].object_id.as_str(), "early");
        assert_eq!(result.files[0].versions[1].object_id.as_str(), "late");
    }

    #[test]
    fn test_paths_sorted_and_empty_paths_omitted() {
        let mut assembler = VersionAssembler::new();
        assembler.push("z.ulyz".to_string(), 0, version(1, "h1"));
        assembler.push("b/a.ulyz".to_string(), 0, version(1, "h2"));

        let result = assembler.finish(1, true);
        let paths: Vec<_> = result.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["b/a.ulyz", "z.ulyz"]);
        assert!(result.cancelled);
    }

    #[test]
    fn test_sorted_histories_pass_check() {
        let mut assembler = VersionAssembler::new();
        for (seq, secs, oid) in [(3, 40, "h4"), (0, 10, "h1"), (2, 10, "h3"), (1, 10, "h2")] {
            assembler.push("a.ulyz".to_string(), seq, version(secs, oid));
        }

        let result = assembler.finish(4, false);
        assert_eq!(result.files[0].check(), Ok(()));
        let oids: Vec<_> = result.files[0]
            .versions
            .iter()
            .map(|v| v.object_id.as_str())
            .collect();
        assert_eq!(oids, vec!["h1", "h2", "h3", "h4"]);
    }

    #[test]
    fn test_empty_assembler() {
        let result = VersionAssembler::new().finish(0, false);
        assert!(result.files.is_empty());
        assert_eq!(result.version_count(), 0);
    }
}
