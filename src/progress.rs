//! Lifecycle events pushed from an extraction run to whoever is listening
//!
//! The engine only ever sends; delivery (SSE frames, log lines, a UI) is the
//! receiver's business. A run with no receiver attached behaves identically.

use crate::types::ExtractionResult;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Stage reported by a `progress` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressStage {
    /// Files written to the staging area
    Uploaded { count: usize },
    /// Commits found in the log
    Commits { count: usize },
    /// Tracked files selected for extraction
    FilesFound { count: usize },
    /// Commits processed after a batch
    Processing { processed: usize, total: usize },
}

/// One lifecycle event, serialized as `{"type": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressEvent {
    Progress(ProgressStage),
    /// A finalized file history
    File {
        path: String,
        #[serde(rename = "versionCount")]
        version_count: usize,
    },
    /// The run stopped early; the following `complete` carries partial work
    Cancelled { processed: usize, total: usize },
    /// Always the last event of a successful run
    Complete(ExtractionResult),
    /// Fatal failure; no `complete` follows
    Error { message: String },
}

impl ProgressEvent {
    pub fn error(message: impl ToString) -> Self {
        ProgressEvent::Error {
            message: message.to_string(),
        }
    }

    /// Render as a server-sent-event frame
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Sending half of the event channel
///
/// Cloning is cheap; a disabled reporter drops every event.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A reporter with a fresh receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A reporter that discards everything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A receiver that went away must not disturb the run
            if tx.send(event).is_err() {
                tracing::debug!("Progress receiver dropped; event discarded");
            }
        }
    }

    pub fn stage(&self, stage: ProgressStage) {
        self.emit(ProgressEvent::Progress(stage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wire_format() {
        let event = ProgressEvent::Progress(ProgressStage::Processing {
            processed: 10,
            total: 25,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "progress",
                "data": {"stage": "processing", "processed": 10, "total": 25}
            })
        );

        let files_found = serde_json::to_value(ProgressEvent::Progress(ProgressStage::FilesFound {
            count: 3,
        }))
        .unwrap();
        assert_eq!(files_found["data"]["stage"], "files_found");
    }

    #[test]
    fn test_file_event_wire_format() {
        let event = ProgressEvent::File {
            path: "a.ulyz".to_string(),
            version_count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "file", "data": {"path": "a.ulyz", "versionCount": 2}})
        );
    }

    #[test]
    fn test_error_event_round_trip() {
        let event = ProgressEvent::error("No commits found");
        let json = serde_json::to_string(&event).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_sse_frame() {
        let frame = ProgressEvent::error("boom").to_sse_frame().unwrap();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("}\n\n"));
    }

    #[tokio::test]
    async fn test_channel_delivers_in_order() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.stage(ProgressStage::Commits { count: 3 });
        reporter.emit(ProgressEvent::error("late"));
        drop(reporter);

        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::Progress(ProgressStage::Commits { count: 3 }))
        );
        assert_eq!(rx.recv().await, Some(ProgressEvent::error("late")));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_emit_without_listener() {
        ProgressReporter::disabled().stage(ProgressStage::Commits { count: 1 });

        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.emit(ProgressEvent::error("nobody listening"));
    }
}
