use super::*;
use crate::error::{ExtractionError, HistoryError, StagingError};
use tempfile::TempDir;

fn drain(mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ===== Client Initialization Tests =====

#[test]
fn test_with_config_validates() {
    let mut config = Config::default();
    config.extraction.batch_size = 0;
    assert!(HistoryClient::with_config(config).is_err());

    let client = HistoryClient::with_config(Config::default()).unwrap();
    assert_eq!(client.config().extraction.batch_size, 10);
}

#[test]
fn test_client_clone() {
    let client = HistoryClient::with_config(Config::default()).unwrap();
    let cloned = client.clone();
    assert!(Arc::ptr_eq(&client.config, &cloned.config));
}

#[test]
fn test_normalize_path() {
    let temp_dir = TempDir::new().unwrap();
    let normalized = HistoryClient::normalize_path(&temp_dir.path().to_string_lossy()).unwrap();
    assert!(normalized.is_absolute());

    assert!(HistoryClient::normalize_path("/nonexistent/path/12345").is_err());
}

// ===== Failure Reporting Tests =====

#[tokio::test]
async fn test_missing_repository_emits_one_error() {
    let temp_dir = TempDir::new().unwrap();
    let client = HistoryClient::with_config(Config::default()).unwrap();
    let (progress, rx) = ProgressReporter::channel();

    let err = client
        .extract_history(temp_dir.path(), &[], progress, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(is_setup_failure(&err));

    let events = drain(rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ProgressEvent::Error { message } if message.contains("Failed to open repository")));
}

#[tokio::test]
async fn test_empty_repository_reports_no_commits() {
    let temp_dir = TempDir::new().unwrap();
    git2::Repository::init(temp_dir.path()).unwrap();
    let client = HistoryClient::with_config(Config::default()).unwrap();
    let (progress, rx) = ProgressReporter::channel();

    let err = client
        .extract_history(temp_dir.path(), &[], progress, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HistoryError>(),
        Some(HistoryError::Extraction(ExtractionError::NoCommitsFound))
    ));
    assert!(is_setup_failure(&err));
    let events = drain(rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ProgressEvent::Error { message } if message.contains("No commits found")));
}

#[tokio::test]
async fn test_upload_without_repository() {
    let client = HistoryClient::with_config(Config::default()).unwrap();
    let (progress, rx) = ProgressReporter::channel();

    let err = client
        .extract_staged(
            vec![UploadedFile::new("docs/a.ulyz", "not a repo")],
            &[],
            progress,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<HistoryError>(),
        Some(HistoryError::Staging(StagingError::RepositoryNotFound))
    ));
    assert!(is_setup_failure(&err));

    let events = drain(rx);
    assert_eq!(
        events[0],
        ProgressEvent::Progress(ProgressStage::Uploaded { count: 1 })
    );
    assert!(matches!(events.last(), Some(ProgressEvent::Error { .. })));
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_upload_with_invalid_path() {
    let client = HistoryClient::with_config(Config::default()).unwrap();
    let (progress, rx) = ProgressReporter::channel();

    let err = client
        .extract_staged(
            vec![UploadedFile::new("../escape.ulyz", "x")],
            &[],
            progress,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(!is_setup_failure(&err));

    let events = drain(rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ProgressEvent::Error { .. }));
}
