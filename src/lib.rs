//! # doc-history - Per-file history extraction for zipped XML documents
//!
//! Walks the commit graph of a git repository and, for every tracked
//! document (`.ulyz` by default), produces the chronological list of its
//! distinct content states together with the visible text of each state.
//!
//! ## Overview
//!
//! Extraction touches only what changed: a document's content is decoded at
//! a commit only when its blob id differs from the last id seen for that
//! path, and each distinct blob is decoded at most once per run no matter
//! how many paths or commits share it. Commits are processed in batches with
//! bounded concurrency, and progress is streamed to an optional listener.
//!
//! ## Architecture
//!
//! ```text
//!  HistoryClient ──► StagingArea (uploaded trees only)
//!        │
//!        ▼
//!  HistoryExtractor ──► discovery (newest commit)
//!        │
//!        ▼
//!  BatchScheduler ──► ChangeDetector ──► DecodeCache ──► DocumentDecoder
//!        │                                   │
//!        ▼                                   ▼
//!  VersionAssembler                     ObjectStore (git2 / memory)
//! ```
//!
//! ## Modules
//!
//! - [`client`]: Library entry point for repositories on disk or uploaded
//! - [`history`]: Change detection, batch scheduling and version assembly
//! - [`store`]: Object store abstraction over git2 and an in-memory graph
//! - [`decoder`]: Visible-text extraction from document archives
//! - [`cache`]: Per-run decode cache keyed by blob id
//! - [`progress`]: Lifecycle events and their wire format
//! - [`staging`]: Temporary on-disk copy of an uploaded repository
//! - [`config`]: Configuration management with environment variable support
//! - [`types`]: Commits, versions and histories
//! - [`error`]: Error types and result aliases
//! - [`paths`]: Config locations and reserved-directory matching
//!
//! ## Usage Example
//!
//! ```no_run
//! use doc_history::{HistoryClient, ProgressReporter};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HistoryClient::new()?;
//!     let result = client
//!         .extract_history(
//!             "/path/to/repo".as_ref(),
//!             &[],
//!             ProgressReporter::disabled(),
//!             CancellationToken::new(),
//!         )
//!         .await?;
//!
//!     for file in &result.files {
//!         println!("{}: {} versions", file.path, file.versions.len());
//!     }
//!     Ok(())
//! }
//! ```

/// Per-run decode cache with at-most-once decoding per blob
pub mod cache;

/// Library client tying configuration, staging, stores and extraction
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Visible-text extraction from zipped XML documents
pub mod decoder;

/// Error types and utilities
pub mod error;

/// Change detection, batch scheduling and version assembly
pub mod history;

/// Config locations and reserved-directory matching
pub mod paths;

/// Progress events and reporting
pub mod progress;

/// Temporary staging of uploaded repository trees
pub mod staging;

/// Object store abstraction
pub mod store;

/// Core data model
pub mod types;

pub use client::HistoryClient;
pub use config::Config;
pub use error::{HistoryError, Result};
pub use history::HistoryExtractor;
pub use progress::{ProgressEvent, ProgressReporter, ProgressStage};
pub use staging::UploadedFile;
pub use store::{GitObjectStore, MemoryObjectStore, ObjectStore};
pub use types::{Commit, ExtractionResult, FileHistory, FileVersion, ObjectId};
