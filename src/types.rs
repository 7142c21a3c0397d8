//! Core data types used throughout the snapshot library
//!
//! This module contains the fundamental data structures shared across
//! components:
//!
//! - **Snapshot records**: [`SnapshotFile`], [`SnapshotMeta`], [`Snapshot`]
//!   - what the store persists and hands back to callers
//! - **Operations**: [`CreateOptions`], [`ProgressUpdate`], [`StoreStats`]
//!   - parameters and results of store operations
//!
//! A snapshot is logically immutable once committed: only
//! [`SnapshotMeta::comment`] may change afterwards, and file bytes are
//! never rewritten in place.
//!
//! ## Examples
//!
//! ```rust
//! use rewritto_snapshots::types::CreateOptions;
//! use std::collections::BTreeMap;
//!
//! let mut overrides = BTreeMap::new();
//! overrides.insert("sketch/sketch.ino".to_string(), b"void loop() {}\n".to_vec());
//!
//! let options = CreateOptions {
//!     comment: "Before refactor".to_string(),
//!     file_overrides: overrides,
//!     ..Default::default()
//! };
//! ```

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// One tracked file inside a snapshot
///
/// Contains everything needed to restore the file to its exact state and
/// to verify the archived bytes later: the project-root-relative path,
/// the size, a SHA-1 fingerprint of the exact bytes stored, and the OS
/// permission bits captured at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Project-root-relative path, forward-slash normalized
    pub relative_path: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Lowercase hex SHA-1 of the exact bytes stored
    pub content_hash: String,
    /// OS permission bits at snapshot time (0 if unknown)
    pub permissions: u32,
}

/// One snapshot's descriptive header
///
/// Created exactly once at snapshot-creation time. The `id` is
/// timestamp-prefixed and therefore sorts in creation order; it never
/// changes. Only `comment` is mutable after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Globally unique id, sortable by creation order
    pub id: String,
    /// Creation time (UTC, millisecond precision)
    pub created_at: DateTime<Utc>,
    /// Free-text comment, mutable after creation
    pub comment: String,
    /// Number of files in the snapshot
    pub file_count: usize,
    /// Total size of all file contents in bytes
    pub total_bytes: u64,
}

impl SnapshotMeta {
    /// Get a shortened version of the id for display
    pub fn short_id(&self) -> &str {
        &self.id[..8.min(self.id.len())]
    }
}

/// A complete snapshot: header plus its file records
///
/// Path uniqueness across `files` is an invariant maintained by the
/// store; insertion order carries no meaning.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Descriptive header
    pub meta: SnapshotMeta,
    /// All tracked files
    pub files: Vec<SnapshotFile>,
}

impl Snapshot {
    /// Look up a file record by its relative path
    pub fn file(&self, relative_path: &str) -> Option<&SnapshotFile> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }
}

/// Information passed to progress callbacks
///
/// Delivered synchronously after each file an operation touches. The
/// callback's boolean return value is the only cancellation signal.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Files processed so far
    pub processed: usize,
    /// Total files to process
    pub total: usize,
    /// Relative path of the file just processed
    pub path: PathBuf,
}

/// Progress callback for long-running operations
///
/// Return `false` to cancel the operation cooperatively; the store
/// aborts, rolls back any staging state, and reports
/// [`SnapshotError::Cancelled`](crate::error::SnapshotError::Cancelled).
pub type ProgressCallback = Arc<dyn Fn(&ProgressUpdate) -> bool + Send + Sync>;

/// Options for snapshot creation
#[derive(Clone, Default)]
pub struct CreateOptions {
    /// Free-text comment stored with the snapshot
    pub comment: String,
    /// In-memory content that takes precedence over on-disk bytes for
    /// the same relative path (e.g. unsaved editor buffers)
    pub file_overrides: BTreeMap<String, Vec<u8>>,
    /// Progress callback
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for CreateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateOptions")
            .field("comment", &self.comment)
            .field("file_overrides", &self.file_overrides.len())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Aggregate statistics over a snapshot store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of committed snapshots
    pub snapshot_count: usize,
    /// Sum of `total_bytes` across all snapshots
    pub total_bytes: u64,
}
