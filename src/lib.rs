//! # Rewritto Snapshots - point-in-time project folder versioning
//!
//! A library for capturing, browsing, restoring, and comparing whole
//! snapshots of a project folder without a full version-control system.
//! Each snapshot is a complete logical copy of the tracked files plus a
//! metadata document with per-file SHA-1 integrity hashes.
//!
//! ## Overview
//!
//! - Create crash-safe snapshots of a directory tree, including unsaved
//!   in-editor content via file overrides
//! - List, read, comment, delete, and restore snapshots
//! - Verify archived bytes against their recorded hashes on restore
//! - Compare any two versions - snapshot or live workspace - file by
//!   file, with line-level change highlights for modified text files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rewritto_snapshots::{SnapshotStore, CreateOptions};
//!
//! # fn main() -> rewritto_snapshots::Result<()> {
//! let store = SnapshotStore::new("./my_project");
//!
//! // Capture the current state.
//! let meta = store.create(CreateOptions {
//!     comment: "Initial state".to_string(),
//!     ..Default::default()
//! })?;
//! println!("Created snapshot: {}", meta.id);
//!
//! // Make some changes to your files...
//!
//! // Restore the earlier state (additive: live-only files survive).
//! let written = store.restore(&meta.id, None)?;
//! println!("Restored {} files", written.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Comparing versions
//!
//! ```rust,no_run
//! use rewritto_snapshots::{Comparator, CompareSource, SnapshotStore};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> rewritto_snapshots::Result<()> {
//! # let store = SnapshotStore::new("./my_project");
//! # let id = "20240101-120000-000_abcd1234".to_string();
//! let mut comparator = Comparator::new(&store);
//! let workspace: BTreeMap<String, Vec<u8>> = BTreeMap::new(); // live buffers
//!
//! let entries = comparator.compare(
//!     &CompareSource::Snapshot(id),
//!     &CompareSource::Workspace,
//!     &workspace,
//! )?;
//! for entry in entries.iter().filter(|e| !e.unchanged()) {
//!     println!("{:?} {}", entry.status, entry.relative_path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Snapshots
//!
//! A snapshot is an immutable copy of the project's tracked files at
//! one point in time. Only its free-text comment can change after
//! creation; file bytes are never rewritten in place. Snapshot ids are
//! timestamp-prefixed and sort in creation order.
//!
//! ### Atomic commit
//!
//! Snapshots are assembled in a randomly named staging directory and
//! revealed by a single rename. No partial snapshot is ever observable
//! under a committed id, and any failure while staging rolls back
//! completely.
//!
//! ### Integrity hashes
//!
//! Every archived file carries a SHA-1 fingerprint of its exact bytes.
//! Restore recomputes and verifies the hash before writing anything for
//! that file, turning silent archive corruption into a hard error.
//!
//! ### Line diffs
//!
//! Modified text files are aligned line-by-line with an LCS algorithm;
//! oversized inputs fall back to a cheap everything-changed
//! approximation with an explicit flag. See [`diff`].
//!
//! ## Concurrency
//!
//! All operations are synchronous, blocking filesystem work. The
//! progress callback passed to `create`/`restore` is the only
//! suspension and cancellation point. The design assumes at most one
//! writer per project root; readers are safe alongside an in-progress
//! create thanks to the rename commit.
//!
//! ## Error Handling
//!
//! All operations return `Result<T, SnapshotError>`; every error kind
//! carries a display string and a [`user_message`](SnapshotError::user_message)
//! suitable for direct rendering in a UI.

// Public API modules
pub mod compare;
pub mod diff;
pub mod error;
pub mod meta;
pub mod paths;
pub mod store;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use compare::{CompareSource, Comparator, DiffEntry, FileStatus};
pub use diff::{diff_lines, diff_text, LineDiff, MAX_LCS_CELLS};
pub use error::{Result, SnapshotError};
pub use meta::META_VERSION;
pub use store::SnapshotStore;
pub use types::{
    CreateOptions, ProgressCallback, ProgressUpdate, Snapshot, SnapshotFile, SnapshotMeta,
    StoreStats,
};
