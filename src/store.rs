//! Snapshot store: durable whole-folder versions under a project root
//!
//! The store owns the on-disk snapshot tree for a project:
//!
//! ```text
//! <project>/.rewritto/snapshots/
//!   <snapshot-id>/
//!     meta.json            # header + per-file records
//!     files/
//!       <relative/path>    # full logical copy of each tracked file
//!   .tmp-<random>/         # staging directories, invisible to list()
//! ```
//!
//! ## Commit protocol
//!
//! A snapshot is built in a randomly named staging directory and
//! revealed by a single atomic rename to its final id. Before the
//! rename nothing is visible under the id; after it the snapshot exists
//! fully formed. Any failure while staging rolls back by removing the
//! staging directory, leaving committed state untouched. Readers are
//! therefore safe against a concurrent in-progress create; the store
//! otherwise assumes at most one writer per project root.
//!
//! ## Cancellation
//!
//! `create` and `restore` invoke the caller's progress callback
//! synchronously after each file; a `false` return aborts the operation
//! as [`SnapshotError::Cancelled`]. There is no other cancellation
//! mechanism, no timers, and no retries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rewritto_snapshots::{SnapshotStore, CreateOptions};
//!
//! # fn main() -> rewritto_snapshots::Result<()> {
//! let store = SnapshotStore::new("./my_project");
//!
//! let meta = store.create(CreateOptions {
//!     comment: "Before refactor".to_string(),
//!     ..Default::default()
//! })?;
//! println!("Created snapshot {}", meta.id);
//!
//! for snapshot in store.list() {
//!     println!("{}  {}", snapshot.id, snapshot.comment);
//! }
//!
//! let written = store.restore(&meta.id, None)?;
//! println!("Restored {} files", written.len());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SnapshotError};
use crate::meta;
use crate::paths;
use crate::types::{
    CreateOptions, ProgressCallback, ProgressUpdate, Snapshot, SnapshotFile, SnapshotMeta,
    StoreStats,
};
use crate::utils;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Subdirectory of the store root that holds committed snapshots
const SNAPSHOTS_SUBDIR: &str = "snapshots";

/// Prefix of staging directory names; `list` skips these
const STAGING_PREFIX: &str = ".tmp-";

/// Metadata document filename inside each snapshot directory
const META_FILE: &str = "meta.json";

/// Subdirectory holding the archived file contents
const FILES_SUBDIR: &str = "files";

/// Snapshot id timestamp prefix, sortable in creation order
const ID_TIME_FORMAT: &str = "%Y%m%d-%H%M%S-%3f";

/// Where a file's bytes come from during snapshot creation
enum FileSource {
    /// Read from the live project tree
    Disk(PathBuf),
    /// Supplied by the caller (e.g. an unsaved editor buffer)
    Memory(Vec<u8>),
}

/// Point-in-time snapshot store for one project root
///
/// All operations are synchronous, blocking filesystem work; the store
/// spawns no threads and holds no locks. See the module docs for the
/// on-disk layout and the commit protocol.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Project root whose files are tracked
    project_root: PathBuf,
}

impl SnapshotStore {
    /// Create a store handle for a project root
    ///
    /// Nothing is touched on disk until the first operation; the
    /// snapshot tree is created lazily by `create`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// The project root this store operates on
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Enumerate all committed snapshots, newest first
    ///
    /// Staging directories and entries whose metadata fails to decode
    /// are skipped with a warning; this method never fails outright.
    pub fn list(&self) -> Vec<SnapshotMeta> {
        let snapshots_dir = self.snapshots_dir();
        let entries = match fs::read_dir(&snapshots_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut metas = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(STAGING_PREFIX) || !entry.path().is_dir() {
                continue;
            }
            match self.read(&name) {
                Ok(snapshot) => metas.push(snapshot.meta),
                Err(e) => warn!("Skipping unreadable snapshot {:?}: {}", name, e),
            }
        }

        metas.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        metas
    }

    /// The most recently created snapshot, if any
    pub fn latest(&self) -> Option<SnapshotMeta> {
        self.list().into_iter().next()
    }

    /// Aggregate statistics over all committed snapshots
    pub fn stats(&self) -> StoreStats {
        let metas = self.list();
        StoreStats {
            snapshot_count: metas.len(),
            total_bytes: metas.iter().map(|m| m.total_bytes).sum(),
        }
    }

    /// Load one snapshot's full metadata and file list
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::NotFound`] when no metadata document exists
    ///   under the id
    /// - [`SnapshotError::InvalidMetadata`] /
    ///   [`SnapshotError::UnsupportedVersion`] when it cannot be decoded
    pub fn read(&self, id: &str) -> Result<Snapshot> {
        validate_id(id)?;
        let meta_path = self.snapshot_dir(id).join(META_FILE);
        if !meta_path.is_file() {
            return Err(SnapshotError::not_found(format!("Snapshot {}", id)));
        }
        let document = fs::read_to_string(&meta_path)
            .map_err(|e| SnapshotError::io_at(meta_path.clone(), e))?;
        let (meta, files) = meta::decode(&document)?;
        Ok(Snapshot { meta, files })
    }

    /// Read the archived bytes of every file in a snapshot
    ///
    /// Returns a map keyed by relative path. Used by the comparison
    /// layer to materialize one side of a diff.
    pub fn materialize(&self, id: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        let snapshot = self.read(id)?;
        let files_dir = self.snapshot_dir(id).join(FILES_SUBDIR);

        let mut contents = BTreeMap::new();
        for record in &snapshot.files {
            let stored = files_dir.join(&record.relative_path);
            let bytes = fs::read(&stored)
                .map_err(|e| SnapshotError::io_at(record.relative_path.clone(), e))?;
            contents.insert(record.relative_path.clone(), bytes);
        }
        Ok(contents)
    }

    /// Create a new snapshot of the project root
    ///
    /// Enumerates every regular file under the project root (symlinks
    /// and reserved subtrees excluded), merges in the caller's
    /// `file_overrides` (overrides win for the same relative path), and
    /// captures the union in lexicographic order. The snapshot is built
    /// in a staging directory and committed by a single atomic rename;
    /// on any failure, including cancellation through the progress
    /// callback, the staging directory is removed and committed state
    /// is unaffected.
    ///
    /// Override entries with unsafe paths are skipped with a warning
    /// rather than failing the whole operation.
    #[instrument(skip(self, options), fields(root = ?self.project_root))]
    pub fn create(&self, options: CreateOptions) -> Result<SnapshotMeta> {
        if !self.project_root.is_dir() {
            return Err(SnapshotError::not_found(format!(
                "Project root {:?}",
                self.project_root
            )));
        }

        let snapshots_dir = self.snapshots_dir();
        fs::create_dir_all(&snapshots_dir)?;

        let created_at = Utc::now();
        let id = self.allocate_id(&created_at);

        // Staging directory with drop-cleanup: every early return below
        // rolls the partial snapshot back automatically.
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&snapshots_dir)?;
        debug!("Staging snapshot {} in {:?}", id, staging.path());

        let plan = self.enumerate(&options.file_overrides)?;
        let total = plan.len();
        let files_dir = staging.path().join(FILES_SUBDIR);

        let mut records = Vec::with_capacity(total);
        for (done, (relative_path, source)) in plan.into_iter().enumerate() {
            if !report_progress(&options.progress, done, total, &relative_path) {
                info!("Snapshot creation cancelled after {}/{} files", done, total);
                return Err(SnapshotError::Cancelled);
            }

            let (bytes, permissions) = match source {
                FileSource::Disk(path) => {
                    let bytes = fs::read(&path)
                        .map_err(|e| SnapshotError::io_at(relative_path.clone(), e))?;
                    let permissions = fs::metadata(&path)
                        .map(|m| utils::capture_permissions(&m))
                        .unwrap_or(0);
                    (bytes, permissions)
                }
                FileSource::Memory(bytes) => {
                    // An override may shadow an on-disk file; keep its
                    // permission bits when it does.
                    let permissions = fs::metadata(self.project_root.join(&relative_path))
                        .map(|m| utils::capture_permissions(&m))
                        .unwrap_or(0);
                    (bytes, permissions)
                }
            };

            let dest = files_dir.join(&relative_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| SnapshotError::io_at(relative_path.clone(), e))?;
            }
            utils::atomic_write(&dest, &bytes)
                .map_err(|e| SnapshotError::io_at(relative_path.clone(), e))?;

            records.push(SnapshotFile {
                content_hash: utils::hash_data(&bytes),
                size_bytes: bytes.len() as u64,
                relative_path,
                permissions,
            });
        }

        let snapshot_meta = SnapshotMeta {
            id: id.clone(),
            created_at,
            comment: options.comment,
            file_count: records.len(),
            total_bytes: records.iter().map(|f| f.size_bytes).sum(),
        };
        let document = meta::encode(&snapshot_meta, &records)?;
        utils::atomic_write(&staging.path().join(META_FILE), document.as_bytes())?;

        // Commit point: one rename makes the snapshot visible fully
        // formed under its final id.
        let staged = staging.keep();
        let final_dir = snapshots_dir.join(&id);
        if let Err(e) = fs::rename(&staged, &final_dir) {
            fs::remove_dir_all(&staged).ok();
            return Err(e.into());
        }

        info!(
            "Created snapshot {} ({} files, {})",
            snapshot_meta.short_id(),
            snapshot_meta.file_count,
            utils::format_bytes(snapshot_meta.total_bytes)
        );
        Ok(snapshot_meta)
    }

    /// Replace the comment of an already-committed snapshot
    ///
    /// Read-modify-write of the metadata document only; archived file
    /// bytes are never touched.
    #[instrument(skip(self, comment))]
    pub fn update_comment(&self, id: &str, comment: &str) -> Result<()> {
        let snapshot = self.read(id)?;
        let mut updated = snapshot.meta;
        updated.comment = comment.to_string();

        let document = meta::encode(&updated, &snapshot.files)?;
        let meta_path = self.snapshot_dir(id).join(META_FILE);
        utils::atomic_write(&meta_path, document.as_bytes())?;
        debug!("Updated comment of snapshot {}", id);
        Ok(())
    }

    /// Delete a committed snapshot
    ///
    /// Idempotent: a non-existent id is treated as success.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        validate_id(id)?;
        match fs::remove_dir_all(self.snapshot_dir(id)) {
            Ok(()) => {
                info!("Deleted snapshot {}", id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Restore a snapshot's files into the live project tree
    ///
    /// Every archived file is verified against its recorded content
    /// hash before anything is written for it; a mismatch aborts with
    /// [`SnapshotError::IntegrityMismatch`]. Writes use the atomic
    /// write pattern and restore the captured permission bits (0 means
    /// unknown and is skipped).
    ///
    /// Restoration is additive: files present in the live tree but
    /// absent from the snapshot are left alone. Returns the absolute
    /// paths written so the caller can resynchronize editor state.
    /// There is no rollback for files already written when a later file
    /// fails; the error reports where the operation stopped.
    #[instrument(skip(self, progress))]
    pub fn restore(&self, id: &str, progress: Option<ProgressCallback>) -> Result<Vec<PathBuf>> {
        let snapshot = self.read(id)?;
        let files_dir = self.snapshot_dir(id).join(FILES_SUBDIR);
        let total = snapshot.files.len();

        let mut written = Vec::with_capacity(total);
        for (done, record) in snapshot.files.iter().enumerate() {
            if !report_progress(&progress, done, total, &record.relative_path) {
                info!("Restore cancelled after {}/{} files", done, total);
                return Err(SnapshotError::Cancelled);
            }

            let stored = files_dir.join(&record.relative_path);
            let bytes = fs::read(&stored)
                .map_err(|e| SnapshotError::io_at(record.relative_path.clone(), e))?;

            if !record.content_hash.is_empty() {
                let actual = utils::hash_data(&bytes);
                if actual != record.content_hash {
                    return Err(SnapshotError::IntegrityMismatch {
                        path: PathBuf::from(&record.relative_path),
                        expected: record.content_hash.clone(),
                        actual,
                    });
                }
            }

            let dest = self.project_root.join(&record.relative_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| SnapshotError::io_at(record.relative_path.clone(), e))?;
            }
            utils::atomic_write(&dest, &bytes)
                .map_err(|e| SnapshotError::io_at(record.relative_path.clone(), e))?;
            if record.permissions != 0 {
                utils::set_permissions(&dest, record.permissions)?;
            }
            written.push(dest);
        }

        info!(
            "Restored {} files from snapshot {}",
            written.len(),
            snapshot.meta.short_id()
        );
        Ok(written)
    }

    /// Root of the snapshot tree for this project
    pub fn snapshots_dir(&self) -> PathBuf {
        self.project_root
            .join(paths::RESERVED_DIR)
            .join(SNAPSHOTS_SUBDIR)
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.snapshots_dir().join(id)
    }

    /// Build the creation plan: union of on-disk files and overrides,
    /// keyed by normalized relative path (lexicographic order).
    fn enumerate(&self, overrides: &BTreeMap<String, Vec<u8>>) -> Result<BTreeMap<String, FileSource>> {
        let mut plan = BTreeMap::new();

        // Prune reserved subtrees at the walk level so the snapshot
        // archive itself is never descended into.
        let walker = WalkDir::new(&self.project_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !matches!(
                        e.file_name().to_str(),
                        Some(paths::RESERVED_DIR) | Some(paths::VCS_DIR)
                    )
            });
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.project_root) else {
                continue;
            };
            let normalized = paths::normalize(&relative.to_string_lossy());
            if normalized.is_empty()
                || paths::should_ignore(&normalized)
                || !paths::is_safe(&normalized)
            {
                continue;
            }
            plan.insert(normalized, FileSource::Disk(entry.into_path()));
        }

        for (path, bytes) in overrides {
            let normalized = paths::normalize(path);
            if !paths::is_safe(path) || paths::should_ignore(&normalized) {
                warn!("Skipping override with unsafe path {:?}", path);
                continue;
            }
            plan.insert(normalized, FileSource::Memory(bytes.clone()));
        }

        Ok(plan)
    }

    /// Allocate a collision-free snapshot id
    fn allocate_id(&self, created_at: &DateTime<Utc>) -> String {
        let prefix = created_at.format(ID_TIME_FORMAT).to_string();
        loop {
            let random = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("{}_{}", prefix, &random[..8]);
            if !self.snapshot_dir(&id).exists() {
                return id;
            }
        }
    }
}

/// Invoke the progress callback; true means continue
fn report_progress(
    progress: &Option<ProgressCallback>,
    processed: usize,
    total: usize,
    path: &str,
) -> bool {
    match progress {
        Some(callback) => callback(&ProgressUpdate {
            processed,
            total,
            path: PathBuf::from(path),
        }),
        None => true,
    }
}

/// Reject ids that could address outside the snapshot tree
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.starts_with('.') || id.contains('/') || id.contains('\\') {
        return Err(SnapshotError::invalid_path(format!(
            "invalid snapshot id {:?}",
            id
        )));
    }
    Ok(())
}
