//! Comparison of two project states
//!
//! Resolves two comparison sources - a committed snapshot or the live
//! in-memory workspace - into path-keyed content maps, classifies every
//! file in their union as added, removed, modified, or unchanged, and
//! computes line-level highlights for modified text files via the
//! [diff engine](crate::diff).
//!
//! Binary files (detected by a NUL byte on either side) and files
//! present on only one side are never line-diffed; the whole file is
//! reported as changed on the side where it exists.
//!
//! The [`Comparator`] only ever reads snapshot data. It keeps a cache
//! of materialized snapshot contents for the lifetime of one comparison
//! session, so flipping between source pairs does not re-read the
//! archive from disk.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rewritto_snapshots::{Comparator, CompareSource, SnapshotStore};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> rewritto_snapshots::Result<()> {
//! let store = SnapshotStore::new("./my_project");
//! let mut comparator = Comparator::new(&store);
//!
//! // Live editor buffers, keyed by relative path.
//! let mut workspace = BTreeMap::new();
//! workspace.insert("sketch.ino".to_string(), b"void loop() {}\n".to_vec());
//!
//! let entries = comparator.compare(
//!     &CompareSource::Snapshot("20240101-120000-000_abcd1234".to_string()),
//!     &CompareSource::Workspace,
//!     &workspace,
//! )?;
//! for entry in entries.iter().filter(|e| !e.unchanged()) {
//!     println!("{:?}  {}", entry.status, entry.relative_path);
//! }
//! # Ok(())
//! # }
//! ```

use crate::diff::{self, LineDiff};
use crate::error::Result;
use crate::store::SnapshotStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

/// One side of a comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareSource {
    /// The live workspace state supplied by the caller
    Workspace,
    /// A committed snapshot, by id
    Snapshot(String),
}

/// Classification of one file across the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Present only on the right side
    Added,
    /// Present only on the left side
    Removed,
    /// Present on both sides with different bytes
    Modified,
    /// Present on both sides with identical bytes
    Unchanged,
}

/// Ephemeral per-comparison record for one file
///
/// Created fresh on every comparison request and never persisted.
/// Byte presence encodes existence on each side.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Project-root-relative path
    pub relative_path: String,
    /// Bytes on the left side, if the file exists there
    pub left_bytes: Option<Vec<u8>>,
    /// Bytes on the right side, if the file exists there
    pub right_bytes: Option<Vec<u8>>,
    /// Classification across the two sides
    pub status: FileStatus,
    /// Right size minus left size, in bytes
    pub delta_bytes: i64,
    /// True when either side looks binary; such files are never
    /// line-diffed
    pub binary: bool,
    /// Line-level highlights for modified text files
    pub line_diff: Option<LineDiff>,
}

impl DiffEntry {
    /// Whether the file exists on the left side
    pub fn left_exists(&self) -> bool {
        self.left_bytes.is_some()
    }

    /// Whether the file exists on the right side
    pub fn right_exists(&self) -> bool {
        self.right_bytes.is_some()
    }

    /// Whether both sides hold identical bytes
    pub fn unchanged(&self) -> bool {
        self.status == FileStatus::Unchanged
    }
}

/// Read-only comparison session over a snapshot store
///
/// Holds a transient cache of materialized snapshot contents; drop the
/// comparator when the comparison UI closes to release it.
pub struct Comparator<'a> {
    store: &'a SnapshotStore,
    cache: HashMap<String, BTreeMap<String, Vec<u8>>>,
}

impl<'a> Comparator<'a> {
    /// Create a comparison session over a store
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self {
            store,
            cache: HashMap::new(),
        }
    }

    /// Compare two sources and classify every file in their union
    ///
    /// `workspace` supplies the live state whenever either source is
    /// [`CompareSource::Workspace`]; it is ignored otherwise. Entries
    /// come back sorted by relative path.
    #[instrument(skip(self, workspace))]
    pub fn compare(
        &mut self,
        left: &CompareSource,
        right: &CompareSource,
        workspace: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Vec<DiffEntry>> {
        self.ensure_cached(left)?;
        self.ensure_cached(right)?;

        let left_map = self.resolve(left, workspace);
        let right_map = self.resolve(right, workspace);

        let all_paths: BTreeSet<&String> = left_map.keys().chain(right_map.keys()).collect();
        debug!("Comparing {} paths", all_paths.len());

        let entries = all_paths
            .into_iter()
            .map(|path| classify(path, left_map.get(path), right_map.get(path)))
            .collect();
        Ok(entries)
    }

    fn ensure_cached(&mut self, source: &CompareSource) -> Result<()> {
        if let CompareSource::Snapshot(id) = source {
            if !self.cache.contains_key(id) {
                debug!("Materializing snapshot {} for comparison", id);
                let contents = self.store.materialize(id)?;
                self.cache.insert(id.clone(), contents);
            }
        }
        Ok(())
    }

    fn resolve<'m>(
        &'m self,
        source: &CompareSource,
        workspace: &'m BTreeMap<String, Vec<u8>>,
    ) -> &'m BTreeMap<String, Vec<u8>> {
        match source {
            CompareSource::Workspace => workspace,
            // ensure_cached ran first; a missing entry would be a bug.
            CompareSource::Snapshot(id) => &self.cache[id],
        }
    }
}

fn classify(path: &str, left: Option<&Vec<u8>>, right: Option<&Vec<u8>>) -> DiffEntry {
    let left_len = left.map_or(0, |b| b.len() as i64);
    let right_len = right.map_or(0, |b| b.len() as i64);
    let binary = left.map_or(false, |b| diff::is_binary_content(b))
        || right.map_or(false, |b| diff::is_binary_content(b));

    let (status, line_diff) = match (left, right) {
        (None, Some(_)) => (FileStatus::Added, None),
        (Some(_), None) => (FileStatus::Removed, None),
        (Some(l), Some(r)) if l == r => (FileStatus::Unchanged, None),
        (Some(l), Some(r)) => {
            let line_diff = if binary {
                None
            } else {
                Some(diff::diff_text(
                    &String::from_utf8_lossy(l),
                    &String::from_utf8_lossy(r),
                ))
            };
            (FileStatus::Modified, line_diff)
        }
        // The union of keys never yields a path absent on both sides.
        (None, None) => (FileStatus::Unchanged, None),
    };

    DiffEntry {
        relative_path: path.to_string(),
        left_bytes: left.cloned(),
        right_bytes: right.cloned(),
        status,
        delta_bytes: right_len - left_len,
        binary,
        line_diff,
    }
}
