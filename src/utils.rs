//! Utility functions for the snapshot library
//!
//! Common helpers used throughout the crate: content hashing, atomic
//! file writing, cross-platform permission handling, and byte
//! formatting.
//!
//! ## Content Hashing
//!
//! Snapshot integrity rests on a deterministic SHA-1 fingerprint of the
//! exact bytes stored. SHA-1 is used for corruption detection, not for
//! security; collision resistance against an adversary is not a goal
//! here.
//!
//! ## Atomic Writes
//!
//! All persistent writes in the crate go through [`atomic_write`]: the
//! full content lands in a sibling temporary file which is then renamed
//! over the final name in a single filesystem operation. A reader never
//! observes a half-written file, and an I/O failure before the rename
//! leaves any existing file untouched.

use crate::error::Result;
use sha1::{Digest, Sha1};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Hash arbitrary data using SHA-1
///
/// Computes the fingerprint in a single pass over the supplied buffer.
/// Any byte sequence, including the empty one, is hashable; the result
/// is a 40-character lowercase hexadecimal string.
///
/// ```rust
/// use rewritto_snapshots::utils::hash_data;
///
/// let hash = hash_data(b"");
/// assert_eq!(hash, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
/// ```
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash a file's content using SHA-1
///
/// Streams the file through the hasher in 8KB chunks so large files do
/// not need to fit in memory.
pub fn hash_file_content(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Atomic file write (write to sibling temp file then rename)
///
/// Writes the full content to a randomly named temporary file in the
/// same directory, then persists it over the target path in a single
/// rename. On any error before the rename the temporary file is
/// discarded and the original file, if any, is left untouched.
///
/// Returns a plain `io::Result` so callers can attach the relative
/// path they were writing when reporting the failure.
pub fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Capture Unix permission bits from file metadata
#[cfg(unix)]
pub fn capture_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Capture permission bits from file metadata (Windows implementation)
///
/// Windows has no Unix mode; read-only files map to 0o444 and writable
/// files to 0o644 so the value round-trips through a snapshot sensibly.
#[cfg(windows)]
pub fn capture_permissions(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = fs::Permissions::from_mode(mode);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

/// Set permissions (Windows implementation)
///
/// Only the read-only attribute can be expressed; a mode with no owner
/// write bit sets it, anything else clears it.
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    let metadata = fs::metadata(path)?;
    let mut perms = metadata.permissions();
    perms.set_readonly((mode & 0o200) == 0);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Format bytes in human-readable form
///
/// ```rust
/// use rewritto_snapshots::utils::format_bytes;
///
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_known_vectors() {
        // SHA-1 of the empty string and of "abc".
        assert_eq!(hash_data(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(hash_data(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"Hello, World!";
        assert_eq!(hash_data(data), hash_data(data));
        assert_eq!(hash_data(data).len(), 40);
    }

    #[test]
    fn test_hash_file_matches_hash_data() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("blob.bin");
        let content = vec![0xabu8; 20000];
        fs::write(&file_path, &content).unwrap();

        assert_eq!(hash_file_content(&file_path).unwrap(), hash_data(&content));
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        atomic_write(&file_path, b"Test content").unwrap();
        assert_eq!(fs::read(&file_path).unwrap(), b"Test content");

        // Overwrite replaces wholesale.
        atomic_write(&file_path, b"Replaced").unwrap();
        assert_eq!(fs::read(&file_path).unwrap(), b"Replaced");

        // No stray temp files left behind.
        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("script.sh");
        fs::write(&file_path, b"#!/bin/sh\n").unwrap();

        set_permissions(&file_path, 0o755).unwrap();
        let metadata = fs::metadata(&file_path).unwrap();
        assert_eq!(capture_permissions(&metadata) & 0o777, 0o755);
    }
}
