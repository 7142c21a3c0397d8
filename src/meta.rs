//! Snapshot metadata codec
//!
//! Serializes and deserializes a snapshot's descriptive record - header
//! plus per-file entries - to and from the `meta.json` document stored
//! alongside the archived files:
//!
//! ```text
//! {
//!   "version": 1,
//!   "id": "20240101-120000-000_abcd1234",
//!   "createdAtUtc": "2024-01-01T12:00:00.000Z",
//!   "comment": "Before refactor",
//!   "fileCount": 2,
//!   "totalBytes": 140,
//!   "files": [
//!     { "path": "src/main.ino", "sizeBytes": 120, "sha1": "…", "permissions": 420 },
//!     ...
//!   ]
//! }
//! ```
//!
//! ## Versioning
//!
//! The document carries an explicit `version` tag. Decoding fails with
//! `UnsupportedVersion` on any mismatch - there is no migration logic,
//! which is a documented limitation rather than silent tolerance.
//!
//! ## Lenient file records
//!
//! A single corrupted file entry must not make an entire historical
//! snapshot unreadable: per-file records whose path fails validation
//! are dropped from the result with a warning instead of aborting the
//! decode. Failures in the top-level document itself always abort.

use crate::error::{Result, SnapshotError};
use crate::paths;
use crate::types::{SnapshotFile, SnapshotMeta};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current metadata document version
pub const META_VERSION: u32 = 1;

/// Primary timestamp format: millisecond-precision ISO-8601, UTC
const TS_FORMAT_MS: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Fallback timestamp format accepted on decode: second precision
const TS_FORMAT_SEC: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Wire representation of the metadata document
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaDoc {
    version: u32,
    id: String,
    created_at_utc: String,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    file_count: i64,
    #[serde(default)]
    total_bytes: i64,
    #[serde(default)]
    files: Vec<FileDoc>,
}

/// Wire representation of one file record
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileDoc {
    path: String,
    size_bytes: i64,
    sha1: String,
    #[serde(default)]
    permissions: u32,
}

/// Encode a snapshot header and its file records as a metadata document
///
/// Encoding is deterministic for a given input: the `version` tag is
/// always [`META_VERSION`], the timestamp is always emitted in the
/// primary millisecond-precision format, and file records keep their
/// input order.
pub fn encode(meta: &SnapshotMeta, files: &[SnapshotFile]) -> Result<String> {
    let doc = MetaDoc {
        version: META_VERSION,
        id: meta.id.clone(),
        created_at_utc: meta.created_at.format(TS_FORMAT_MS).to_string(),
        comment: meta.comment.clone(),
        file_count: meta.file_count as i64,
        total_bytes: meta.total_bytes as i64,
        files: files
            .iter()
            .map(|f| FileDoc {
                path: f.relative_path.clone(),
                size_bytes: f.size_bytes as i64,
                sha1: f.content_hash.clone(),
                permissions: f.permissions,
            })
            .collect(),
    };

    serde_json::to_string_pretty(&doc)
        .map_err(|e| SnapshotError::metadata(format!("encode failed: {}", e)))
}

/// Decode a metadata document into a snapshot header and file records
///
/// # Errors
///
/// - [`SnapshotError::UnsupportedVersion`] when the version tag differs
///   from [`META_VERSION`]
/// - [`SnapshotError::InvalidMetadata`] for malformed JSON, an empty
///   `id`, or a timestamp that parses under neither accepted format
///
/// Individual file records with unsafe paths, negative sizes, or paths
/// already seen are dropped rather than failing the whole decode.
pub fn decode(document: &str) -> Result<(SnapshotMeta, Vec<SnapshotFile>)> {
    let value: serde_json::Value = serde_json::from_str(document)
        .map_err(|e| SnapshotError::metadata(format!("malformed document: {}", e)))?;

    // Check the version tag before interpreting anything else, so that a
    // future format does not surface as a confusing field error.
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| SnapshotError::metadata("missing or invalid version tag"))?;
    if version != u64::from(META_VERSION) {
        return Err(SnapshotError::UnsupportedVersion {
            found: version.min(u64::from(u32::MAX)) as u32,
            supported: META_VERSION,
        });
    }

    let doc: MetaDoc = serde_json::from_value(value)
        .map_err(|e| SnapshotError::metadata(format!("malformed document: {}", e)))?;

    if doc.id.trim().is_empty() {
        return Err(SnapshotError::metadata("empty snapshot id"));
    }
    let created_at = parse_timestamp(&doc.created_at_utc).ok_or_else(|| {
        SnapshotError::metadata(format!("unparseable timestamp {:?}", doc.created_at_utc))
    })?;

    let mut files = Vec::with_capacity(doc.files.len());
    let mut seen = std::collections::HashSet::new();
    for record in doc.files {
        let normalized = paths::normalize(&record.path);
        if !paths::is_safe(&record.path) {
            warn!("Dropping file record with unsafe path {:?}", record.path);
            continue;
        }
        if record.size_bytes < 0 {
            warn!("Dropping file record with negative size: {:?}", record.path);
            continue;
        }
        if !seen.insert(normalized.clone()) {
            warn!("Dropping duplicate file record {:?}", normalized);
            continue;
        }
        files.push(SnapshotFile {
            relative_path: normalized,
            size_bytes: record.size_bytes as u64,
            content_hash: record.sha1,
            permissions: record.permissions,
        });
    }

    // Stored counts are advisory; recompute from the (possibly filtered)
    // list whenever the stored total is non-positive.
    let (file_count, total_bytes) = if doc.total_bytes > 0 {
        (doc.file_count.max(0) as usize, doc.total_bytes as u64)
    } else {
        (files.len(), files.iter().map(|f| f.size_bytes).sum())
    };

    Ok((
        SnapshotMeta {
            id: doc.id,
            created_at,
            comment: doc.comment,
            file_count,
            total_bytes,
        },
        files,
    ))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    for format in [TS_FORMAT_MS, TS_FORMAT_SEC] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_meta() -> SnapshotMeta {
        SnapshotMeta {
            id: "20240101-120000-000_abcd1234".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            comment: "Before refactor".to_string(),
            file_count: 2,
            total_bytes: 10,
        }
    }

    fn sample_files() -> Vec<SnapshotFile> {
        vec![
            SnapshotFile {
                relative_path: "src/main.ino".to_string(),
                size_bytes: 7,
                content_hash: crate::utils::hash_data(b"content"),
                permissions: 0o644,
            },
            SnapshotFile {
                relative_path: "data/readme.md".to_string(),
                size_bytes: 3,
                content_hash: crate::utils::hash_data(b"abc"),
                permissions: 0o600,
            },
        ]
    }

    #[test]
    fn test_round_trip() {
        let meta = sample_meta();
        let files = sample_files();
        let document = encode(&meta, &files).unwrap();

        let (decoded_meta, decoded_files) = decode(&document).unwrap();
        assert_eq!(decoded_meta, meta);
        assert_eq!(decoded_files, files);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let meta = sample_meta();
        let files = sample_files();
        assert_eq!(encode(&meta, &files).unwrap(), encode(&meta, &files).unwrap());
    }

    #[test]
    fn test_version_mismatch() {
        let document = encode(&sample_meta(), &[]).unwrap();
        let bumped = document.replace("\"version\": 1", "\"version\": 2");
        match decode(&bumped) {
            Err(SnapshotError::UnsupportedVersion { found: 2, supported: 1 }) => {}
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_version_is_invalid() {
        assert!(matches!(
            decode(r#"{"id":"x","createdAtUtc":"2024-01-01T12:00:00.000Z"}"#),
            Err(SnapshotError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        let document = r#"{
            "version": 1, "id": "  ",
            "createdAtUtc": "2024-01-01T12:00:00.000Z",
            "comment": "", "fileCount": 0, "totalBytes": 0, "files": []
        }"#;
        assert!(matches!(
            decode(document),
            Err(SnapshotError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_timestamp_fallback_format() {
        // Second-precision timestamps from older writers still decode.
        let document = r#"{
            "version": 1, "id": "snap",
            "createdAtUtc": "2024-06-30T08:15:59Z",
            "comment": "", "fileCount": 0, "totalBytes": 0, "files": []
        }"#;
        let (meta, _) = decode(document).unwrap();
        assert_eq!(meta.created_at, Utc.with_ymd_and_hms(2024, 6, 30, 8, 15, 59).unwrap());
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let document = r#"{
            "version": 1, "id": "snap",
            "createdAtUtc": "yesterday",
            "comment": "", "fileCount": 0, "totalBytes": 0, "files": []
        }"#;
        assert!(matches!(
            decode(document),
            Err(SnapshotError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_unsafe_file_record_dropped_not_fatal() {
        let document = r#"{
            "version": 1, "id": "snap",
            "createdAtUtc": "2024-01-01T12:00:00.000Z",
            "comment": "", "fileCount": 2, "totalBytes": 0,
            "files": [
                { "path": "../escape.txt", "sizeBytes": 4, "sha1": "aa", "permissions": 420 },
                { "path": "ok.txt", "sizeBytes": 4, "sha1": "bb", "permissions": 420 }
            ]
        }"#;
        let (meta, files) = decode(document).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, "ok.txt");
        // totalBytes was non-positive, so counts come from the filtered list.
        assert_eq!(meta.file_count, 1);
        assert_eq!(meta.total_bytes, 4);
    }

    #[test]
    fn test_stored_counts_kept_when_positive() {
        let document = r#"{
            "version": 1, "id": "snap",
            "createdAtUtc": "2024-01-01T12:00:00.000Z",
            "comment": "", "fileCount": 9, "totalBytes": 999,
            "files": [
                { "path": "a.txt", "sizeBytes": 4, "sha1": "aa", "permissions": 420 }
            ]
        }"#;
        let (meta, _) = decode(document).unwrap();
        assert_eq!(meta.file_count, 9);
        assert_eq!(meta.total_bytes, 999);
    }

    #[test]
    fn test_duplicate_paths_deduplicated() {
        let document = r#"{
            "version": 1, "id": "snap",
            "createdAtUtc": "2024-01-01T12:00:00.000Z",
            "comment": "", "fileCount": 0, "totalBytes": 0,
            "files": [
                { "path": "a.txt", "sizeBytes": 1, "sha1": "aa", "permissions": 420 },
                { "path": "./a.txt", "sizeBytes": 2, "sha1": "bb", "permissions": 420 }
            ]
        }"#;
        let (_, files) = decode(document).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content_hash, "aa");
    }
}
