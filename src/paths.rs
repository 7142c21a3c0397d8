//! Relative path validation and normalization
//!
//! Every path that enters the store - from directory enumeration, from
//! editor overrides, or from a decoded metadata document - passes through
//! this module before any file is opened. Validation is purely lexical:
//! nothing here touches the filesystem.
//!
//! The rules exist to keep a snapshot confined to its project root. An
//! absolute path, or a relative path whose `..` segments climb out of the
//! root, must be rejected outright rather than silently dropped at the
//! I/O layer. Paths under the store's own directory or under VCS
//! metadata are filtered separately via [`should_ignore`] so the store
//! never snapshots itself.

/// Reserved subtree that holds the snapshot store itself
pub const RESERVED_DIR: &str = ".rewritto";

/// Version-control metadata subtree, never tracked
pub const VCS_DIR: &str = ".git";

/// Normalize a relative path to a canonical forward-slash form
///
/// Trims surrounding whitespace, converts backslashes to forward
/// slashes, and collapses `.`/`..` segments structurally: a `..` pops a
/// previously accepted segment when one exists, and is kept otherwise so
/// that [`is_safe`] can see the escape attempt. Returns an empty string
/// when nothing remains (input was empty, `.`, or all separators).
///
/// ```rust
/// use rewritto_snapshots::paths::normalize;
///
/// assert_eq!(normalize("a\\b/./c"), "a/b/c");
/// assert_eq!(normalize("a/x/../b"), "a/b");
/// assert_eq!(normalize("."), "");
/// assert_eq!(normalize("a/../../b"), "../b");
/// ```
pub fn normalize(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                // Pop a real segment if we have one; otherwise the ..
                // escapes whatever root this path is joined to and must
                // stay visible.
                match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ => segments.push(".."),
                }
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Check whether a path is safe to use relative to a project root
///
/// Returns `false` when the normalized form is empty, when the original
/// path is absolute (POSIX or drive-letter style), or when the
/// normalized form still starts with a `..` segment - i.e. the path
/// would escape the project root no matter where the traversal appears
/// in the original input.
///
/// ```rust
/// use rewritto_snapshots::paths::is_safe;
///
/// assert!(is_safe("a/b/c.txt"));
/// assert!(!is_safe("../x"));
/// assert!(!is_safe("a/../../b"));
/// assert!(!is_safe("/etc/passwd"));
/// ```
pub fn is_safe(path: &str) -> bool {
    let trimmed = path.trim();
    if is_absolute(trimmed) {
        return false;
    }

    let normalized = normalize(trimmed);
    if normalized.is_empty() {
        return false;
    }

    // After structural collapse, any surviving .. is a leading one.
    normalized != ".." && !normalized.starts_with("../")
}

/// Check whether a path belongs to a reserved or VCS subtree
///
/// The store must never recursively snapshot its own archive, and VCS
/// internals are the province of the VCS. Matches the reserved name as a
/// whole segment anywhere in the path.
pub fn should_ignore(path: &str) -> bool {
    let normalized = normalize(path);
    normalized
        .split('/')
        .any(|segment| segment == RESERVED_DIR || segment == VCS_DIR)
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }
    // Windows drive-letter form, e.g. "C:/..." or "C:\...".
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators() {
        assert_eq!(normalize("a\\b\\c"), "a/b/c");
        assert_eq!(normalize("  a/b  "), "a/b");
        assert_eq!(normalize("a//b///c"), "a/b/c");
    }

    #[test]
    fn test_normalize_dot_segments() {
        assert_eq!(normalize("./a/./b"), "a/b");
        assert_eq!(normalize("a/x/../b"), "a/b");
        assert_eq!(normalize("a/b/../../c"), "c");
        assert_eq!(normalize("."), "");
        assert_eq!(normalize("././."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_keeps_escaping_dotdot() {
        assert_eq!(normalize(".."), "..");
        assert_eq!(normalize("../x"), "../x");
        assert_eq!(normalize("a/../../b"), "../b");
        assert_eq!(normalize("../../a"), "../../a");
    }

    #[test]
    fn test_is_safe_accepts_plain_relative() {
        assert!(is_safe("a/b/c.txt"));
        assert!(is_safe("sketch.ino"));
        assert!(is_safe("dir with spaces/file.txt"));
        // Interior traversal that stays inside the root is fine.
        assert!(is_safe("a/b/../c.txt"));
    }

    #[test]
    fn test_is_safe_rejects_escapes() {
        assert!(!is_safe("../x"));
        assert!(!is_safe("a/../../b"));
        assert!(!is_safe(".."));
        assert!(!is_safe("..\\x"));
    }

    #[test]
    fn test_is_safe_rejects_absolute() {
        assert!(!is_safe("/etc/passwd"));
        assert!(!is_safe("C:/Windows/system32"));
        assert!(!is_safe("C:\\Windows"));
        assert!(!is_safe("\\\\server\\share"));
    }

    #[test]
    fn test_is_safe_rejects_empty() {
        assert!(!is_safe(""));
        assert!(!is_safe("."));
        assert!(!is_safe("   "));
    }

    #[test]
    fn test_should_ignore() {
        assert!(should_ignore(".rewritto/snapshots/x/meta.json"));
        assert!(should_ignore(".git/HEAD"));
        assert!(should_ignore("sub/.git/config"));
        assert!(!should_ignore("src/main.ino"));
        assert!(!should_ignore(".gitignore"));
        assert!(!should_ignore("rewritto/notes.txt"));
    }
}
