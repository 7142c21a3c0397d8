//! Line-level diff computation for text content
//!
//! Given two text blobs, this module computes the minimal set of changed
//! line indices on each side using a Longest Common Subsequence (LCS)
//! alignment: lines that are not part of the LCS are "changed". The
//! result drives per-line highlighting in a side-by-side comparison
//! view.
//!
//! ## Bounded cost
//!
//! The exact algorithm is O(L·R) in both time and memory. For very large
//! inputs, where the DP table would exceed [`MAX_LCS_CELLS`] cells, the
//! engine skips the exact computation and marks every line on both sides
//! as changed, flagging the result as [`approximated`](LineDiff::approximated).
//! Precision is traded for a hard bound on cost; callers can surface the
//! flag in the UI.
//!
//! ## Examples
//!
//! ```rust
//! use rewritto_snapshots::diff::diff_text;
//!
//! let result = diff_text("a\nb\nc", "a\nx\nc");
//! assert_eq!(result.left_changed, vec![1]);
//! assert_eq!(result.right_changed, vec![1]);
//! assert!(!result.approximated);
//! ```

/// Safety ceiling on the LCS table size, in cells
///
/// `(left_lines + 1) * (right_lines + 1)` above this bound triggers the
/// approximated everything-changed result instead of the exact
/// computation.
pub const MAX_LCS_CELLS: usize = 4_000_000;

/// Result of a line-level diff
///
/// Changed line indices are zero-based and sorted ascending on each
/// side. Identical inputs always produce identical results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDiff {
    /// Indices of changed lines on the left side
    pub left_changed: Vec<usize>,
    /// Indices of changed lines on the right side
    pub right_changed: Vec<usize>,
    /// True when the exact computation was skipped for size and every
    /// line was marked changed instead
    pub approximated: bool,
}

impl LineDiff {
    /// Check whether the two sides compared equal
    pub fn is_unchanged(&self) -> bool {
        self.left_changed.is_empty() && self.right_changed.is_empty()
    }
}

/// Compute the line diff of two text blobs
///
/// Line endings are normalized (CRLF/CR become LF) before splitting;
/// splitting keeps empty segments, so a trailing newline contributes a
/// final empty line. An empty input is an empty line sequence.
pub fn diff_text(left: &str, right: &str) -> LineDiff {
    let left_norm = normalize_endings(left);
    let right_norm = normalize_endings(right);

    let left_lines = split_lines(&left_norm);
    let right_lines = split_lines(&right_norm);

    diff_lines(&left_lines, &right_lines)
}

/// Compute the line diff of two pre-split line sequences
pub fn diff_lines(left: &[&str], right: &[&str]) -> LineDiff {
    if left.is_empty() && right.is_empty() {
        return LineDiff::default();
    }

    let cells = (left.len() + 1).saturating_mul(right.len() + 1);
    if cells > MAX_LCS_CELLS {
        return LineDiff {
            left_changed: (0..left.len()).collect(),
            right_changed: (0..right.len()).collect(),
            approximated: true,
        };
    }

    let m = left.len();
    let n = right.len();

    // Standard LCS table over lines; exact string equality per line.
    let mut dp = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            if left[i - 1] == right[j - 1] {
                dp[i][j] = dp[i - 1][j - 1] + 1;
            } else {
                dp[i][j] = dp[i - 1][j].max(dp[i][j - 1]);
            }
        }
    }

    // Backtrack from the far corner. Lines outside the common
    // subsequence are recorded as changed on their own side; ties
    // consume from the left side so results are reproducible.
    let mut left_changed = Vec::new();
    let mut right_changed = Vec::new();
    let mut i = m;
    let mut j = n;
    while i > 0 && j > 0 {
        if left[i - 1] == right[j - 1] {
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] >= dp[i][j - 1] {
            left_changed.push(i - 1);
            i -= 1;
        } else {
            right_changed.push(j - 1);
            j -= 1;
        }
    }
    while i > 0 {
        left_changed.push(i - 1);
        i -= 1;
    }
    while j > 0 {
        right_changed.push(j - 1);
        j -= 1;
    }

    left_changed.reverse();
    right_changed.reverse();

    LineDiff {
        left_changed,
        right_changed,
        approximated: false,
    }
}

/// Check if content appears to be binary
///
/// Heuristic: a NUL byte in the first 8KB. Binary content is never
/// line-diffed.
pub fn is_binary_content(content: &[u8]) -> bool {
    let check_len = content.len().min(8192);
    content[..check_len].contains(&0)
}

fn normalize_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.split('\n').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_modified_line() {
        let result = diff_lines(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(result.left_changed, vec![1]);
        assert_eq!(result.right_changed, vec![1]);
        assert!(!result.approximated);
    }

    #[test]
    fn test_identical_inputs() {
        let result = diff_lines(&["a", "b"], &["a", "b"]);
        assert!(result.is_unchanged());
        assert!(!result.approximated);
    }

    #[test]
    fn test_one_side_empty() {
        let result = diff_lines(&[], &["x"]);
        assert!(result.left_changed.is_empty());
        assert_eq!(result.right_changed, vec![0]);

        let result = diff_lines(&["x", "y"], &[]);
        assert_eq!(result.left_changed, vec![0, 1]);
        assert!(result.right_changed.is_empty());
    }

    #[test]
    fn test_both_empty() {
        assert!(diff_lines(&[], &[]).is_unchanged());
        assert!(diff_text("", "").is_unchanged());
    }

    #[test]
    fn test_insertion_and_deletion() {
        // "b" deleted on the left, "d" inserted on the right.
        let result = diff_lines(&["a", "b", "c"], &["a", "c", "d"]);
        assert_eq!(result.left_changed, vec![1]);
        assert_eq!(result.right_changed, vec![2]);
    }

    #[test]
    fn test_crlf_normalization() {
        let result = diff_text("a\r\nb\r\nc", "a\nb\nc");
        assert!(result.is_unchanged());

        let result = diff_text("a\rb", "a\nb");
        assert!(result.is_unchanged());
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        // "a\n" splits to ["a", ""] and differs from ["a"].
        let result = diff_text("a\n", "a");
        assert_eq!(result.left_changed, vec![1]);
        assert!(result.right_changed.is_empty());
    }

    #[test]
    fn test_approximation_over_ceiling() {
        // 2100 lines per side: (2101)^2 cells exceeds the ceiling.
        let text = "x\n".repeat(2100);
        let lines: Vec<&str> = text.split('\n').collect();
        assert!((lines.len() + 1) * (lines.len() + 1) > MAX_LCS_CELLS);

        let result = diff_lines(&lines, &lines);
        assert!(result.approximated);
        assert_eq!(result.left_changed, (0..lines.len()).collect::<Vec<_>>());
        assert_eq!(result.right_changed, (0..lines.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_deterministic_tie_break() {
        // "a" vs "b" share nothing; both candidates tie everywhere, so
        // the result must still be stable across runs.
        let first = diff_lines(&["a"], &["b"]);
        let second = diff_lines(&["a"], &["b"]);
        assert_eq!(first, second);
        assert_eq!(first.left_changed, vec![0]);
        assert_eq!(first.right_changed, vec![0]);
    }

    #[test]
    fn test_binary_detection() {
        assert!(is_binary_content(b"hello\x00world"));
        assert!(!is_binary_content(b"hello world"));
        assert!(!is_binary_content(b""));
    }

    proptest! {
        #[test]
        fn prop_identical_inputs_have_no_changes(
            lines in prop::collection::vec("[a-z]{0,12}", 0..60)
        ) {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let result = diff_lines(&refs, &refs);
            prop_assert!(result.is_unchanged());
            prop_assert!(!result.approximated);
        }

        #[test]
        fn prop_changed_indices_in_bounds_and_sorted(
            left in prop::collection::vec("[a-c]{0,3}", 0..40),
            right in prop::collection::vec("[a-c]{0,3}", 0..40),
        ) {
            let l: Vec<&str> = left.iter().map(String::as_str).collect();
            let r: Vec<&str> = right.iter().map(String::as_str).collect();
            let result = diff_lines(&l, &r);

            prop_assert!(result.left_changed.iter().all(|&i| i < l.len()));
            prop_assert!(result.right_changed.iter().all(|&i| i < r.len()));
            prop_assert!(result.left_changed.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(result.right_changed.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn prop_empty_left_marks_all_right(
            right in prop::collection::vec("[a-z]{0,6}", 1..40)
        ) {
            let r: Vec<&str> = right.iter().map(String::as_str).collect();
            let result = diff_lines(&[], &r);
            prop_assert!(result.left_changed.is_empty());
            prop_assert_eq!(result.right_changed, (0..r.len()).collect::<Vec<_>>());
        }
    }
}
