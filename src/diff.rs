//! Word-Level Diff
//!
//! Computes display segments between an original and a corrected paragraph
//! for the review boundary. Words are whitespace-delimited; adjacent words
//! with the same disposition merge into one segment.

use serde::{Deserialize, Serialize};

/// A contiguous run of the word-level diff between two texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum DiffSegment {
    Equal { text: String },
    Delete { text: String },
    Insert { text: String },
    Replace { original: String, corrected: String },
}

/// Diff two texts word by word.
///
/// Matching runs become `Equal`; words only in the original become
/// `Delete`; words only in the corrected text become `Insert`; and a
/// deletion adjacent to an insertion collapses into `Replace`.
pub fn word_diff(original: &str, corrected: &str) -> Vec<DiffSegment> {
    let a: Vec<&str> = original.split_whitespace().collect();
    let b: Vec<&str> = corrected.split_whitespace().collect();
    let n = a.len();
    let m = b.len();

    // Longest-common-subsequence lengths for every suffix pair
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut segments = Vec::new();
    let mut equal: Vec<&str> = Vec::new();
    let mut deleted: Vec<&str> = Vec::new();
    let mut inserted: Vec<&str> = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < n && j < m {
        if a[i] == b[j] {
            flush_changes(&mut segments, &mut deleted, &mut inserted);
            equal.push(a[i]);
            i += 1;
            j += 1;
        } else {
            flush_equal(&mut segments, &mut equal);
            if lcs[i + 1][j] >= lcs[i][j + 1] {
                deleted.push(a[i]);
                i += 1;
            } else {
                inserted.push(b[j]);
                j += 1;
            }
        }
    }

    if i < n || j < m {
        flush_equal(&mut segments, &mut equal);
        deleted.extend_from_slice(&a[i..]);
        inserted.extend_from_slice(&b[j..]);
    }
    flush_changes(&mut segments, &mut deleted, &mut inserted);
    flush_equal(&mut segments, &mut equal);

    segments
}

fn flush_equal(segments: &mut Vec<DiffSegment>, equal: &mut Vec<&str>) {
    if !equal.is_empty() {
        segments.push(DiffSegment::Equal {
            text: equal.join(" "),
        });
        equal.clear();
    }
}

fn flush_changes(segments: &mut Vec<DiffSegment>, deleted: &mut Vec<&str>, inserted: &mut Vec<&str>) {
    match (deleted.is_empty(), inserted.is_empty()) {
        (true, true) => {}
        (false, true) => segments.push(DiffSegment::Delete {
            text: deleted.join(" "),
        }),
        (true, false) => segments.push(DiffSegment::Insert {
            text: inserted.join(" "),
        }),
        (false, false) => segments.push(DiffSegment::Replace {
            original: deleted.join(" "),
            corrected: inserted.join(" "),
        }),
    }
    deleted.clear();
    inserted.clear();
}
