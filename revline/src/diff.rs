//! Line-level diff engine.
//!
//! Computes a classified edit script between two text blobs using
//! `similar`'s LCS-based line diff, then flattens its ops into
//! [`DiffEntry`] records. Within a `Replace` op, deleted and inserted
//! lines are paired positionally into `Modified` entries, one entry per
//! touched line instead of a delete+add pair, which keeps the changed-line
//! set compact. Unpaired leftovers fall back to pure `Deleted`/`Added`.
//!
//! Numbering convention (locked and tested): `Added` and `Modified` carry
//! the 1-based line number in the NEW content; `Deleted` carries the
//! 1-based line number in the OLD content at which the removal occurred.
//! A final trailing newline terminates the last line and never produces an
//! extra empty line; adding or removing the final newline reports as a
//! `Modified` last line.

use std::collections::BTreeSet;

use similar::{DiffOp, TextDiff};

/// The classification of one changed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    Added,
    Deleted,
    Modified,
}

/// One classified line-level change between two content snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// 1-based line number; new-side for Added/Modified, old-side for Deleted.
    pub line: u32,
    pub kind: DiffKind,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
}

/// Added/deleted/modified counts for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: u32,
    pub deleted: u32,
    pub modified: u32,
}

/// Computes the line diff between `old` and `new`.
///
/// Equal regions produce no entries; identical or empty inputs yield an
/// empty diff. No failure modes.
pub fn diff(old: &str, new: &str) -> Vec<DiffEntry> {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    let text_diff = TextDiff::from_lines(old, new);
    let mut entries = Vec::new();

    for op in text_diff.ops() {
        match *op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete { old_index, old_len, .. } => {
                for i in 0..old_len {
                    entries.push(DiffEntry {
                        line: (old_index + i + 1) as u32,
                        kind: DiffKind::Deleted,
                        old_text: line_at(&old_lines, old_index + i),
                        new_text: None,
                    });
                }
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                for i in 0..new_len {
                    entries.push(DiffEntry {
                        line: (new_index + i + 1) as u32,
                        kind: DiffKind::Added,
                        old_text: None,
                        new_text: line_at(&new_lines, new_index + i),
                    });
                }
            }
            DiffOp::Replace { old_index, old_len, new_index, new_len } => {
                let paired = old_len.min(new_len);
                for i in 0..paired {
                    entries.push(DiffEntry {
                        line: (new_index + i + 1) as u32,
                        kind: DiffKind::Modified,
                        old_text: line_at(&old_lines, old_index + i),
                        new_text: line_at(&new_lines, new_index + i),
                    });
                }
                for i in paired..old_len {
                    entries.push(DiffEntry {
                        line: (old_index + i + 1) as u32,
                        kind: DiffKind::Deleted,
                        old_text: line_at(&old_lines, old_index + i),
                        new_text: None,
                    });
                }
                for i in paired..new_len {
                    entries.push(DiffEntry {
                        line: (new_index + i + 1) as u32,
                        kind: DiffKind::Added,
                        old_text: None,
                        new_text: line_at(&new_lines, new_index + i),
                    });
                }
            }
        }
    }

    entries
}

fn line_at(lines: &[&str], index: usize) -> Option<String> {
    lines.get(index).map(|s| (*s).to_owned())
}

/// The distinct line numbers touched by any entry.
pub fn changed_lines(entries: &[DiffEntry]) -> BTreeSet<u32> {
    entries.iter().map(|e| e.line).collect()
}

/// Counts entries per classification.
pub fn stats(entries: &[DiffEntry]) -> DiffStats {
    let mut s = DiffStats::default();
    for e in entries {
        match e.kind {
            DiffKind::Added => s.added += 1,
            DiffKind::Deleted => s.deleted += 1,
            DiffKind::Modified => s.modified += 1,
        }
    }
    s
}
