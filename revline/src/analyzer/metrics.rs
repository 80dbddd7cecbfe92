//! Per-file source metrics: line counts, a cyclomatic-complexity proxy,
//! and a derived maintainability index.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::FileKind;

/// Branching constructs counted toward the complexity proxy. `else if` is
/// covered by the `if` match; ternaries are counted separately below.
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(if|for|while|case|catch|elif|except)\b").unwrap());

/// Complexity is capped here so one pathological file cannot dominate the
/// maintainability scale.
pub const COMPLEXITY_CAP: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub total_lines: u32,
    pub code_lines: u32,
    pub comment_lines: u32,
    pub size_bytes: u64,
    /// Approximate cyclomatic complexity: 1 + branching-construct count,
    /// capped at [`COMPLEXITY_CAP`].
    pub complexity: u32,
    /// Derived from complexity and average line length, clamped to [0, 100].
    pub maintainability: u32,
}

/// True when `line` is a whole-line comment for `kind`'s comment syntax.
fn is_comment_line(line: &str, kind: FileKind) -> bool {
    let t = line.trim_start();
    match kind {
        FileKind::Python => t.starts_with('#'),
        FileKind::Rust => t.starts_with("//"),
        FileKind::JavaScript | FileKind::TypeScript | FileKind::Other => {
            t.starts_with("//") || t.starts_with("/*") || t.starts_with('*')
        }
    }
}

/// Computes metrics for one content blob. Pure.
pub fn compute(content: &str, lines: &[&str], kind: FileKind) -> Metrics {
    let total_lines = lines.len() as u32;
    let mut comment_lines = 0u32;
    let mut code_lines = 0u32;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if is_comment_line(line, kind) {
            comment_lines += 1;
        } else {
            code_lines += 1;
        }
    }

    let mut branches = BRANCH_RE.find_iter(content).count() as u32;
    branches += content.matches("&&").count() as u32;
    branches += content.matches("||").count() as u32;
    let complexity = (1 + branches).min(COMPLEXITY_CAP);

    let avg_line_len = if total_lines == 0 {
        0.0
    } else {
        content.len() as f64 / total_lines as f64
    };
    let maintainability =
        (100.0 - 0.25 * complexity as f64 - 0.33 * avg_line_len).clamp(0.0, 100.0).round() as u32;

    Metrics {
        total_lines,
        code_lines,
        comment_lines,
        size_bytes: content.len() as u64,
        complexity,
        maintainability,
    }
}
