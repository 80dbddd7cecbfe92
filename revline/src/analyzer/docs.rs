//! Documentation pass: comment coverage heuristics.

use std::sync::LazyLock;

use regex::Regex;
use revline_core::types::{Issue, IssueCategory, Severity};

use super::{issue, metrics::Metrics, FileKind};

static EXPORT_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+(default\s+)?(async\s+)?function\b").unwrap()
});

/// Files shorter than this skip the coverage heuristics entirely.
const MIN_LINES_FOR_COVERAGE: u32 = 50;
const MIN_COMMENT_RATIO: f64 = 0.05;

/// Documentation pass. Pure; takes precomputed metrics so the line
/// classification is shared with the metrics module rather than recounted.
pub fn run(lines: &[&str], metrics: &Metrics, kind: FileKind) -> Vec<Issue> {
    let mut issues = Vec::new();
    let scripty = matches!(kind, FileKind::JavaScript | FileKind::TypeScript);

    if metrics.total_lines >= MIN_LINES_FOR_COVERAGE {
        let ratio = if metrics.code_lines == 0 {
            1.0
        } else {
            metrics.comment_lines as f64 / metrics.code_lines as f64
        };
        if ratio < MIN_COMMENT_RATIO {
            issues.push(issue(
                "low-comment-ratio",
                IssueCategory::Documentation,
                Severity::Warning,
                0,
                format!(
                    "{} comment lines against {} code lines",
                    metrics.comment_lines, metrics.code_lines
                ),
                "document the non-obvious parts".into(),
                false,
            ));
        }

        let first = lines.iter().find(|l| !l.trim().is_empty());
        let has_header = first.is_some_and(|l| {
            let t = l.trim_start();
            t.starts_with("//") || t.starts_with("/*") || t.starts_with('#')
        });
        if !has_header {
            issues.push(issue(
                "missing-file-header",
                IssueCategory::Documentation,
                Severity::Info,
                0,
                "file has no header comment".into(),
                "state what the file is for at the top".into(),
                false,
            ));
        }
    }

    if scripty {
        for (i, line) in lines.iter().enumerate() {
            if EXPORT_FN_RE.is_match(line) {
                let documented = i > 0 && {
                    let prev = lines[i - 1].trim_start();
                    prev.starts_with("//") || prev.starts_with('*') || prev.ends_with("*/")
                };
                if !documented {
                    issues.push(issue(
                        "undocumented-export",
                        IssueCategory::Documentation,
                        Severity::Info,
                        (i + 1) as u32,
                        "exported function has no doc comment".into(),
                        "add a short contract comment above it".into(),
                        false,
                    ));
                }
            }
        }
    }

    issues
}
