//! Architecture pass: file shape and structural smells.
//!
//! File-shape findings (length, import volume) are file-level issues with
//! `line == 0`; they surface only on full reviews.

use std::sync::LazyLock;

use regex::Regex;
use revline_core::types::{Issue, IssueCategory, Severity};

use super::{issue, FileKind};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(import\s|from\s+\S+\s+import\s|use\s+\w|const\s+.+=\s*require\()"#)
        .unwrap()
});

const MAX_FILE_LINES: usize = 300;
const MAX_IMPORTS: usize = 20;
const MAX_NESTING_DEPTH: usize = 5;

/// Indentation depth in levels, counting a tab or 4 spaces as one level.
fn indent_depth(line: &str) -> usize {
    let mut spaces = 0usize;
    let mut depth = 0usize;
    for c in line.chars() {
        match c {
            '\t' => depth += 1,
            ' ' => {
                spaces += 1;
                if spaces == 4 {
                    depth += 1;
                    spaces = 0;
                }
            }
            _ => break,
        }
    }
    depth
}

/// Architecture pass. Pure function over the content lines.
pub fn run(lines: &[&str], _content: &str, _kind: FileKind) -> Vec<Issue> {
    let mut issues = Vec::new();

    if lines.len() > MAX_FILE_LINES {
        issues.push(issue(
            "file-too-long",
            IssueCategory::Architecture,
            Severity::Warning,
            0,
            format!("file has {} lines (limit {MAX_FILE_LINES})", lines.len()),
            "split into focused modules".into(),
            false,
        ));
    }

    let import_count = lines.iter().filter(|l| IMPORT_RE.is_match(l)).count();
    if import_count > MAX_IMPORTS {
        issues.push(issue(
            "too-many-imports",
            IssueCategory::Architecture,
            Severity::Warning,
            0,
            format!("{import_count} imports (limit {MAX_IMPORTS}) suggest too many responsibilities"),
            "extract cohesive pieces into their own modules".into(),
            false,
        ));
    }

    for (i, line) in lines.iter().enumerate() {
        if !line.trim().is_empty() && indent_depth(line) >= MAX_NESTING_DEPTH {
            issues.push(issue(
                "deep-nesting",
                IssueCategory::Architecture,
                Severity::Warning,
                (i + 1) as u32,
                format!("nesting depth {} or more", MAX_NESTING_DEPTH),
                "flatten with early returns or extracted functions".into(),
                false,
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_file_is_a_file_level_issue() {
        let content = "x\n".repeat(301);
        let lines: Vec<&str> = content.lines().collect();
        let issues = run(&lines, &content, FileKind::JavaScript);
        let long = issues.iter().find(|i| i.kind == "file-too-long").unwrap();
        assert_eq!(long.line, 0, "file-shape issues carry line 0");
    }

    #[test]
    fn deep_nesting_flagged_at_line() {
        let content = "fn f() {\n                    deep()\n}\n";
        let lines: Vec<&str> = content.lines().collect();
        let issues = run(&lines, content, FileKind::Rust);
        assert!(issues.iter().any(|i| i.kind == "deep-nesting" && i.line == 2));
    }

    #[test]
    fn import_volume() {
        let content = "import x from 'x'\n".repeat(21);
        let lines: Vec<&str> = content.lines().collect();
        let issues = run(&lines, &content, FileKind::JavaScript);
        assert!(issues.iter().any(|i| i.kind == "too-many-imports" && i.line == 0));

        let few = "import x from 'x'\n".repeat(3);
        let lines: Vec<&str> = few.lines().collect();
        assert!(run(&lines, &few, FileKind::JavaScript).is_empty());
    }
}
