//! Quality pass: correctness smells and leftover debris.

use std::sync::LazyLock;

use regex::Regex;
use revline_core::types::{Issue, IssueCategory, Severity};

use super::{issue, FileKind};

static EMPTY_CATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"catch\s*(\([^)]*\))?\s*\{\s*\}").unwrap());
static DEBUGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*debugger\s*;?\s*$").unwrap());
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(TODO|FIXME|XXX|HACK)\b").unwrap());

/// True when `line` contains a two-character `==` or `!=` that is not part
/// of a strict `===` / `!==` comparison or an arrow/assignment compound.
///
/// The regex crate has no lookaround, so this is a byte scan over the line.
fn has_loose_equality(line: &str) -> bool {
    let b = line.as_bytes();
    let mut i = 0;
    while i + 1 < b.len() {
        if b[i + 1] == b'=' && (b[i] == b'=' || b[i] == b'!') {
            let before = if i == 0 { b' ' } else { b[i - 1] };
            let after = if i + 2 < b.len() { b[i + 2] } else { b' ' };
            let strict = after == b'=';
            let compound = b[i] == b'=' && matches!(before, b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/');
            if !strict && !compound {
                return true;
            }
            i += if strict { 3 } else { 2 };
        } else {
            i += 1;
        }
    }
    false
}

/// Quality pass. Pure function over the content lines.
pub fn run(lines: &[&str], _content: &str, kind: FileKind) -> Vec<Issue> {
    let mut issues = Vec::new();
    let scripty = matches!(kind, FileKind::JavaScript | FileKind::TypeScript);

    let mut prev_trimmed: Option<&str> = None;
    for (i, line) in lines.iter().enumerate() {
        let lineno = (i + 1) as u32;

        if scripty && has_loose_equality(line) {
            issues.push(issue(
                "eqeqeq",
                IssueCategory::Quality,
                Severity::Warning,
                lineno,
                "loose equality coerces operand types".into(),
                "use === / !==".into(),
                true,
            ));
        }

        if scripty && EMPTY_CATCH_RE.is_match(line) {
            issues.push(issue(
                "empty-catch",
                IssueCategory::Quality,
                Severity::Error,
                lineno,
                "empty catch block swallows errors".into(),
                "handle or rethrow the error".into(),
                false,
            ));
        }

        if scripty && DEBUGGER_RE.is_match(line) {
            issues.push(issue(
                "no-debugger",
                IssueCategory::Quality,
                Severity::Error,
                lineno,
                "debugger statement left in source".into(),
                "remove it".into(),
                true,
            ));
        }

        if MARKER_RE.is_match(line) {
            issues.push(issue(
                "leftover-marker",
                IssueCategory::Quality,
                Severity::Info,
                lineno,
                "TODO/FIXME marker in committed code".into(),
                "track it in the issue tracker or resolve it".into(),
                false,
            ));
        }

        let trimmed = line.trim();
        if !trimmed.is_empty() && trimmed.len() > 10 && prev_trimmed == Some(trimmed) {
            issues.push(issue(
                "duplicate-line",
                IssueCategory::Quality,
                Severity::Info,
                lineno,
                "line repeats the previous line verbatim".into(),
                "deduplicate or extract".into(),
                false,
            ));
        }
        prev_trimmed = Some(trimmed);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_of(content: &str) -> Vec<&str> {
        content.lines().collect()
    }

    #[test]
    fn loose_equality_detection() {
        assert!(has_loose_equality("if (x == 1) {}"));
        assert!(has_loose_equality("if (x != 1) {}"));
        assert!(!has_loose_equality("if (x === 1) {}"));
        assert!(!has_loose_equality("if (x !== 1) {}"));
        assert!(!has_loose_equality("x += 1"));
        assert!(!has_loose_equality("let f = () => 1"));
        assert!(!has_loose_equality("x <= y && y >= z"));
    }

    #[test]
    fn flags_empty_catch_and_debugger() {
        let content = "try { f() } catch (e) {}\ndebugger\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        assert!(issues.iter().any(|i| i.kind == "empty-catch" && i.line == 1));
        assert!(issues.iter().any(|i| i.kind == "no-debugger" && i.line == 2));
    }

    #[test]
    fn markers_fire_for_any_kind() {
        let content = "# TODO clean this up\n";
        let issues = run(&lines_of(content), content, FileKind::Python);
        assert!(issues.iter().any(|i| i.kind == "leftover-marker"));
    }

    #[test]
    fn duplicate_consecutive_lines() {
        let content = "callTheThing(a, b)\ncallTheThing(a, b)\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        assert!(issues.iter().any(|i| i.kind == "duplicate-line" && i.line == 2));
    }
}
