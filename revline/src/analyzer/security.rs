//! Security pass: dangerous sinks and credential leaks.

use std::sync::LazyLock;

use regex::Regex;
use revline_core::types::{Issue, IssueCategory, Severity};

use super::{issue, FileKind};

static EVAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\beval\s*\(").unwrap());
static INNER_HTML_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.innerHTML\s*=").unwrap());
static DOC_WRITE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdocument\.write\s*\(").unwrap());
static SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(password|passwd|secret|api_?key|auth_?token)\b\s*[:=]\s*["'][^"']{4,}["']"#)
        .unwrap()
});
static EXEC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(execSync|spawnSync)\s*\(|require\(\s*["']child_process["']"#).unwrap()
});
static HTTP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']http://(?:[^"']+)["']"#).unwrap());

/// Security pass. Pure function over the content lines.
pub fn run(lines: &[&str], _content: &str, kind: FileKind) -> Vec<Issue> {
    let mut issues = Vec::new();
    let scripty = matches!(kind, FileKind::JavaScript | FileKind::TypeScript);

    for (i, line) in lines.iter().enumerate() {
        let lineno = (i + 1) as u32;

        if EVAL_RE.is_match(line) {
            issues.push(issue(
                "no-eval",
                IssueCategory::Security,
                Severity::Critical,
                lineno,
                "eval() executes arbitrary strings as code".into(),
                "parse the input instead of evaluating it".into(),
                false,
            ));
        }

        if SECRET_RE.is_match(line) {
            issues.push(issue(
                "hardcoded-secret",
                IssueCategory::Security,
                Severity::Critical,
                lineno,
                "credential literal committed to source".into(),
                "load secrets from the environment or a vault".into(),
                false,
            ));
        }

        if scripty {
            if INNER_HTML_RE.is_match(line) {
                issues.push(issue(
                    "no-inner-html",
                    IssueCategory::Security,
                    Severity::Error,
                    lineno,
                    "innerHTML assignment is an XSS sink".into(),
                    "use textContent or a sanitizer".into(),
                    false,
                ));
            }
            if DOC_WRITE_RE.is_match(line) {
                issues.push(issue(
                    "no-document-write",
                    IssueCategory::Security,
                    Severity::Error,
                    lineno,
                    "document.write enables markup injection".into(),
                    "build DOM nodes explicitly".into(),
                    false,
                ));
            }
            if EXEC_RE.is_match(line) {
                issues.push(issue(
                    "shell-exec",
                    IssueCategory::Security,
                    Severity::Error,
                    lineno,
                    "synchronous shell execution from source".into(),
                    "validate arguments and prefer spawn with an argv array".into(),
                    false,
                ));
            }
        }

        if let Some(m) = HTTP_RE.find(line) {
            let url = m.as_str();
            if !url.contains("localhost") && !url.contains("127.0.0.1") {
                issues.push(issue(
                    "insecure-url",
                    IssueCategory::Security,
                    Severity::Warning,
                    lineno,
                    "plaintext http:// URL".into(),
                    "use https://".into(),
                    true,
                ));
            }
        }
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
    fn flags_eval_and_secret() {
        let content = "eval(userInput)\nconst password = \"hunter22\"\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        assert!(issues.iter().any(|i| i.kind == "no-eval" && i.line == 1));
        assert!(issues
            .iter()
            .any(|i| i.kind == "hardcoded-secret" && i.severity == Severity::Critical));
    }

    #[test]
    fn localhost_http_is_allowed() {
        let content = "const a = \"http://localhost:3000\"\nconst b = \"http://example.com\"\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        let urls: Vec<u32> =
            issues.iter().filter(|i| i.kind == "insecure-url").map(|i| i.line).collect();
        assert_eq!(urls, vec![2]);
    }

    #[test]
    fn dom_sinks_only_fire_for_script_kinds() {
        let content = "el.innerHTML = markup\n";
        assert!(run(&lines_of(content), content, FileKind::JavaScript)
            .iter()
            .any(|i| i.kind == "no-inner-html"));
        assert!(run(&lines_of(content), content, FileKind::Python).is_empty());
    }
}
