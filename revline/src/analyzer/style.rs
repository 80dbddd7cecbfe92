//! Style/lint pass: formatting and declaration hygiene.

use std::sync::LazyLock;

use regex::Regex;
use revline_core::types::{Issue, IssueCategory, Severity};

use super::{issue, FileKind};

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bvar\s+[A-Za-z_$]").unwrap());
static CONSOLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconsole\.(log|warn|error|info|debug)\s*\(").unwrap());

const MAX_LINE_LEN: usize = 120;

/// Error reported by the bracket-balance syntax sub-check.
#[derive(Debug)]
pub(super) struct SyntaxError {
    pub line: u32,
    pub message: String,
}

/// Validates that `()[]{}` nest correctly, ignoring string and comment
/// contents only coarsely (quotes toggle an in-string flag per line).
///
/// # Errors
///
/// Returns the 1-based line of the first mismatched or unclosed bracket.
pub(super) fn check_brackets(lines: &[&str]) -> Result<(), SyntaxError> {
    let mut stack: Vec<(char, u32)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let lineno = (i + 1) as u32;
        let mut in_string: Option<char> = None;
        let mut prev = '\0';
        for c in line.chars() {
            if let Some(q) = in_string {
                if c == q && prev != '\\' {
                    in_string = None;
                }
            } else {
                match c {
                    '"' | '\'' | '`' => in_string = Some(c),
                    '(' | '[' | '{' => stack.push((c, lineno)),
                    ')' | ']' | '}' => {
                        let expected = match c {
                            ')' => '(',
                            ']' => '[',
                            _ => '{',
                        };
                        match stack.pop() {
                            Some((open, _)) if open == expected => {}
                            _ => {
                                return Err(SyntaxError {
                                    line: lineno,
                                    message: format!("unmatched closing `{c}`"),
                                })
                            }
                        }
                    }
                    _ => {}
                }
            }
            prev = c;
        }
    }

    if let Some((open, lineno)) = stack.pop() {
        return Err(SyntaxError { line: lineno, message: format!("unclosed `{open}`") });
    }
    Ok(())
}

/// Style/lint pass. Pure function over the content lines.
///
/// The bracket-balance sub-check runs first; its failure is downgraded to a
/// single critical issue at the reported line and never aborts analysis.
pub fn run(lines: &[&str], _content: &str, kind: FileKind) -> Vec<Issue> {
    let mut issues = Vec::new();

    if let Err(e) = check_brackets(lines) {
        issues.push(issue(
            "syntax-error",
            IssueCategory::Style,
            Severity::Critical,
            e.line,
            format!("possible syntax error: {}", e.message),
            "fix bracket nesting before further review".into(),
            false,
        ));
    }

    let scripty = matches!(kind, FileKind::JavaScript | FileKind::TypeScript);

    for (i, line) in lines.iter().enumerate() {
        let lineno = (i + 1) as u32;

        if scripty && VAR_RE.is_match(line) {
            issues.push(issue(
                "no-var",
                IssueCategory::Style,
                Severity::Warning,
                lineno,
                "`var` declaration is function-scoped and hoisted".into(),
                "use `let` or `const`".into(),
                true,
            ));
        }

        if scripty && CONSOLE_RE.is_match(line) {
            issues.push(issue(
                "no-console",
                IssueCategory::Style,
                Severity::Warning,
                lineno,
                "console statement left in source".into(),
                "remove it or route through a logger".into(),
                true,
            ));
        }

        if line.chars().count() > MAX_LINE_LEN {
            issues.push(issue(
                "line-too-long",
                IssueCategory::Style,
                Severity::Info,
                lineno,
                format!("line exceeds {MAX_LINE_LEN} characters"),
                "wrap or extract".into(),
                false,
            ));
        }

        if line.len() > line.trim_end().len() {
            issues.push(issue(
                "trailing-whitespace",
                IssueCategory::Style,
                Severity::Info,
                lineno,
                "trailing whitespace".into(),
                "trim the line end".into(),
                true,
            ));
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
    fn flags_var_and_console() {
        let content = "var x = 1\nconsole.log(x)\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        let kinds: Vec<&str> = issues.iter().map(|i| i.kind.as_str()).collect();
        assert!(kinds.contains(&"no-var"));
        assert!(kinds.contains(&"no-console"));
        assert_eq!(issues.iter().find(|i| i.kind == "no-var").unwrap().line, 1);
    }

    #[test]
    fn var_rules_do_not_fire_for_python() {
        let content = "var = 1\nconsole = {}\n";
        let issues = run(&lines_of(content), content, FileKind::Python);
        assert!(issues.iter().all(|i| i.kind != "no-var" && i.kind != "no-console"));
    }

    #[test]
    fn unbalanced_brackets_become_one_critical_issue() {
        let content = "function f() {\n  return 1\n";
        let issues = run(&lines_of(content), content, FileKind::JavaScript);
        let syntax: Vec<_> = issues.iter().filter(|i| i.kind == "syntax-error").collect();
        assert_eq!(syntax.len(), 1);
        assert_eq!(syntax[0].severity, Severity::Critical);
        assert_eq!(syntax[0].line, 1, "points at the unclosed `{{`");
    }

    #[test]
    fn brackets_inside_strings_are_ignored() {
        let content = "let s = \"(((\"\n";
        assert!(check_brackets(&lines_of(content)).is_ok());
    }

    #[test]
    fn long_and_padded_lines() {
        let long = format!("let x = \"{}\"", "a".repeat(130));
        let content = format!("{long}\nok   \n");
        let issues = run(&lines_of(&content), &content, FileKind::JavaScript);
        assert!(issues.iter().any(|i| i.kind == "line-too-long" && i.line == 1));
        assert!(issues.iter().any(|i| i.kind == "trailing-whitespace" && i.line == 2));
    }
}
