//! Multi-dimension static analyzer.
//!
//! Five independent rule passes (style, security, architecture, quality,
//! documentation), each a pure function over the content lines. Passes run
//! in that fixed order and their issue lists concatenate in pass order, so
//! issue ordering is reproducible regardless of scheduling. A cancellation
//! token is polled between passes.
//!
//! Scoring: each dimension starts at 100 and pays a severity-weighted
//! penalty per issue, clamped at a per-dimension maximum deduction. The
//! clamp is a floor, not a ceiling: a dimension buried in issues still
//! reports `100 - max_deduction`, never lower. Security may deduct the full
//! 100 (floor 0); every other dimension floors at 50.

pub mod architecture;
pub mod docs;
pub mod metrics;
pub mod quality;
pub mod security;
pub mod style;

use revline_core::types::{Issue, IssueCategory, Severity};
use serde::Serialize;

use crate::cancel::{CancelToken, Cancelled};
pub use metrics::Metrics;

/// Source language of a content blob, mapped from the file-name extension.
///
/// Closed enum: unknown extensions land on `Other`, which still gets the
/// language-agnostic rules (line length, markers, metrics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Other,
}

impl FileKind {
    pub fn from_name(file_name: &str) -> Self {
        match file_name.rsplit('.').next().unwrap_or("") {
            "js" | "jsx" | "mjs" | "cjs" => FileKind::JavaScript,
            "ts" | "tsx" | "mts" => FileKind::TypeScript,
            "py" => FileKind::Python,
            "rs" => FileKind::Rust,
            _ => FileKind::Other,
        }
    }
}

/// Per-dimension and overall scores, each in [floor, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionScores {
    pub style: u32,
    pub security: u32,
    pub architecture: u32,
    pub quality: u32,
    pub documentation: u32,
    /// Rounded mean of the five dimensions.
    pub overall: u32,
}

/// Output of one full analyzer run over one content blob. Ephemeral;
/// persisted only when a caller records a review.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub issues: Vec<Issue>,
    pub metrics: Metrics,
    pub scores: DimensionScores,
}

/// Maximum total deduction for one dimension. Security alone may fall all
/// the way to 0; the rest floor at 50 regardless of issue volume.
fn max_deduction(category: IssueCategory) -> u32 {
    match category {
        IssueCategory::Security => 100,
        _ => 50,
    }
}

fn dimension_score(issues: &[Issue], category: IssueCategory) -> u32 {
    let penalty: u32 = issues
        .iter()
        .filter(|i| i.category == category)
        .map(|i| i.severity.penalty())
        .sum();
    100 - penalty.min(max_deduction(category))
}

fn score(issues: &[Issue]) -> DimensionScores {
    let style = dimension_score(issues, IssueCategory::Style);
    let security = dimension_score(issues, IssueCategory::Security);
    let architecture = dimension_score(issues, IssueCategory::Architecture);
    let quality = dimension_score(issues, IssueCategory::Quality);
    let documentation = dimension_score(issues, IssueCategory::Documentation);
    let overall = ((style + security + architecture + quality + documentation) as f64 / 5.0)
        .round() as u32;
    DimensionScores { style, security, architecture, quality, documentation, overall }
}

/// Runs all five passes over `content` and computes metrics and scores.
///
/// A parse-based sub-check failing inside a pass is downgraded to an
/// ordinary critical issue by that pass; nothing a pass does can abort the
/// run. Only cancellation aborts, and it leaves no state behind.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` fires between passes.
pub fn analyze(
    content: &str,
    kind: FileKind,
    cancel: &CancelToken,
) -> Result<AnalysisResult, Cancelled> {
    let lines: Vec<&str> = content.lines().collect();
    let metrics = metrics::compute(content, &lines, kind);

    let mut issues = Vec::new();
    cancel.check()?;
    issues.extend(style::run(&lines, content, kind));
    cancel.check()?;
    issues.extend(security::run(&lines, content, kind));
    cancel.check()?;
    issues.extend(architecture::run(&lines, content, kind));
    cancel.check()?;
    issues.extend(quality::run(&lines, content, kind));
    cancel.check()?;
    issues.extend(docs::run(&lines, &metrics, kind));

    let scores = score(&issues);
    Ok(AnalysisResult { issues, metrics, scores })
}

/// Convenience for callers that construct issues rule-by-rule.
pub(crate) fn issue(
    kind: &str,
    category: IssueCategory,
    severity: Severity,
    line: u32,
    message: String,
    suggestion: String,
    auto_fixable: bool,
) -> Issue {
    Issue { kind: kind.to_owned(), category, severity, line, message, suggestion, auto_fixable }
}
