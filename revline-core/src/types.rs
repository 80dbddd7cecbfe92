use serde::{Deserialize, Serialize};

/// An immutable full-content snapshot of a file.
///
/// Versions are keyed by UUID v4 text. `version_number` is a gapless,
/// strictly increasing integer per `file_key`, starting at 1. A version is
/// written only when the content fingerprint differs from the latest stored
/// version's fingerprint; identical saves are idempotent no-ops.
#[derive(Debug, Clone)]
pub struct Version {
    pub id: String,           // UUID v4 text
    pub file_key: String,
    pub file_name: String,
    pub version_number: i64,
    pub content: String,
    pub fingerprint: String,  // lowercase hex digest
    pub size_bytes: i64,
    pub created_at: i64,      // Unix timestamp seconds
}

/// Content-light view of a version for history listings.
///
/// Carries everything a history display needs without pulling the full
/// content blob out of the database.
#[derive(Debug, Clone)]
pub struct VersionSummary {
    pub id: String,
    pub version_number: i64,
    pub fingerprint: String,
    pub size_bytes: i64,
    pub created_at: i64,
}

/// Outcome of a conditional version write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// `true` when a new version row was inserted; `false` on fingerprint match.
    pub created: bool,
    /// The version number now current for the file key.
    pub version_number: i64,
}

/// A persisted record of one analysis run against a file version.
///
/// `issues` and `metrics` are stored as JSON text columns; reviews are
/// immutable after creation.
#[derive(Debug, Clone)]
pub struct Review {
    pub id: String,           // UUID v4 text
    pub file_version_id: String,
    pub review_type: ReviewType,
    pub lines_reviewed: i64,
    pub issues: Vec<Issue>,
    pub metrics: serde_json::Value,
    pub created_at: i64,
}

/// Whether a review covered the whole file or only changed regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewType {
    Full,
    Incremental,
}

impl ReviewType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewType::Full => "full",
            ReviewType::Incremental => "incremental",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "full" => Some(ReviewType::Full),
            "incremental" => Some(ReviewType::Incremental),
            _ => None,
        }
    }
}

/// One finding from an analysis dimension.
///
/// `line` is 1-based; `line == 0` marks a file-level finding with no line
/// anchor. File-level findings only surface on full reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Stable rule identifier, e.g. `"no-var"` or `"hardcoded-secret"`.
    pub kind: String,
    pub category: IssueCategory,
    pub severity: Severity,
    pub line: u32,
    pub message: String,
    pub suggestion: String,
    pub auto_fixable: bool,
}

/// The analysis dimension that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Style,
    Security,
    Architecture,
    Quality,
    Documentation,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Style => "style",
            IssueCategory::Security => "security",
            IssueCategory::Architecture => "architecture",
            IssueCategory::Quality => "quality",
            IssueCategory::Documentation => "documentation",
        }
    }
}

/// Issue severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    /// Score penalty charged per issue of this severity.
    pub fn penalty(self) -> u32 {
        match self {
            Severity::Critical => 15,
            Severity::Error => 10,
            Severity::Warning => 5,
            Severity::Info => 1,
        }
    }
}
