//! Incremental review orchestrator.
//!
//! Ties the version store, diff engine, and analyzer together. An
//! incremental run diffs the latest stored version against the current
//! content, runs a full analysis, narrows the issue set to the changed
//! regions, and persists one review record. Versioning itself is a
//! separate caller-triggered action (`store_version_if_changed`), so a
//! review never implicitly writes a version.

use std::collections::BTreeSet;

use revline_core::db;
use revline_core::types::{Issue, PutOutcome, Review, ReviewType, VersionSummary};
use serde::Serialize;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::analyzer::{self, AnalysisResult, FileKind};
use crate::blob::BlobStore;
use crate::cancel::CancelToken;
use crate::diff::{self, DiffEntry, DiffStats};
use crate::error::PipelineError;
use crate::fingerprint::fingerprint;

/// Issues survive incremental filtering when their line is within this many
/// lines of a changed line (inclusive).
const PROXIMITY_WINDOW: u32 = 2;

/// Terminal state of one incremental invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementalStatus {
    /// No stored version exists for the file key; nothing was analyzed.
    RequiresFullReview,
    /// Stored and current content are line-identical; nothing was analyzed.
    NoChanges,
    /// Changed regions were analyzed and a review record was written.
    Reviewed,
}

/// Delta metrics recorded with an incremental review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncrementalMetrics {
    pub lines_changed: u32,
    pub lines_added: u32,
    pub lines_deleted: u32,
    pub issues_found: u32,
}

/// Result of `run_incremental_analysis`.
#[derive(Debug, Clone)]
pub struct IncrementalOutcome {
    pub status: IncrementalStatus,
    pub changed_lines: BTreeSet<u32>,
    pub issues: Vec<Issue>,
    pub metrics: IncrementalMetrics,
    /// Id of the persisted review; present only when `status == Reviewed`.
    pub review_id: Option<String>,
}

impl IncrementalOutcome {
    fn terminal(status: IncrementalStatus) -> Self {
        Self {
            status,
            changed_lines: BTreeSet::new(),
            issues: Vec::new(),
            metrics: IncrementalMetrics::default(),
            review_id: None,
        }
    }
}

/// Version history plus summary statistics.
#[derive(Debug, Clone)]
pub struct History {
    pub versions: Vec<VersionSummary>,
    pub version_count: usize,
    pub total_bytes: i64,
}

/// One file's result from a folder-level batch analysis.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub key: String,
    pub result: AnalysisResult,
}

/// True when a line-scoped issue sits within the proximity window of some
/// changed line. File-level issues (line 0) never pass; they only surface
/// on full reviews.
fn near_changed(line: u32, changed: &BTreeSet<u32>) -> bool {
    line != 0 && changed.iter().any(|&c| line.abs_diff(c) <= PROXIMITY_WINDOW)
}

fn filter_issues(issues: Vec<Issue>, changed: &BTreeSet<u32>) -> Vec<Issue> {
    issues.into_iter().filter(|i| near_changed(i.line, changed)).collect()
}

/// The caller-facing operation surface over one store connection.
///
/// Cheap to clone; the underlying `tokio_rusqlite::Connection` is a handle
/// onto a single database worker thread, which is what serializes
/// concurrent version writes per database.
#[derive(Clone)]
pub struct ReviewPipeline {
    conn: Connection,
    workers: usize,
}

impl ReviewPipeline {
    pub fn new(conn: Connection) -> Self {
        Self { conn, workers: 4 }
    }

    /// Sets the bounded parallelism used by [`analyze_folder`](Self::analyze_folder).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Shared handle to the underlying store connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Fingerprints `content` and stores a new version unless it matches
    /// the latest stored fingerprint.
    ///
    /// # Errors
    ///
    /// Propagates store failures; no partial version is ever written.
    pub async fn store_version_if_changed(
        &self,
        file_key: &str,
        file_name: &str,
        content: &str,
    ) -> Result<PutOutcome, PipelineError> {
        let fp = fingerprint(content.as_bytes());
        let outcome =
            db::put_version(&self.conn, file_key, file_name, content, fp.as_str()).await?;
        info!(
            file_key,
            created = outcome.created,
            version = outcome.version_number,
            "store_version_if_changed"
        );
        Ok(outcome)
    }

    /// Runs the full five-dimension analysis over `content`. Pure: writes
    /// nothing; use [`record_full_review`](Self::record_full_review) to persist the result.
    ///
    /// # Errors
    ///
    /// Only cancellation fails this; single-pass failures are downgraded to
    /// issues inside the analyzer.
    pub fn run_full_analysis(
        &self,
        content: &str,
        file_name: &str,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult, PipelineError> {
        let kind = FileKind::from_name(file_name);
        let result = analyzer::analyze(content, kind, cancel)?;
        debug!(
            file_name,
            issues = result.issues.len(),
            overall = result.scores.overall,
            "full analysis"
        );
        Ok(result)
    }

    /// Persists a `full` review of `file_key`'s latest stored version.
    ///
    /// # Errors
    ///
    /// `NotFound` when the file has no stored version to attach the review to.
    pub async fn record_full_review(
        &self,
        file_key: &str,
        result: &AnalysisResult,
    ) -> Result<Review, PipelineError> {
        let latest = db::latest_version(&self.conn, file_key)
            .await?
            .ok_or_else(|| {
                revline_core::StoreError::NotFound(format!("no stored version of {file_key}"))
            })?;
        let metrics = serde_json::json!({
            "scores": result.scores,
            "metrics": result.metrics,
        });
        let review = db::insert_review(
            &self.conn,
            &latest.id,
            ReviewType::Full,
            result.metrics.total_lines as i64,
            &result.issues,
            &metrics,
        )
        .await?;
        info!(file_key, review_id = %review.id, "recorded full review");
        Ok(review)
    }

    /// Diffs the latest stored version against `current_content`, analyzes
    /// the changed regions, and persists an incremental review.
    ///
    /// State machine per invocation:
    /// 1. no stored version → `RequiresFullReview`, no writes;
    /// 2. empty changed-line set → `NoChanges`, no writes;
    /// 3. otherwise → full analysis, proximity filter (±2 lines, file-level
    ///    issues dropped), one review write.
    ///
    /// # Errors
    ///
    /// Store failures and cancellation; cancellation before the review
    /// write leaves nothing persisted.
    pub async fn run_incremental_analysis(
        &self,
        file_key: &str,
        file_name: &str,
        current_content: &str,
        cancel: &CancelToken,
    ) -> Result<IncrementalOutcome, PipelineError> {
        let Some(latest) = db::latest_version(&self.conn, file_key).await? else {
            debug!(file_key, "no stored version; full review required");
            return Ok(IncrementalOutcome::terminal(IncrementalStatus::RequiresFullReview));
        };

        let entries = diff::diff(&latest.content, current_content);
        let changed = diff::changed_lines(&entries);
        if changed.is_empty() {
            debug!(file_key, "content unchanged; skipping analysis");
            return Ok(IncrementalOutcome::terminal(IncrementalStatus::NoChanges));
        }
        let diff_stats = diff::stats(&entries);

        let kind = FileKind::from_name(file_name);
        let analysis = analyzer::analyze(current_content, kind, cancel)?;
        let issues = filter_issues(analysis.issues, &changed);

        let metrics = IncrementalMetrics {
            lines_changed: changed.len() as u32,
            lines_added: diff_stats.added,
            lines_deleted: diff_stats.deleted,
            issues_found: issues.len() as u32,
        };
        let metrics_json = serde_json::to_value(metrics)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        cancel.check()?;
        let review = db::insert_review(
            &self.conn,
            &latest.id,
            ReviewType::Incremental,
            changed.len() as i64,
            &issues,
            &metrics_json,
        )
        .await?;
        info!(
            file_key,
            review_id = %review.id,
            lines_changed = metrics.lines_changed,
            issues = metrics.issues_found,
            "recorded incremental review"
        );

        Ok(IncrementalOutcome {
            status: IncrementalStatus::Reviewed,
            changed_lines: changed,
            issues,
            metrics,
            review_id: Some(review.id),
        })
    }

    /// Lists `file_key`'s versions (newest first, content-light) with
    /// summary stats.
    pub async fn get_history(&self, file_key: &str) -> Result<History, PipelineError> {
        let versions = db::history(&self.conn, file_key).await?;
        let total_bytes = versions.iter().map(|v| v.size_bytes).sum();
        Ok(History { version_count: versions.len(), total_bytes, versions })
    }

    /// Diffs two stored versions by id, oldest argument first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; `InvalidInput` when the ids belong to
    /// different file keys.
    pub async fn get_diff(
        &self,
        version_id_a: &str,
        version_id_b: &str,
    ) -> Result<(Vec<DiffEntry>, DiffStats), PipelineError> {
        let a = db::get_version_by_id(&self.conn, version_id_a).await?;
        let b = db::get_version_by_id(&self.conn, version_id_b).await?;
        if a.file_key != b.file_key {
            return Err(PipelineError::InvalidInput(format!(
                "versions {version_id_a} and {version_id_b} belong to different files"
            )));
        }
        let entries = diff::diff(&a.content, &b.content);
        let stats = diff::stats(&entries);
        Ok((entries, stats))
    }

    /// Analyzes every blob under `prefix` with bounded parallelism.
    ///
    /// Files are distributed over a crossbeam worker pool; results are
    /// reassembled in listing order so output is deterministic regardless
    /// of scheduling. Within one file the pipeline stays sequential.
    ///
    /// # Errors
    ///
    /// Blob failures, non-UTF-8 content (`InvalidInput`), and cancellation.
    pub fn analyze_folder(
        &self,
        blobs: &dyn BlobStore,
        prefix: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<FileAnalysis>, PipelineError> {
        let infos = blobs.list(prefix)?;
        info!(prefix, files = infos.len(), workers = self.workers, "batch analysis");

        // Read on the caller thread; analysis is the CPU-bound part.
        let mut jobs = Vec::with_capacity(infos.len());
        for (idx, info) in infos.iter().enumerate() {
            let bytes = blobs.read(&info.key)?;
            let content = String::from_utf8(bytes).map_err(|_| {
                PipelineError::InvalidInput(format!("blob {} is not valid UTF-8", info.key))
            })?;
            jobs.push((idx, info.key.clone(), content));
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        for job in jobs {
            // Receiver lives until the scope below ends; send cannot fail.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        std::thread::scope(|s| {
            for _ in 0..self.workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancel = cancel.clone();
                s.spawn(move || {
                    for (idx, key, content) in job_rx {
                        let kind = FileKind::from_name(&key);
                        let outcome = analyzer::analyze(&content, kind, &cancel);
                        let _ = result_tx.send((idx, key, outcome));
                    }
                });
            }
        });
        drop(result_tx);

        let mut collected: Vec<(usize, String, AnalysisResult)> = Vec::new();
        for (idx, key, outcome) in result_rx {
            collected.push((idx, key, outcome?));
        }
        collected.sort_by_key(|(idx, _, _)| *idx);
        Ok(collected
            .into_iter()
            .map(|(_, key, result)| FileAnalysis { key, result })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revline_core::types::{IssueCategory, Severity};

    fn issue_at(line: u32) -> Issue {
        Issue {
            kind: "x".into(),
            category: IssueCategory::Quality,
            severity: Severity::Warning,
            line,
            message: String::new(),
            suggestion: String::new(),
            auto_fixable: false,
        }
    }

    #[test]
    fn filter_boundary_is_inclusive_at_distance_two() {
        let changed = BTreeSet::from([8]);
        // Issue at line 10: change at 8 (distance 2) keeps it...
        assert!(near_changed(10, &changed));
        // ...change at 12 does too...
        assert!(near_changed(10, &BTreeSet::from([12])));
        // ...but distance 3 on either side drops it.
        assert!(!near_changed(10, &BTreeSet::from([7])));
        assert!(!near_changed(10, &BTreeSet::from([13])));
    }

    #[test]
    fn file_level_issues_never_pass_the_filter() {
        let changed = BTreeSet::from([1, 2, 3]);
        let kept = filter_issues(vec![issue_at(0), issue_at(2)], &changed);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line, 2);
    }

    #[test]
    fn filter_keeps_issue_order() {
        let changed = BTreeSet::from([10]);
        let kept = filter_issues(vec![issue_at(12), issue_at(8), issue_at(30)], &changed);
        let lines: Vec<u32> = kept.iter().map(|i| i.line).collect();
        assert_eq!(lines, vec![12, 8]);
    }
}
