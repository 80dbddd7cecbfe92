//! Integration test for the full save/review pipeline.
//!
//! Exercises: store_version_if_changed dedup, the incremental state
//! machine (requires-full / no-changes / reviewed), review persistence,
//! history stats, version diffing, and batch folder analysis.

use revline::blob::{BlobStore, FsBlobStore};
use revline::cancel::CancelToken;
use revline::pipeline::{IncrementalStatus, ReviewPipeline};
use revline::PipelineError;
use revline_core::db;

async fn pipeline() -> ReviewPipeline {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    let conn = db::open_db(&path.to_string_lossy()).await.unwrap();
    ReviewPipeline::new(conn).with_workers(2)
}

const V1: &str = "const a = 1\nconst b = 2\nconst c = 3\n";
const V2: &str = "const a = 1\nvar b = 2\nconst c = 3\n";

#[tokio::test]
async fn incremental_state_machine() {
    let p = pipeline().await;
    let cancel = CancelToken::new();

    // No stored version yet: terminal RequiresFullReview, nothing analyzed.
    let out = p
        .run_incremental_analysis("u1/a.js", "a.js", V1, &cancel)
        .await
        .unwrap();
    assert_eq!(out.status, IncrementalStatus::RequiresFullReview);
    assert!(out.issues.is_empty());
    assert!(out.review_id.is_none());

    // Save v1, then review identical content: terminal NoChanges.
    let put = p.store_version_if_changed("u1/a.js", "a.js", V1).await.unwrap();
    assert!(put.created);
    assert_eq!(put.version_number, 1);

    let out = p
        .run_incremental_analysis("u1/a.js", "a.js", V1, &cancel)
        .await
        .unwrap();
    assert_eq!(out.status, IncrementalStatus::NoChanges);
    assert!(out.changed_lines.is_empty());
    assert_eq!(out.metrics.issues_found, 0);

    // Edit line 2 to a `var` declaration: the incremental review reports
    // the new issue near the changed line and persists one review.
    let out = p
        .run_incremental_analysis("u1/a.js", "a.js", V2, &cancel)
        .await
        .unwrap();
    assert_eq!(out.status, IncrementalStatus::Reviewed);
    assert_eq!(out.changed_lines.iter().copied().collect::<Vec<u32>>(), vec![2]);
    assert_eq!(out.metrics.lines_changed, 1);
    assert!(out.issues.iter().any(|i| i.kind == "no-var" && i.line == 2));

    let review_id = out.review_id.expect("review persisted");

    // The review hangs off version 1 (the latest stored version).
    let latest = db::latest_version(p_conn(&p), "u1/a.js").await.unwrap().unwrap();
    let reviews = db::list_reviews(p_conn(&p), &latest.id).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].id, review_id);
    assert_eq!(reviews[0].lines_reviewed, 1);
    assert_eq!(reviews[0].metrics["issues_found"], out.metrics.issues_found);
}

// The pipeline clones cheaply and shares its connection; tests reach the
// store through a clone to verify persisted state.
fn p_conn(p: &ReviewPipeline) -> &tokio_rusqlite::Connection {
    p.connection()
}

#[tokio::test]
async fn save_dedup_and_history() {
    let p = pipeline().await;

    let put = p.store_version_if_changed("u1/b.js", "b.js", V1).await.unwrap();
    assert!(put.created);
    let put = p.store_version_if_changed("u1/b.js", "b.js", V1).await.unwrap();
    assert!(!put.created, "identical content must not create a version");
    assert_eq!(put.version_number, 1);
    let put = p.store_version_if_changed("u1/b.js", "b.js", V2).await.unwrap();
    assert!(put.created);
    assert_eq!(put.version_number, 2);

    let history = p.get_history("u1/b.js").await.unwrap();
    assert_eq!(history.version_count, 2);
    assert_eq!(history.versions[0].version_number, 2);
    assert_eq!(
        history.total_bytes,
        (V1.len() + V2.len()) as i64
    );
}

#[tokio::test]
async fn diff_between_stored_versions() {
    let p = pipeline().await;
    p.store_version_if_changed("u1/c.js", "c.js", V1).await.unwrap();
    p.store_version_if_changed("u1/c.js", "c.js", V2).await.unwrap();

    let history = p.get_history("u1/c.js").await.unwrap();
    let (newest, oldest) = (&history.versions[0], &history.versions[1]);

    let (entries, stats) = p.get_diff(&oldest.id, &newest.id).await.unwrap();
    assert_eq!(stats.modified, 1);
    assert_eq!(stats.added + stats.deleted, 0);
    assert_eq!(entries[0].line, 2);

    // Unknown id surfaces NotFound.
    let err = p.get_diff(&oldest.id, "no-such-id").await.unwrap_err();
    assert_eq!(err.kind(), "not_found");

    // Versions of different files refuse to diff.
    p.store_version_if_changed("u1/other.js", "other.js", V1).await.unwrap();
    let other = p.get_history("u1/other.js").await.unwrap();
    let err = p.get_diff(&oldest.id, &other.versions[0].id).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
}

#[tokio::test]
async fn full_review_recording() {
    let p = pipeline().await;
    let cancel = CancelToken::new();
    let content = "var x = 1\nif (x == 1) { console.log(x) }\n";

    p.store_version_if_changed("u1/d.js", "d.js", content).await.unwrap();
    let result = p.run_full_analysis(content, "d.js", &cancel).unwrap();
    assert!(result.issues.len() >= 3);

    let review = p.record_full_review("u1/d.js", &result).await.unwrap();
    assert_eq!(review.review_type, revline_core::types::ReviewType::Full);
    assert_eq!(review.issues.len(), result.issues.len());

    // Recording against a never-saved key is NotFound.
    let err = p.record_full_review("u1/ghost.js", &result).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn cancelled_incremental_writes_nothing() {
    let p = pipeline().await;
    p.store_version_if_changed("u1/e.js", "e.js", V1).await.unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = p
        .run_incremental_analysis("u1/e.js", "e.js", V2, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "cancelled");

    let latest = db::latest_version(p_conn(&p), "u1/e.js").await.unwrap().unwrap();
    let reviews = db::list_reviews(p_conn(&p), &latest.id).await.unwrap();
    assert!(reviews.is_empty(), "no partial review after cancellation");
}

#[tokio::test]
async fn folder_batch_analysis_in_listing_order() {
    let p = pipeline().await;
    let dir = tempfile::TempDir::new().unwrap();
    let blobs = FsBlobStore::new(dir.path());

    blobs.write("u1/src/z.js", b"var z = 1\n").unwrap();
    blobs.write("u1/src/a.js", b"const a = 1\n").unwrap();
    blobs.write("u1/other/skip.js", b"eval(x)\n").unwrap();

    let results = p.analyze_folder(&blobs, "u1/src/", &CancelToken::new()).unwrap();
    let keys: Vec<&str> = results.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["u1/src/a.js", "u1/src/z.js"]);
    assert!(results[0].result.issues.is_empty());
    assert!(results[1].result.issues.iter().any(|i| i.kind == "no-var"));

    // Non-UTF-8 blob content is InvalidInput.
    blobs.write("u1/bin/raw", &[0xff, 0xfe, 0x00]).unwrap();
    let err = p
        .analyze_folder(&blobs, "u1/bin/", &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}
