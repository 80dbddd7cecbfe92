//! Integration test for the version/review store lifecycle.
//!
//! Exercises: open_db, migrate, put_version dedup + numbering, get/latest,
//! history ordering, review persistence across connections.

use revline_core::db;
use revline_core::types::ReviewType;
use revline_core::StoreError;

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn version_lifecycle() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Verify schema_version = 1
    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    // Verify WAL mode
    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    // First save always creates version 1.
    let out = db::put_version(&conn, "u1/docs/a.js", "a.js", "hello\n", "fp-1")
        .await
        .unwrap();
    assert!(out.created);
    assert_eq!(out.version_number, 1);

    // Identical fingerprint: idempotent no-op, same number.
    let out = db::put_version(&conn, "u1/docs/a.js", "a.js", "hello\n", "fp-1")
        .await
        .unwrap();
    assert!(!out.created, "identical save must not create a version");
    assert_eq!(out.version_number, 1);

    // Changed fingerprint: version 2.
    let out = db::put_version(&conn, "u1/docs/a.js", "a.js", "hello world\n", "fp-2")
        .await
        .unwrap();
    assert!(out.created);
    assert_eq!(out.version_number, 2);

    // A different file key has its own sequence starting at 1.
    let out = db::put_version(&conn, "u1/docs/b.js", "b.js", "other\n", "fp-3")
        .await
        .unwrap();
    assert_eq!(out.version_number, 1);

    // latest returns version 2 with full content.
    let latest = db::latest_version(&conn, "u1/docs/a.js").await.unwrap().unwrap();
    assert_eq!(latest.version_number, 2);
    assert_eq!(latest.content, "hello world\n");
    assert_eq!(latest.fingerprint, "fp-2");
    assert_eq!(latest.size_bytes, "hello world\n".len() as i64);

    // get by (key, number) and by id agree.
    let v1 = db::get_version(&conn, "u1/docs/a.js", 1).await.unwrap();
    assert_eq!(v1.content, "hello\n");
    let same = db::get_version_by_id(&conn, &v1.id).await.unwrap();
    assert_eq!(same.version_number, 1);

    // Unknown version surfaces NotFound.
    let err = db::get_version(&conn, "u1/docs/a.js", 9).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    // History: newest first, no content loaded.
    let hist = db::history(&conn, "u1/docs/a.js").await.unwrap();
    assert_eq!(hist.len(), 2);
    assert_eq!(hist[0].version_number, 2);
    assert_eq!(hist[1].version_number, 1);

    // Unknown key yields an empty history, not an error.
    let hist = db::history(&conn, "u1/docs/missing.js").await.unwrap();
    assert!(hist.is_empty());

    // latest on an unknown key is None.
    assert!(db::latest_version(&conn, "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn review_persistence() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    let out = db::put_version(&conn, "u1/src/x.js", "x.js", "var a = 1\n", "fp-x1")
        .await
        .unwrap();
    assert_eq!(out.version_number, 1);
    let v = db::latest_version(&conn, "u1/src/x.js").await.unwrap().unwrap();

    let issues = vec![revline_core::types::Issue {
        kind: "no-var".into(),
        category: revline_core::types::IssueCategory::Style,
        severity: revline_core::types::Severity::Warning,
        line: 1,
        message: "var declaration".into(),
        suggestion: "use let or const".into(),
        auto_fixable: true,
    }];
    let metrics = serde_json::json!({ "lines_changed": 1, "issues_found": 1 });

    let review = db::insert_review(&conn, &v.id, ReviewType::Incremental, 1, &issues, &metrics)
        .await
        .unwrap();
    assert_eq!(review.file_version_id, v.id);
    assert_eq!(review.review_type, ReviewType::Incremental);

    // Reviews round-trip across a second connection to the same DB.
    let conn2 = db::open_db(&path).await.unwrap();
    let loaded = db::list_reviews(&conn2, &v.id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, review.id);
    assert_eq!(loaded[0].lines_reviewed, 1);
    assert_eq!(loaded[0].issues, issues);
    assert_eq!(loaded[0].metrics["issues_found"], 1);

    // Reviews against an unknown version id violate the foreign key.
    let err = db::insert_review(&conn, "no-such-id", ReviewType::Full, 0, &[], &metrics)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
}

#[tokio::test]
async fn concurrent_puts_never_gap() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Saturate the same file key from many tasks with distinct fingerprints.
    let mut handles = Vec::new();
    for i in 0..8 {
        let conn = conn.clone();
        handles.push(tokio::spawn(async move {
            db::put_version(
                &conn,
                "u1/hot.js",
                "hot.js",
                &format!("content {i}\n"),
                &format!("fp-{i}"),
            )
            .await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    // Numbers must be exactly 1..=8 in descending history order.
    let hist = db::history(&conn, "u1/hot.js").await.unwrap();
    let numbers: Vec<i64> = hist.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, (1..=8).rev().collect::<Vec<i64>>());
}

#[tokio::test]
async fn empty_file_key_rejected() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let err = db::put_version(&conn, "", "a.js", "x", "fp").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}
