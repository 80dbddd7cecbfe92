use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::StoreError;
use crate::types::{Issue, PutOutcome, Review, ReviewType, Version, VersionSummary};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// This function is the single entry point for all database connections.
/// It sets `busy_timeout` via the `Connection` method (not a PRAGMA string)
/// so the setting takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `StoreError::Db` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)
        .await
        .map_err(tokio_rusqlite::Error::from)?;

    // WAL pragmas: connection-level settings re-applied on every open.
    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    // Apply schema migrations via the schema_version versioning system.
    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// True when `e` is the UNIQUE(file_key, version_number) violation raised by
/// two writers racing to insert the same next version number.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// One attempt at a conditional version insert.
///
/// Reads the latest fingerprint and number for `file_key` and inserts
/// `latest + 1` (or 1) inside a single `BEGIN IMMEDIATE` transaction, so the
/// read-then-write pair is serialized per database. A fingerprint match
/// rolls back without writing and reports the existing number.
fn try_put(
    db: &mut rusqlite::Connection,
    file_key: &str,
    file_name: &str,
    content: &str,
    fingerprint: &str,
) -> rusqlite::Result<PutOutcome> {
    let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    let latest: Option<(String, i64)> = tx
        .query_row(
            "SELECT fingerprint, version_number FROM versions
             WHERE file_key = ?1
             ORDER BY version_number DESC
             LIMIT 1",
            rusqlite::params![file_key],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    if let Some((ref latest_fp, number)) = latest {
        if latest_fp == fingerprint {
            // Identical content: idempotent no-op, transaction discarded.
            return Ok(PutOutcome { created: false, version_number: number });
        }
    }

    let next = latest.map(|(_, n)| n + 1).unwrap_or(1);
    let id = uuid::Uuid::new_v4().to_string();
    let now = now_secs();
    tx.execute(
        "INSERT INTO versions
             (id, file_key, file_name, version_number, content, fingerprint,
              size_bytes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            &id,
            file_key,
            file_name,
            next,
            content,
            fingerprint,
            content.len() as i64,
            now
        ],
    )?;
    tx.commit()?;

    Ok(PutOutcome { created: true, version_number: next })
}

/// Stores a new version of `file_key` unless `fingerprint` matches the
/// latest stored version (dedup).
///
/// Version numbers are gapless and strictly increasing per file key,
/// starting at 1. Concurrent writers are serialized by the `BEGIN
/// IMMEDIATE` transaction inside [`try_put`]; if the UNIQUE constraint
/// still fires, the insert is retried once with a fresh latest read.
///
/// # Errors
///
/// `StoreError::InvalidInput` on an empty file key,
/// `StoreError::Conflict` when the retry also conflicted,
/// `StoreError::Db` on any other SQLite failure.
pub async fn put_version(
    conn: &Connection,
    file_key: &str,
    file_name: &str,
    content: &str,
    fingerprint: &str,
) -> Result<PutOutcome, StoreError> {
    if file_key.is_empty() {
        return Err(StoreError::InvalidInput("file key must not be empty".into()));
    }

    let key = file_key.to_owned();
    let name = file_name.to_owned();
    let content = content.to_owned();
    let fp = fingerprint.to_owned();

    let outcome: Option<PutOutcome> = conn
        .call(move |db| put_with_retry(&mut || try_put(db, &key, &name, &content, &fp)))
        .await?;

    outcome.ok_or_else(|| StoreError::Conflict(file_key.to_owned()))
}

/// Runs one insert attempt, retrying once on a unique violation.
///
/// `Ok(None)` means both attempts hit the constraint; the caller maps it
/// to `StoreError::Conflict`. Non-constraint errors propagate unchanged.
fn put_with_retry(
    attempt: &mut dyn FnMut() -> rusqlite::Result<PutOutcome>,
) -> rusqlite::Result<Option<PutOutcome>> {
    match attempt() {
        Ok(o) => Ok(Some(o)),
        Err(e) if is_unique_violation(&e) => {
            // Two writers raced to the same number. Retry once with a
            // fresh latest read, then give up.
            match attempt() {
                Ok(o) => Ok(Some(o)),
                Err(e2) if is_unique_violation(&e2) => Ok(None),
                Err(e2) => Err(e2),
            }
        }
        Err(e) => Err(e),
    }
}

fn version_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: r.get(0)?,
        file_key: r.get(1)?,
        file_name: r.get(2)?,
        version_number: r.get(3)?,
        content: r.get(4)?,
        fingerprint: r.get(5)?,
        size_bytes: r.get(6)?,
        created_at: r.get(7)?,
    })
}

const VERSION_COLS: &str =
    "id, file_key, file_name, version_number, content, fingerprint, size_bytes, created_at";

/// Fetches one version of `file_key` by version number.
///
/// # Errors
///
/// `StoreError::NotFound` if no such (file key, number) pair exists.
pub async fn get_version(
    conn: &Connection,
    file_key: &str,
    version_number: i64,
) -> Result<Version, StoreError> {
    let key = file_key.to_owned();
    let found: Option<Version> = conn
        .call(move |db| {
            let v = db
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLS} FROM versions
                         WHERE file_key = ?1 AND version_number = ?2"
                    ),
                    rusqlite::params![&key, version_number],
                    version_from_row,
                )
                .optional()?;
            Ok::<_, rusqlite::Error>(v)
        })
        .await?;

    found.ok_or_else(|| {
        StoreError::NotFound(format!("version {version_number} of {file_key}"))
    })
}

/// Fetches one version by its UUID.
///
/// # Errors
///
/// `StoreError::NotFound` if the id does not exist.
pub async fn get_version_by_id(conn: &Connection, id: &str) -> Result<Version, StoreError> {
    let wanted = id.to_owned();
    let found: Option<Version> = conn
        .call(move |db| {
            let v = db
                .query_row(
                    &format!("SELECT {VERSION_COLS} FROM versions WHERE id = ?1"),
                    rusqlite::params![&wanted],
                    version_from_row,
                )
                .optional()?;
            Ok::<_, rusqlite::Error>(v)
        })
        .await?;

    found.ok_or_else(|| StoreError::NotFound(format!("version id {id}")))
}

/// Fetches the most recent version of `file_key`, or `None` when the file
/// has never been saved.
///
/// # Errors
///
/// `StoreError::Db` on query failure.
pub async fn latest_version(
    conn: &Connection,
    file_key: &str,
) -> Result<Option<Version>, StoreError> {
    let key = file_key.to_owned();
    let found: Option<Version> = conn
        .call(move |db| {
            let v = db
                .query_row(
                    &format!(
                        "SELECT {VERSION_COLS} FROM versions
                         WHERE file_key = ?1
                         ORDER BY version_number DESC
                         LIMIT 1"
                    ),
                    rusqlite::params![&key],
                    version_from_row,
                )
                .optional()?;
            Ok::<_, rusqlite::Error>(v)
        })
        .await?;
    Ok(found)
}

/// Lists all versions of `file_key`, newest first, without loading content.
///
/// # Errors
///
/// `StoreError::Db` on query failure. An unknown file key yields an empty list.
pub async fn history(
    conn: &Connection,
    file_key: &str,
) -> Result<Vec<VersionSummary>, StoreError> {
    let key = file_key.to_owned();
    let rows = conn
        .call(move |db| {
            let mut stmt = db.prepare(
                "SELECT id, version_number, fingerprint, size_bytes, created_at
                 FROM versions
                 WHERE file_key = ?1
                 ORDER BY version_number DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![&key], |r| {
                    Ok(VersionSummary {
                        id: r.get(0)?,
                        version_number: r.get(1)?,
                        fingerprint: r.get(2)?,
                        size_bytes: r.get(3)?,
                        created_at: r.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok::<_, rusqlite::Error>(rows)
        })
        .await?;
    Ok(rows)
}

/// Persists one review record against a stored version.
///
/// Issues and metrics are serialized to JSON text columns. The insert runs
/// inside `BEGIN IMMEDIATE`; reviews are never updated afterwards.
///
/// # Errors
///
/// `StoreError::InvalidInput` if serialization fails, `StoreError::Db`
/// if the insert fails (including an unknown `file_version_id`, which
/// violates the foreign key).
pub async fn insert_review(
    conn: &Connection,
    file_version_id: &str,
    review_type: ReviewType,
    lines_reviewed: i64,
    issues: &[Issue],
    metrics: &serde_json::Value,
) -> Result<Review, StoreError> {
    let issues_json = serde_json::to_string(issues)
        .map_err(|e| StoreError::InvalidInput(format!("unserializable issues: {e}")))?;
    let metrics_json = metrics.to_string();

    let version_id = file_version_id.to_owned();
    let id = uuid::Uuid::new_v4().to_string();
    let review = Review {
        id: id.clone(),
        file_version_id: version_id.clone(),
        review_type,
        lines_reviewed,
        issues: issues.to_vec(),
        metrics: metrics.clone(),
        created_at: now_secs(),
    };
    let created_at = review.created_at;

    conn.call(move |db| {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO reviews
                 (id, file_version_id, review_type, lines_reviewed, issues,
                  metrics, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                &id,
                &version_id,
                review_type.as_str(),
                lines_reviewed,
                &issues_json,
                &metrics_json,
                created_at
            ],
        )?;
        tx.commit()?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(review)
}

/// Loads all reviews recorded against `file_version_id`, newest first.
///
/// # Errors
///
/// `StoreError::InvalidInput` if a stored JSON column fails to parse
/// (indicates out-of-band tampering), `StoreError::Db` on query failure.
pub async fn list_reviews(
    conn: &Connection,
    file_version_id: &str,
) -> Result<Vec<Review>, StoreError> {
    let version_id = file_version_id.to_owned();
    let raw: Vec<(String, String, String, i64, String, String, i64)> = conn
        .call(move |db| {
            let mut stmt = db.prepare(
                "SELECT id, file_version_id, review_type, lines_reviewed,
                        issues, metrics, created_at
                 FROM reviews
                 WHERE file_version_id = ?1
                 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![&version_id], |r| {
                    Ok((
                        r.get(0)?,
                        r.get(1)?,
                        r.get(2)?,
                        r.get(3)?,
                        r.get(4)?,
                        r.get(5)?,
                        r.get(6)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok::<_, rusqlite::Error>(rows)
        })
        .await?;

    raw.into_iter()
        .map(|(id, fvid, rtype, lines, issues, metrics, created_at)| {
            let review_type = ReviewType::parse(&rtype).ok_or_else(|| {
                StoreError::InvalidInput(format!("unknown review type {rtype:?}"))
            })?;
            let issues: Vec<Issue> = serde_json::from_str(&issues)
                .map_err(|e| StoreError::InvalidInput(format!("bad issues JSON: {e}")))?;
            let metrics: serde_json::Value = serde_json::from_str(&metrics)
                .map_err(|e| StoreError::InvalidInput(format!("bad metrics JSON: {e}")))?;
            Ok(Review {
                id,
                file_version_id: fvid,
                review_type,
                lines_reviewed: lines,
                issues,
                metrics,
                created_at,
            })
        })
        .collect()
}
