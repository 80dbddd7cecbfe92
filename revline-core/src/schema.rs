/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the full v1 schema.
///
/// Contains two tables:
/// - `versions`: one immutable row per stored file snapshot, keyed by UUID
///   v4 text. `UNIQUE(file_key, version_number)` backs the gapless
///   numbering invariant and turns a racing double-insert into a
///   constraint error instead of a duplicate number.
/// - `reviews`: one immutable row per analysis run, referencing the version
///   it reviewed. `issues` and `metrics` hold JSON text.
///
/// All tables use `STRICT` mode for type enforcement.
/// Removing a version cascades to its reviews.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS versions (
        id             TEXT    PRIMARY KEY,
        file_key       TEXT    NOT NULL,
        file_name      TEXT    NOT NULL,
        version_number INTEGER NOT NULL,
        content        TEXT    NOT NULL,
        fingerprint    TEXT    NOT NULL,
        size_bytes     INTEGER NOT NULL,
        created_at     INTEGER NOT NULL,
        UNIQUE (file_key, version_number)
    ) STRICT;

    CREATE INDEX IF NOT EXISTS idx_versions_file_key
        ON versions (file_key, version_number DESC);

    CREATE TABLE IF NOT EXISTS reviews (
        id              TEXT    PRIMARY KEY,
        file_version_id TEXT    NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
        review_type     TEXT    NOT NULL
                                CHECK(review_type IN ('full', 'incremental')),
        lines_reviewed  INTEGER NOT NULL DEFAULT 0,
        issues          TEXT    NOT NULL DEFAULT '[]',
        metrics         TEXT    NOT NULL DEFAULT '{}',
        created_at      INTEGER NOT NULL
    ) STRICT;
";

/// Runs forward-only schema migration to bring the DB to the latest version.
///
/// Idempotent: safe to call on every startup regardless of whether the
/// schema has already been applied.
///
/// # Process
///
/// 1. Creates the `schema_version` table if it does not exist.
/// 2. Reads the current version (`0` if the table is empty).
/// 3. If the version is below 1, applies `SCHEMA_V1_SQL` inside a
///    `BEGIN IMMEDIATE` transaction and records `version = 1`.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
