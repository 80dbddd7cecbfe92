use thiserror::Error;

/// Errors surfaced by the version/review store.
///
/// Single-dimension analysis failures never appear here; they are
/// downgraded to ordinary issues inside the analyzer. Everything in this
/// enum aborts the calling operation with no partial writes.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested file key or version does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required field was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Two writers raced on version creation and the internal retry also
    /// conflicted.
    #[error("concurrent version write conflict for file key {0}")]
    Conflict(String),

    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
}
