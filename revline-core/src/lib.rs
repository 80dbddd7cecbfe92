//! revline-core: persistence layer for the revline analysis pipeline.
//!
//! Owns the WAL-mode SQLite database holding immutable file versions and
//! review records, the forward-only schema migrations, and the async store
//! operations built on `tokio-rusqlite`. The analysis engine itself lives
//! in the `revline` crate; this crate knows nothing about diffing or rules.

pub mod db;
pub mod error;
pub mod schema;
pub mod types;

pub use error::StoreError;
