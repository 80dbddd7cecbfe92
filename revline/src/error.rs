//! Pipeline-level error taxonomy.
//!
//! Full-pipeline failures surface one error with a machine-readable kind
//! and human message. Per-dimension analysis failures never reach this
//! layer; the analyzer downgrades them to ordinary issues.

use revline_core::StoreError;
use thiserror::Error;

use crate::cancel::Cancelled;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("blob storage error: {0}")]
    Blob(#[from] std::io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl PipelineError {
    /// Stable machine-readable kind for callers that branch on failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Store(StoreError::NotFound(_)) => "not_found",
            PipelineError::Store(StoreError::InvalidInput(_)) => "invalid_input",
            PipelineError::Store(StoreError::Conflict(_)) => "concurrency_conflict",
            PipelineError::Store(StoreError::Db(_)) => "storage_failure",
            PipelineError::Blob(_) => "storage_failure",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::Cancelled(_) => "cancelled",
        }
    }
}
