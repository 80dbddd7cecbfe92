//! revline: version-tracked incremental analysis pipeline.
//!
//! Stores immutable file versions deduplicated by content fingerprint,
//! computes line-level diffs between snapshots, runs a five-dimension
//! static analyzer, and scopes re-analysis to changed regions. Persistence
//! lives in `revline-core`; this crate holds the engine and the CLI.

pub mod analyzer;
pub mod blob;
pub mod cancel;
pub mod config;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod pipeline;

pub use error::PipelineError;
pub use pipeline::ReviewPipeline;
