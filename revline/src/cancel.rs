//! Caller-supplied cancellation for CPU-bound analysis work.
//!
//! A `CancelToken` is an `Arc<AtomicBool>` flag plus an optional deadline,
//! polled between analysis passes. Cancellation aborts the in-flight run
//! with [`Cancelled`] before any persistence happens, so no partial review
//! or version is ever written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// The analysis run was cancelled by its caller or its deadline passed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("analysis cancelled")]
pub struct Cancelled;

/// Cooperative cancellation handle. Cloning shares the underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that never fires unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that additionally fires once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)), deadline: Some(Instant::now() + timeout) }
    }

    /// Requests cancellation. All clones observe it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Poll point for long-running work.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
