//! Cooperative cancellation of a publish run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::outcome::{Failure, Outcome};

/// Cooperative cancellation signal shared by the caller and every step of a run.
///
/// Clones share the same flag. Steps call [`CancellationFlag::check`] before
/// each external call; the pipeline never interrupts a step that ignores it.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fails with a cancelled reason naming `operation` once the flag is set.
    pub fn check(&self, operation: &str) -> Outcome<()> {
        if self.is_cancelled() {
            tracing::warn!(operation, "[PUBLISH] Cancellation observed");
            return Err(Failure::cancelled(format!("{operation} was cancelled")));
        }
        Ok(())
    }
}
