//! Per-step retry policies.
//!
//! The pipeline itself never retries a step. Steps that talk to flaky vendor
//! APIs opt into one of the policies below instead of hand-rolling loops.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cancel::CancellationFlag;
use crate::contract::ProviderError;
use crate::outcome::{FailureKind, Outcome};

/// Retries an operation while it fails with external (transient) reasons only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Single attempt.
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Up to `attempts` attempts in total (at least one).
    pub fn attempts(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.attempts
    }

    /// Runs `op` until it succeeds, fails with a non-external reason, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Cancellation is checked before every attempt.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: &CancellationFlag,
        mut op: F,
    ) -> Outcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Outcome<T>>,
    {
        let mut attempt = 1;
        loop {
            cancel.check(operation)?;
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(failure) => {
                    let transient = failure
                        .reasons()
                        .iter()
                        .all(|r| r.kind == FailureKind::External);
                    if !transient || attempt >= self.attempts {
                        return Err(failure);
                    }
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.attempts,
                        error = %failure,
                        "[PUBLISH][RETRY] Transient failure, retrying"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Where a storage step puts its files, and where it falls back to.
///
/// `None` means the provider's root folder. A call that fails against
/// `parent_id` is retried once against `fallback_parent_id`, unless both name
/// the same folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTarget {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub fallback_parent_id: Option<String>,
}

impl FolderTarget {
    pub fn root() -> Self {
        Self::default()
    }

    /// Use `parent_id`, falling back to the root folder.
    pub fn under(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: Some(parent_id.into()),
            fallback_parent_id: None,
        }
    }

    pub fn with_fallback(mut self, fallback_parent_id: Option<String>) -> Self {
        self.fallback_parent_id = fallback_parent_id;
        self
    }

    /// Calls `op` with the primary parent, then once more with the fallback parent on error.
    pub async fn attempt<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match op(self.parent_id.clone()).await {
            Ok(value) => Ok(value),
            Err(e) if self.fallback_parent_id != self.parent_id => {
                warn!(
                    operation,
                    parent_id = ?self.parent_id,
                    fallback_parent_id = ?self.fallback_parent_id,
                    error = %e,
                    "[PUBLISH][RETRY] Call failed against parent folder, retrying with fallback"
                );
                op(self.fallback_parent_id.clone()).await
            }
            Err(e) => Err(e),
        }
    }
}
