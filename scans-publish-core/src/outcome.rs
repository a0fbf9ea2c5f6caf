//! # outcome: success/failure wrapper shared by every step
//!
//! Steps never panic or bubble raw errors for the expected failure modes. They
//! return an [`Outcome`], whose error side is a [`Failure`] carrying one or
//! more human-readable reasons. Reasons are tagged with a [`FailureKind`] so
//! operators can tell a missing setting from a vendor outage from a broken
//! precondition, but the pipeline treats all kinds the same way.
//!
//! Independent checks are gathered with [`Checks`] so that every problem is
//! reported at once instead of only the first one.

use std::fmt;

use serde::Serialize;

/// The class of a single failure reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A required setting is missing, blank or malformed. Detected before any external call.
    Configuration,
    /// The external service (network, authentication, quota, filesystem) failed.
    External,
    /// A value an earlier step should have put into the publish state is absent.
    Precondition,
    /// The run was cancelled.
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::External => "external",
            FailureKind::Precondition => "precondition",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One human-readable failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reason {
    pub kind: FailureKind,
    pub message: String,
}

/// One or more failure reasons. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{}", join_messages(.reasons))]
pub struct Failure {
    reasons: Vec<Reason>,
}

fn join_messages(reasons: &[Reason]) -> String {
    reasons
        .iter()
        .map(|r| r.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of a step, check or collaborator call.
pub type Outcome<T> = Result<T, Failure>;

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            reasons: vec![Reason {
                kind,
                message: message.into(),
            }],
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Configuration, message)
    }

    pub fn external(message: impl Into<String>) -> Self {
        Self::new(FailureKind::External, message)
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Precondition, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Cancelled, message)
    }

    /// Appends the reasons of `other` after the reasons of `self`.
    pub fn merge(mut self, other: Failure) -> Self {
        self.reasons.extend(other.reasons);
        self
    }

    /// Prefixes every reason message with `context`.
    pub fn with_context(mut self, context: &str) -> Self {
        for reason in &mut self.reasons {
            reason.message = format!("{context}: {}", reason.message);
        }
        self
    }

    pub fn reasons(&self) -> &[Reason] {
        &self.reasons
    }

    pub fn messages(&self) -> Vec<&str> {
        self.reasons.iter().map(|r| r.message.as_str()).collect()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.reasons.iter().any(|r| r.kind == kind)
    }

    pub fn is_cancelled(&self) -> bool {
        self.has_kind(FailureKind::Cancelled)
    }
}

/// Accumulates the results of independent checks into a single [`Outcome`].
#[derive(Debug, Default)]
pub struct Checks {
    failure: Option<Failure>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure reason of `kind` unless `ok` holds.
    pub fn require(&mut self, ok: bool, kind: FailureKind, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.push(Failure::new(kind, message));
        }
        self
    }

    /// Records a configuration failure unless `value` holds a non-blank string.
    pub fn require_setting(&mut self, value: Option<&str>, message: impl Into<String>) -> &mut Self {
        let present = value.map(|v| !v.trim().is_empty()).unwrap_or(false);
        self.require(present, FailureKind::Configuration, message)
    }

    pub fn push(&mut self, failure: Failure) {
        self.failure = Some(match self.failure.take() {
            Some(existing) => existing.merge(failure),
            None => failure,
        });
    }

    /// Keeps the value of a successful outcome, records the failure otherwise.
    pub fn absorb<T>(&mut self, outcome: Outcome<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(failure) => {
                self.push(failure);
                None
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failure.is_none()
    }

    pub fn finish(self) -> Outcome<()> {
        match self.failure {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Converts lower-level errors into [`Failure`]s at a step's failure boundary.
pub trait FailureContext<T> {
    /// Wraps the error as an [`FailureKind::External`] reason prefixed with `context`.
    fn or_external(self, context: &str) -> Outcome<T>;

    /// Wraps the error as a [`FailureKind::Precondition`] reason prefixed with `context`.
    fn or_precondition(self, context: &str) -> Outcome<T>;
}

impl<T, E: fmt::Display> FailureContext<T> for Result<T, E> {
    fn or_external(self, context: &str) -> Outcome<T> {
        self.map_err(|e| Failure::external(format!("{context}: {e}")))
    }

    fn or_precondition(self, context: &str) -> Outcome<T> {
        self.map_err(|e| Failure::precondition(format!("{context}: {e}")))
    }
}
