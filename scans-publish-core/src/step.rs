//! The unit of work of a publish run.

use async_trait::async_trait;

use crate::cancel::CancellationFlag;
use crate::outcome::Outcome;
use crate::state::PublishState;

/// One external side effect and its mapping into the [`PublishState`].
///
/// A step is built once per pipeline definition and executed at most once per
/// run. It reports every expected failure (missing setting, vendor error,
/// missing upstream value, cancellation) through its [`Outcome`]. Retrying a
/// transient vendor fault is the step's own business, see [`crate::retry`].
#[async_trait]
pub trait Step: Send + Sync {
    /// Stable identifier used in logs and failure reports.
    fn name(&self) -> &str;

    /// Configuration checks, run once when the pipeline is built.
    fn validate(&self) -> Outcome<()> {
        Ok(())
    }

    /// Perform the side effect and record what it produced in `state`.
    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()>;

    /// Revert the side effect of a successful [`Step::execute`].
    ///
    /// Only called when the pipeline runs with [`crate::pipeline::Compensation::Reverse`].
    async fn undo(&self, _state: &PublishState) -> Outcome<()> {
        Ok(())
    }
}
