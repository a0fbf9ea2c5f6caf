//! High-level pipeline: runs the publish steps of one release in order.
//!
//! This module provides the steps service, the runner that takes a release
//! from "files on disk" to "links everywhere and a blog post announcing them".
//! It:
//!   - Executes a fixed, ordered list of [`Step`]s against one [`PublishState`]
//!   - Stops at the first failing step; later steps are never invoked
//!   - Tags the failure with the step's name and the steps that already ran
//!   - Optionally unwinds completed steps in reverse order ([`Compensation::Reverse`])
//!
//! # Responsibilities
//! - Fail-fast orchestration: no partial announcement is ever produced, since
//!   rendering and posting are steps themselves and run last
//! - Tracing throughout (one span per run with a `run_id`, one per step)
//! - No I/O of its own beyond invoking steps
//!
//! # Error Handling
//! A cancelled run is reported exactly like any other failure. Side effects of
//! steps that already succeeded stay in place unless compensation is enabled;
//! the failure report lists them so an operator can clean up by hand.
//!
//! # Navigation
//! - Main entrypoint: [`StepsService::run`]
//! - Construction: [`StepsService::builder`]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cancel::CancellationFlag;
use crate::outcome::{Checks, Failure, Outcome};
use crate::state::PublishState;
use crate::step::Step;

/// What to do with completed steps when a later step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compensation {
    /// Leave every committed side effect in place.
    #[default]
    None,
    /// Call [`Step::undo`] on every completed step, most recent first.
    Reverse,
}

/// An `undo` that itself failed during compensation.
#[derive(Debug, Clone)]
pub struct CompensationFailure {
    pub step: String,
    pub failure: Failure,
}

/// Report of a failed run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Publish step '{step}' failed: {failure}")]
pub struct PipelineFailure {
    /// Name of the step that failed.
    pub step: String,
    pub failure: Failure,
    /// Steps that completed before the failure, in execution order.
    pub completed: Vec<String>,
    /// Undo failures, empty unless compensation ran and something went wrong.
    pub compensation: Vec<CompensationFailure>,
}

impl PipelineFailure {
    pub fn is_cancelled(&self) -> bool {
        self.failure.is_cancelled()
    }
}

/// Owns the ordered steps of a publish pipeline.
///
/// Steps hold no per-run state, so one service can drive several runs
/// concurrently as long as each run owns its [`PublishState`].
pub struct StepsService {
    steps: Vec<Box<dyn Step>>,
    compensation: Compensation,
}

pub struct StepsServiceBuilder {
    steps: Vec<Box<dyn Step>>,
    compensation: Compensation,
}

impl StepsServiceBuilder {
    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn boxed_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn compensation(mut self, compensation: Compensation) -> Self {
        self.compensation = compensation;
        self
    }

    /// Validates step names and every step's configuration, reporting all problems at once.
    pub fn build(self) -> Outcome<StepsService> {
        let mut checks = Checks::new();
        let mut seen = HashSet::new();
        for step in &self.steps {
            let name = step.name();
            if !seen.insert(name.to_string()) {
                checks.push(Failure::configuration(format!(
                    "Step name '{name}' is used more than once"
                )));
            }
            if let Err(failure) = step.validate() {
                checks.push(failure.with_context(name));
            }
        }
        if let Err(failure) = checks.finish() {
            error!(error = %failure, "[PUBLISH][ERROR] Pipeline configuration is invalid");
            return Err(failure);
        }
        info!(
            steps = self.steps.len(),
            compensation = ?self.compensation,
            "[PUBLISH] Pipeline built"
        );
        Ok(StepsService {
            steps: self.steps,
            compensation: self.compensation,
        })
    }
}

impl StepsService {
    pub fn builder() -> StepsServiceBuilder {
        StepsServiceBuilder {
            steps: Vec::new(),
            compensation: Compensation::None,
        }
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order against `state`.
    ///
    /// Returns the final state when all steps succeed, or the failure of the
    /// first step that did not.
    pub async fn run(
        &self,
        state: PublishState,
        cancel: &CancellationFlag,
    ) -> Result<PublishState, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "publish_run",
            %run_id,
            title = %state.info.display_title,
            chapter = %state.info.chapter_number
        );
        self.run_steps(state, cancel).instrument(span).await
    }

    async fn run_steps(
        &self,
        mut state: PublishState,
        cancel: &CancellationFlag,
    ) -> Result<PublishState, PipelineFailure> {
        info!(steps = self.steps.len(), "[PUBLISH] Starting publish pipeline");

        let mut completed: Vec<usize> = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();
            info!(step = name, index, "[PUBLISH] Running step");

            let outcome = match cancel.check(name) {
                Ok(()) => {
                    step.execute(&mut state, cancel)
                        .instrument(info_span!("publish_step", step = name, index))
                        .await
                }
                Err(failure) => Err(failure),
            };

            match outcome {
                Ok(()) => {
                    info!(step = name, links = state.links.len(), "[PUBLISH] Step succeeded");
                    completed.push(index);
                }
                Err(failure) => {
                    error!(step = name, error = %failure, "[PUBLISH][ERROR] Step failed, halting pipeline");
                    let compensation = self.compensate(&completed, &state).await;
                    return Err(PipelineFailure {
                        step: name.to_string(),
                        failure,
                        completed: completed
                            .iter()
                            .map(|i| self.steps[*i].name().to_string())
                            .collect(),
                        compensation,
                    });
                }
            }
        }

        info!(links = state.links.len(), "[PUBLISH] Publish pipeline complete");
        Ok(state)
    }

    async fn compensate(&self, completed: &[usize], state: &PublishState) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();
        if self.compensation == Compensation::None || completed.is_empty() {
            return failures;
        }
        for index in completed.iter().rev() {
            let step = &self.steps[*index];
            match step.undo(state).await {
                Ok(()) => info!(step = step.name(), "[PUBLISH][UNDO] Step reverted"),
                Err(failure) => {
                    warn!(step = step.name(), error = %failure, "[PUBLISH][UNDO] Revert failed, continuing");
                    failures.push(CompensationFailure {
                        step: step.name().to_string(),
                        failure,
                    });
                }
            }
        }
        failures
    }
}
