#![doc = "scans-publish-core: core publish pipeline for scans-publish."]

//! This crate contains the publish pipeline, its shared state and the
//! announcement generator. Vendor SDK clients (Box, Mega, Google Drive,
//! Blogger, MangaDex) are not part of it: they plug in through the traits in
//! [`contract`].
//!
//! # Usage
//! Build a [`pipeline::StepsService`] out of the steps in [`steps`], seed a
//! [`state::PublishState`] with the release metadata and call
//! [`pipeline::StepsService::run`].

pub mod cancel;
pub mod contract;
pub mod cover;
pub mod outcome;
pub mod pipeline;
pub mod retry;
pub mod slug;
pub mod state;
pub mod step;
pub mod steps;
pub mod template;

pub use cancel::CancellationFlag;
pub use outcome::{Failure, FailureKind, Outcome};
pub use pipeline::{Compensation, PipelineFailure, StepsService};
pub use state::{LinkKind, PublishState, ReleaseInfo};
pub use step::Step;
