//! # scans-publish CLI interface
//!
//! Command parsing and orchestration for the `scans-publish` binary. All
//! publishing logic (steps, state, announcement rendering) lives in
//! [`scans_publish_core`]; this module loads the config, wires the concrete
//! collaborators into steps and reports the outcome.
//!
//! - [`Cli`] / [`Commands`]: user-facing subcommands
//! - [`run`]: async entrypoint, also used by integration tests
//! - [`build_pipeline`] / [`initial_state`]: config → steps and seed state
use crate::blogger::BloggerClient;
use crate::load_config::{load_config, CliConfig};
use crate::local_storage::DirectoryStorage;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scans_publish_core::state::PublishState;
use scans_publish_core::steps::{BlogPostStep, CompressStep, SelectCoverStep, UploadStep};
use scans_publish_core::template::TemplateRenderer;
use scans_publish_core::{CancellationFlag, StepsService};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// CLI for scans-publish: publish a chapter release and announce it.
#[derive(Parser)]
#[clap(
    name = "scans-publish",
    version,
    about = "Publish a manga chapter release to storage providers and announce it on Blogger"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole publish pipeline for the release described in the config file
    Publish {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Select the cover and print the rendered announcement without contacting any service
    Render {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Publish state seeded with the release metadata and the input files of `config`.
pub fn initial_state(config: &CliConfig) -> PublishState {
    let state = PublishState::new(config.release.clone()).with_working_dir(&config.working_dir);
    match &config.pdf_file {
        Some(pdf) => state.with_pdf(pdf),
        None => state,
    }
}

fn renderer(config: &CliConfig) -> Result<TemplateRenderer> {
    match &config.template_dir {
        Some(dir) => Ok(TemplateRenderer::new(dir)),
        None => TemplateRenderer::from_executable_dir().map_err(anyhow::Error::new),
    }
}

/// Builds the publish pipeline: cover, archive, one upload per storage target, blog post.
pub fn build_pipeline(config: &CliConfig) -> Result<StepsService> {
    let mut builder = StepsService::builder()
        .compensation(config.compensation)
        .step(SelectCoverStep::new())
        .step(CompressStep::new(&config.output_dir));

    for target in &config.storage {
        let storage = DirectoryStorage::new(&target.provider, &target.root, &target.base_url)
            .map_err(|e| anyhow::anyhow!("Storage '{}': {e}", target.provider))?;
        let mut step = UploadStep::new(Arc::new(storage), target.artifact, target.link)
            .with_folder(target.folder.clone())
            .with_retry(config.retry);
        if let Some(reader) = target.reader_link {
            step = step.with_reader_link(reader);
        }
        builder = builder.step(step);
    }

    if config.blogger.enabled {
        let client = match &config.blogger.api_base {
            Some(api_base) => BloggerClient::with_api_base(api_base),
            None => BloggerClient::new(),
        };
        // Post creation is not idempotent: single attempt, whatever `retry` says.
        let mut step = BlogPostStep::new(
            config.blogger_settings.clone(),
            Arc::new(client),
            renderer(config)?,
        );
        if let Some(label) = &config.blogger.label {
            step = step.with_label(label);
        }
        builder = builder.step(step);
    }

    builder
        .build()
        .map_err(|failure| anyhow::anyhow!("Invalid publish configuration: {failure}"))
}

/// Async CLI entrypoint for integration tests and `main()`; never cancelled.
pub async fn run(cli: Cli) -> Result<()> {
    run_with_cancel(cli, CancellationFlag::new()).await
}

/// Like [`run`], stopping between steps once `cancel` is set.
pub async fn run_with_cancel(cli: Cli, cancel: CancellationFlag) -> Result<()> {
    match cli.command {
        Commands::Publish { config } => {
            let config = load_config(&config)?;
            tracing::info!(
                command = "publish",
                title = %config.release.display_title,
                chapter = %config.release.chapter_number,
                "Starting publish"
            );
            let pipeline = build_pipeline(&config)?;
            tracing::info!(steps = ?pipeline.step_names(), "Pipeline ready");

            match pipeline.run(initial_state(&config), &cancel).await {
                Ok(state) => {
                    let report: BTreeMap<String, &str> = state
                        .links
                        .iter()
                        .map(|(kind, url)| (kind.to_string(), url))
                        .collect();
                    let json = serde_json::to_string_pretty(&report)
                        .context("Failed to serialise links report")?;
                    println!("{json}");
                    tracing::info!(command = "publish", links = report.len(), "Publish complete");
                    Ok(())
                }
                Err(failure) => {
                    tracing::error!(
                        command = "publish",
                        step = %failure.step,
                        completed = ?failure.completed,
                        error = %failure.failure,
                        "Publish failed"
                    );
                    if !failure.completed.is_empty() {
                        eprintln!(
                            "Steps completed before the failure: {}",
                            failure.completed.join(", ")
                        );
                    }
                    for undo in &failure.compensation {
                        eprintln!("Could not undo '{}': {}", undo.step, undo.failure);
                    }
                    Err(anyhow::Error::new(failure))
                }
            }
        }
        Commands::Render { config } => {
            let config = load_config(&config)?;
            tracing::info!(command = "render", "Rendering announcement");
            let pipeline = StepsService::builder()
                .step(SelectCoverStep::new())
                .build()
                .map_err(anyhow::Error::new)?;
            let state = pipeline.run(initial_state(&config), &cancel).await?;
            let html = renderer(&config)?
                .render(&state)
                .await
                .context("Failed to render announcement")?;
            println!("{html}");
            Ok(())
        }
    }
}
