use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::cancel::CancellationFlag;
use crate::contract::{CatalogService, ChapterSubmission};
use crate::outcome::{FailureContext, Outcome};
use crate::retry::RetryPolicy;
use crate::state::{LinkKind, PublishState};
use crate::step::Step;

/// Submits the chapter pages to the catalog and records the public chapter link.
pub struct CatalogStep {
    catalog: Arc<dyn CatalogService>,
    retry: RetryPolicy,
}

impl CatalogStep {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self {
            catalog,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Step for CatalogStep {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        let submission = ChapterSubmission {
            title: state.info.display_title.clone(),
            chapter_number: state.info.chapter_number.clone(),
            chapter_name: state.info.chapter_name.clone(),
            volume: state.info.chapter_volume.clone(),
            pages_dir: state.internal.require_working_dir()?.to_path_buf(),
        };

        info!(
            title = %submission.title,
            chapter = %submission.chapter_number,
            "[PUBLISH][CATALOG] Submitting chapter"
        );
        let catalog: &dyn CatalogService = self.catalog.as_ref();
        let link = self
            .retry
            .run("submit_chapter", cancel, move |_| {
                let chapter = submission.clone();
                async move {
                    catalog
                        .submit_chapter(chapter)
                        .await
                        .or_external("Catalog: chapter submission failed")
                }
            })
            .await?;

        info!(url = %link, "[PUBLISH][CATALOG] Chapter submitted");
        state.links.set(LinkKind::MangaDex, link)
    }
}
