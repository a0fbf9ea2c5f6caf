use async_trait::async_trait;
use tracing::{debug, info};

use crate::cancel::CancellationFlag;
use crate::outcome::{Failure, FailureContext, Outcome};
use crate::state::PublishState;
use crate::step::Step;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Records the first page image of the working directory as the release cover.
///
/// A cover set before the run starts is kept as is.
#[derive(Debug, Clone, Default)]
pub struct SelectCoverStep;

impl SelectCoverStep {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Step for SelectCoverStep {
    fn name(&self) -> &str {
        "select-cover"
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        if let Some(cover) = &state.internal.cover_file_path {
            info!(cover = %cover.display(), "Cover already chosen, keeping it");
            return Ok(());
        }
        cancel.check(self.name())?;

        let dir = state.internal.require_working_dir()?.to_path_buf();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .or_external(&format!("Unable to list {}", dir.display()))?;

        let mut images = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .or_external(&format!("Unable to list {}", dir.display()))?
        {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                images.push(path);
            }
        }
        images.sort();
        debug!(candidates = images.len(), "Collected cover candidates");

        let cover = images.into_iter().next().ok_or_else(|| {
            Failure::precondition(format!("No cover image found in {}", dir.display()))
        })?;
        info!(cover = %cover.display(), "Selected cover image");
        state.internal.cover_file_path = Some(cover);
        Ok(())
    }
}
