use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cancel::CancellationFlag;
use crate::contract::StorageProvider;
use crate::outcome::{Failure, FailureContext, Outcome};
use crate::retry::{FolderTarget, RetryPolicy};
use crate::state::{LinkKind, PublishState};
use crate::step::Step;

/// Which generated file an upload step publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Zip,
    Pdf,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Artifact::Zip => "zip",
            Artifact::Pdf => "pdf",
        })
    }
}

/// Uploads one artifact to one storage provider and records its link.
///
/// The file goes into a folder named after the release title, created on
/// demand under the configured parent. Folder creation and upload both fall
/// back to the fallback parent once, and each is retried per `retry`.
pub struct UploadStep {
    name: String,
    provider: Arc<dyn StorageProvider>,
    artifact: Artifact,
    link: LinkKind,
    reader_link: Option<LinkKind>,
    folder: FolderTarget,
    retry: RetryPolicy,
}

impl UploadStep {
    pub fn new(provider: Arc<dyn StorageProvider>, artifact: Artifact, link: LinkKind) -> Self {
        let name = format!("upload-{}-{}", provider.provider_name(), artifact);
        Self {
            name,
            provider,
            artifact,
            link,
            reader_link: None,
            folder: FolderTarget::root(),
            retry: RetryPolicy::none(),
        }
    }

    /// Also record the provider's preview link under `kind`.
    pub fn with_reader_link(mut self, kind: LinkKind) -> Self {
        self.reader_link = Some(kind);
        self
    }

    pub fn with_folder(mut self, folder: FolderTarget) -> Self {
        self.folder = folder;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Step for UploadStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Outcome<()> {
        match self.reader_link {
            Some(reader) if reader == self.link => Err(Failure::configuration(format!(
                "Reader link and download link must differ, both are {reader}"
            ))),
            _ => Ok(()),
        }
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        let file = match self.artifact {
            Artifact::Zip => state.internal.require_zip()?,
            Artifact::Pdf => state.internal.require_pdf()?,
        }
        .to_path_buf();

        let provider: &dyn StorageProvider = self.provider.as_ref();
        let provider_name = provider.provider_name();
        let folder_name = state.info.display_title.as_str();
        let folder_target = &self.folder;

        info!(
            provider = %provider_name,
            artifact = %self.artifact,
            folder = folder_name,
            "[PUBLISH][UPLOAD] Preparing folder"
        );
        let folder_context = format!("{provider_name}: unable to create folder '{folder_name}'");
        let folder_context = folder_context.as_str();
        let folder = self
            .retry
            .run("create_or_get_folder", cancel, move |_| async move {
                folder_target
                    .attempt("create_or_get_folder", move |parent| {
                        provider.create_or_get_folder(folder_name, parent)
                    })
                    .await
                    .or_external(folder_context)
            })
            .await?;

        let upload_target =
            FolderTarget::under(folder.id.clone()).with_fallback(self.folder.fallback_parent_id.clone());
        let upload_target = &upload_target;
        let file_ref = file.as_path();
        let upload_context = format!("{provider_name}: unable to upload {}", file.display());
        let upload_context = upload_context.as_str();
        let uploaded = self
            .retry
            .run("upload_file", cancel, move |_| async move {
                upload_target
                    .attempt("upload_file", move |parent| provider.upload_file(file_ref, parent))
                    .await
                    .or_external(upload_context)
            })
            .await?;

        info!(
            provider = %provider_name,
            artifact = %self.artifact,
            url = %uploaded.download_url,
            "[PUBLISH][UPLOAD] Upload succeeded"
        );
        state.links.set(self.link, uploaded.download_url)?;

        if let Some(reader) = self.reader_link {
            match uploaded.preview_url {
                Some(preview) => state.links.set(reader, preview)?,
                None => warn!(
                    provider = %provider_name,
                    link = %reader,
                    "[PUBLISH][UPLOAD] Provider returned no preview link"
                ),
            }
        }
        Ok(())
    }
}
