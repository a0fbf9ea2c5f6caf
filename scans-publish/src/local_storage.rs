//! Directory-backed [`StorageProvider`]: publishes files by copying them into a
//! directory tree that is served under a public base URL.
//!
//! Folder ids are paths relative to the storage root, `None` being the root
//! itself. A parent id that does not exist is an error, so the fallback parent
//! of a [`scans_publish_core::retry::FolderTarget`] behaves as with a cloud provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Url;
use scans_publish_core::contract::{FolderHandle, ProviderError, StorageProvider, UploadedFile};
use scans_publish_core::slug::path_component;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    name: String,
    root: PathBuf,
    base_url: Url,
}

impl DirectoryStorage {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        base_url: &str,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| format!("Invalid storage base url '{base_url}': {e}"))?;
        if base_url.cannot_be_a_base() {
            return Err(format!("Storage base url '{base_url}' cannot hold paths").into());
        }
        Ok(Self {
            name: name.into(),
            root: root.into(),
            base_url,
        })
    }

    fn resolve(&self, folder_id: Option<&str>) -> PathBuf {
        match folder_id {
            Some(id) if !id.is_empty() => self.root.join(id),
            _ => self.root.clone(),
        }
    }

    /// Public link of `relative`, every segment percent-encoded.
    fn public_url(&self, relative: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| "Storage base url cannot hold paths")?
            .pop_if_empty()
            .extend(relative);
        Ok(url)
    }
}

/// Folder name as stored on disk: separators become `_`, so `"Fate/Zero"`
/// is one folder `Fate_Zero`.
fn folder_segment(name: &str) -> Result<String, ProviderError> {
    let segment = path_component(name);
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(format!("Invalid folder name '{name}'").into());
    }
    Ok(segment)
}

fn segments(folder_id: &str) -> Vec<&str> {
    folder_id.split('/').filter(|s| !s.is_empty()).collect()
}

#[async_trait]
impl StorageProvider for DirectoryStorage {
    fn provider_name(&self) -> String {
        self.name.clone()
    }

    async fn create_or_get_folder(
        &self,
        name: &str,
        parent_id: Option<String>,
    ) -> Result<FolderHandle, ProviderError> {
        let name = folder_segment(name)?;
        let parent = self.resolve(parent_id.as_deref());
        if parent_id.is_some() && !tokio::fs::try_exists(&parent).await? {
            return Err(format!("Parent folder '{}' does not exist", parent.display()).into());
        }

        let folder = parent.join(&name);
        tokio::fs::create_dir_all(&folder).await?;
        let id = match parent_id.as_deref().filter(|p| !p.is_empty()) {
            Some(parent) => format!("{parent}/{name}"),
            None => name.clone(),
        };
        debug!(provider = %self.name, folder = %folder.display(), "Folder ready");
        Ok(FolderHandle { id, name })
    }

    async fn upload_file(
        &self,
        path: &Path,
        parent_id: Option<String>,
    ) -> Result<UploadedFile, ProviderError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("Cannot upload {}: no file name", path.display()))?;
        let folder = self.resolve(parent_id.as_deref());
        if !tokio::fs::try_exists(&folder).await? {
            return Err(format!("Folder '{}' does not exist", folder.display()).into());
        }

        let target = folder.join(file_name);
        let bytes = tokio::fs::copy(path, &target).await?;

        let mut relative = parent_id.as_deref().map(segments).unwrap_or_default();
        relative.push(file_name);
        let url = self.public_url(&relative)?.to_string();
        info!(provider = %self.name, bytes, url = %url, "File published");

        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        Ok(UploadedFile {
            preview_url: is_pdf.then(|| url.clone()),
            download_url: url,
        })
    }
}
