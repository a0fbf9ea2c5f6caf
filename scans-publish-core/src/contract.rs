#![allow(unused)]

//! # contract: interfaces of the external collaborators used by the steps
//!
//! This module defines one trait per kind of external service a publish run
//! talks to, plus the plain data types that cross those boundaries:
//!
//! - [`StorageProvider`]: cloud storage (Box, Mega, Google Drive, a local directory…)
//! - [`CatalogService`]: chapter catalog (MangaDex)
//! - [`BlogService`]: blog platform (Google Blogger)
//!
//! ## Interface & Extensibility
//! - Implement a trait to plug in a new vendor client. Steps only see the trait.
//! - All methods are async and return boxed errors. Steps convert those into
//!   [`crate::outcome::Failure`]s at their own boundary; implementors never
//!   need to know about the pipeline's failure type.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so tests can script vendor
//!   behaviour deterministically (see the `tests/` directory of this crate).

use std::path::Path;

use async_trait::async_trait;

use mockall::{automock, predicate::*};

/// Error type returned by collaborator implementations.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Folder returned by [`StorageProvider::create_or_get_folder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: String,
    pub name: String,
}

/// Result of a file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Public download link for the uploaded file.
    pub download_url: String,
    /// Optional in-browser reader link (e.g. Box preview for PDFs).
    pub preview_url: Option<String>,
}

/// Trait for cloud storage providers.
///
/// Implementors must be idempotent enough that calling `create_or_get_folder`
/// twice with the same name returns the same folder.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Short provider name for logs and failure messages (e.g. "box").
    fn provider_name(&self) -> String;

    /// Return the folder called `name` under `parent_id` (root when `None`), creating it if needed.
    async fn create_or_get_folder(
        &self,
        name: &str,
        parent_id: Option<String>,
    ) -> Result<FolderHandle, ProviderError>;

    /// Upload the file at `path` into `parent_id` (root when `None`) and share it publicly.
    async fn upload_file(
        &self,
        path: &Path,
        parent_id: Option<String>,
    ) -> Result<UploadedFile, ProviderError>;
}

/// Chapter metadata sent to the catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSubmission {
    pub title: String,
    pub chapter_number: String,
    pub chapter_name: Option<String>,
    pub volume: Option<String>,
    /// Directory holding the page images to upload.
    pub pages_dir: std::path::PathBuf,
}

/// Trait for the chapter catalog.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Submit a chapter and return its public link.
    async fn submit_chapter(&self, chapter: ChapterSubmission) -> Result<String, ProviderError>;
}

/// A blog post to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub html_body: String,
    pub label: String,
    pub url_slug: String,
}

/// The post as created by the blog platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostHandle {
    pub id: String,
    pub url: Option<String>,
}

/// Blog to post to, with the credential that authorises the post.
#[derive(Clone, PartialEq, Eq)]
pub struct BlogTarget {
    pub blog_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for BlogTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogTarget")
            .field("blog_id", &self.blog_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Trait for the blog platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlogService: Send + Sync {
    /// Create `post` on the blog described by `target`.
    async fn create_post(&self, target: &BlogTarget, post: NewPost) -> Result<PostHandle, ProviderError>;
}
