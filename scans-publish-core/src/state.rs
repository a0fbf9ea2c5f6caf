//! Publish state: the mutable context threaded through every step of one run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::outcome::{Failure, Outcome};

/// Release metadata. Set once when the run starts and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub display_title: String,
    pub chapter_number: String,
    #[serde(default)]
    pub chapter_name: Option<String>,
    #[serde(default)]
    pub chapter_volume: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ReleaseInfo {
    pub fn new(display_title: impl Into<String>, chapter_number: impl Into<String>) -> Self {
        Self {
            display_title: display_title.into(),
            chapter_number: chapter_number.into(),
            chapter_name: None,
            chapter_volume: None,
            message: None,
        }
    }
}

/// One key per provider artifact. Each step owns the keys it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    MegaZip,
    MegaPdf,
    BoxZip,
    BoxPdf,
    BoxPdfReader,
    DriveZip,
    DrivePdf,
    MangaDex,
    BlogPost,
}

impl LinkKind {
    pub const ALL: [LinkKind; 9] = [
        LinkKind::MegaZip,
        LinkKind::MegaPdf,
        LinkKind::BoxZip,
        LinkKind::BoxPdf,
        LinkKind::BoxPdfReader,
        LinkKind::DriveZip,
        LinkKind::DrivePdf,
        LinkKind::MangaDex,
        LinkKind::BlogPost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::MegaZip => "mega_zip",
            LinkKind::MegaPdf => "mega_pdf",
            LinkKind::BoxZip => "box_zip",
            LinkKind::BoxPdf => "box_pdf",
            LinkKind::BoxPdfReader => "box_pdf_reader",
            LinkKind::DriveZip => "drive_zip",
            LinkKind::DrivePdf => "drive_pdf",
            LinkKind::MangaDex => "manga_dex",
            LinkKind::BlogPost => "blog_post",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Links produced during a run. A link, once set, is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Links {
    entries: BTreeMap<LinkKind, String>,
}

impl Links {
    pub fn get(&self, kind: LinkKind) -> Option<&str> {
        self.entries.get(&kind).map(String::as_str)
    }

    /// Records `url` under `kind`. Fails if another step already produced that link.
    pub fn set(&mut self, kind: LinkKind, url: impl Into<String>) -> Outcome<()> {
        if self.entries.contains_key(&kind) {
            return Err(Failure::precondition(format!(
                "Link {kind} was already produced earlier in this run"
            )));
        }
        self.entries.insert(kind, url.into());
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkKind, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Working artifacts handed from one step to the next. Never shown to end users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InternalData {
    /// Directory holding the chapter pages.
    pub working_dir: Option<PathBuf>,
    pub cover_file_path: Option<PathBuf>,
    pub zip_file_path: Option<PathBuf>,
    pub pdf_file_path: Option<PathBuf>,
    /// Rendered announcement, kept for the chat layer.
    #[serde(skip)]
    pub announcement_html: Option<String>,
}

fn require_path<'a>(value: &'a Option<PathBuf>, what: &str) -> Outcome<&'a Path> {
    value
        .as_deref()
        .ok_or_else(|| Failure::precondition(format!("{what} was not set by an earlier step")))
}

impl InternalData {
    pub fn require_working_dir(&self) -> Outcome<&Path> {
        require_path(&self.working_dir, "Working directory")
    }

    pub fn require_cover(&self) -> Outcome<&Path> {
        require_path(&self.cover_file_path, "Cover image")
    }

    pub fn require_zip(&self) -> Outcome<&Path> {
        require_path(&self.zip_file_path, "Zip file")
    }

    pub fn require_pdf(&self) -> Outcome<&Path> {
        require_path(&self.pdf_file_path, "Pdf file")
    }
}

/// Shared context for one pipeline run. Owned by exactly one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishState {
    pub info: ReleaseInfo,
    pub links: Links,
    pub internal: InternalData,
}

impl PublishState {
    pub fn new(info: ReleaseInfo) -> Self {
        Self {
            info,
            links: Links::default(),
            internal: InternalData::default(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.internal.working_dir = Some(dir.into());
        self
    }

    pub fn with_pdf(mut self, path: impl Into<PathBuf>) -> Self {
        self.internal.pdf_file_path = Some(path.into());
        self
    }
}
