//! # template: release announcement rendering
//!
//! The announcement is an HTML template with `##FIELD##` tokens. Every
//! [`TemplateField`] has a value token and a generated companion
//! `##EXISTS_FIELD##` token, which renders a hide directive when the field has
//! nothing to show (blank, or the `#` placeholder of a missing link). This lets
//! the template drop the buttons of providers that produced no link.
//!
//! Rendering is a single left-to-right pass: known tokens are replaced, unknown
//! `##…##` sequences are copied through untouched, and substituted values are
//! never scanned again. The same state always renders to the same bytes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::cover::{encode_cover_blocking, COVER_HEIGHT, COVER_WIDTH};
use crate::outcome::{Failure, Outcome};
use crate::state::{LinkKind, PublishState};

/// Name of the template file inside the configuration directory.
pub const TEMPLATE_FILE_NAME: &str = "blogger-template.html";

/// Value used for links that were not produced.
pub const MISSING_LINK: &str = "#";

/// Directive rendered by `##EXISTS_…##` tokens of empty fields.
pub const HIDDEN_DIRECTIVE: &str = r#"style="display: none !important;""#;

/// A value the template can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateField {
    ReleaseTitle,
    ChapterTitle,
    ChapterNumber,
    VolumeNumber,
    Message,
    Link(LinkKind),
    CoverImage,
}

impl TemplateField {
    /// Every field the renderer fills, in substitution-table order.
    pub const ALL: [TemplateField; 14] = [
        TemplateField::ReleaseTitle,
        TemplateField::ChapterTitle,
        TemplateField::ChapterNumber,
        TemplateField::VolumeNumber,
        TemplateField::Message,
        TemplateField::Link(LinkKind::MegaZip),
        TemplateField::Link(LinkKind::MegaPdf),
        TemplateField::Link(LinkKind::BoxZip),
        TemplateField::Link(LinkKind::BoxPdf),
        TemplateField::Link(LinkKind::DriveZip),
        TemplateField::Link(LinkKind::DrivePdf),
        TemplateField::Link(LinkKind::MangaDex),
        TemplateField::Link(LinkKind::BoxPdfReader),
        TemplateField::CoverImage,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TemplateField::ReleaseTitle => "RELEASE_TITLE",
            TemplateField::ChapterTitle => "CHAPTER_TITLE",
            TemplateField::ChapterNumber => "CHAPTER_NUMBER",
            TemplateField::VolumeNumber => "VOLUME_NUMBER",
            TemplateField::Message => "MESSAGE",
            TemplateField::Link(kind) => match kind {
                LinkKind::MegaZip => "MEGA_ZIP_LINK",
                LinkKind::MegaPdf => "MEGA_PDF_LINK",
                LinkKind::BoxZip => "BOX_ZIP_LINK",
                LinkKind::BoxPdf => "BOX_PDF_LINK",
                LinkKind::BoxPdfReader => "BOX_PDF_READER",
                LinkKind::DriveZip => "GOOGLE_DRIVE_ZIP_LINK",
                LinkKind::DrivePdf => "GOOGLE_DRIVE_PDF_LINK",
                LinkKind::MangaDex => "MANGADEX_LINK",
                LinkKind::BlogPost => "BLOG_POST_LINK",
            },
            TemplateField::CoverImage => "COVER_IMAGE",
        }
    }

    pub fn token(&self) -> String {
        format!("##{}##", self.key())
    }

    pub fn exists_token(&self) -> String {
        format!("##EXISTS_{}##", self.key())
    }
}

/// Substituted value of one field and whether its section should be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub value: String,
    pub visible: bool,
}

impl FieldValue {
    fn new(value: String) -> Self {
        let visible = !(value.trim().is_empty() || value == MISSING_LINK);
        Self { value, visible }
    }

    /// What the `##EXISTS_…##` token renders to.
    pub fn directive(&self) -> &'static str {
        if self.visible {
            ""
        } else {
            HIDDEN_DIRECTIVE
        }
    }
}

/// The value of every [`TemplateField`] for one publish state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitutions {
    values: Vec<(TemplateField, FieldValue)>,
}

impl Substitutions {
    /// Builds the table from `state`; `cover_base64` is the encoded cover PNG.
    pub fn from_state(state: &PublishState, cover_base64: &str) -> Self {
        let values = TemplateField::ALL
            .iter()
            .map(|field| (*field, FieldValue::new(field_value(*field, state, cover_base64))))
            .collect();
        Self { values }
    }

    pub fn get(&self, field: TemplateField) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
    }

    fn token_table(&self) -> HashMap<String, &str> {
        let mut table = HashMap::with_capacity(self.values.len() * 2);
        for (field, value) in &self.values {
            table.insert(field.token(), value.value.as_str());
            table.insert(field.exists_token(), value.directive());
        }
        table
    }
}

fn field_value(field: TemplateField, state: &PublishState, cover_base64: &str) -> String {
    let info = &state.info;
    match field {
        TemplateField::ReleaseTitle => info.display_title.clone(),
        TemplateField::ChapterTitle => info
            .chapter_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chapter {}", info.chapter_number)),
        TemplateField::ChapterNumber => info.chapter_number.clone(),
        TemplateField::VolumeNumber => info
            .chapter_volume
            .as_deref()
            .filter(|volume| !volume.trim().is_empty())
            .unwrap_or("?")
            .to_string(),
        TemplateField::Message => info
            .message
            .as_deref()
            .map(|m| m.replace("\r\n", "\n").replace('\n', "<br>"))
            .unwrap_or_default(),
        TemplateField::Link(LinkKind::BoxPdfReader) => state
            .links
            .get(LinkKind::BoxPdfReader)
            .unwrap_or_default()
            .to_string(),
        TemplateField::Link(kind) => state.links.get(kind).unwrap_or(MISSING_LINK).to_string(),
        TemplateField::CoverImage => format!("data:image/png;base64,{cover_base64}"),
    }
}

/// Replaces every known token of `template` in one pass.
pub fn render_template(template: &str, substitutions: &Substitutions) -> String {
    let table = substitutions.token_table();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("##") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(close) = after_open.find("##") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let token_end = start + 2 + close + 2;
        match table.get(&rest[start..token_end]) {
            Some(value) => {
                out.push_str(value);
                rest = &rest[token_end..];
            }
            None => {
                // Not one of ours: a token may still start at the next `#`.
                out.push('#');
                rest = &rest[start + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Loads the announcement template and renders it for a publish state.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    config_dir: PathBuf,
    cover_size: (u32, u32),
}

impl TemplateRenderer {
    /// Template read from `config_dir/blogger-template.html`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            cover_size: (COVER_WIDTH, COVER_HEIGHT),
        }
    }

    /// Template read from `base_dir/config/blogger-template.html`.
    pub fn from_base_dir(base_dir: &Path) -> Self {
        Self::new(base_dir.join("config"))
    }

    /// Template read from the `config` directory next to the running executable.
    pub fn from_executable_dir() -> Outcome<Self> {
        let exe = std::env::current_exe().map_err(|e| {
            Failure::configuration(format!("Unable to locate the application directory: {e}"))
        })?;
        let base = exe.parent().ok_or_else(|| {
            Failure::configuration("Unable to locate the application directory")
        })?;
        Ok(Self::from_base_dir(base))
    }

    pub fn with_cover_size(mut self, width: u32, height: u32) -> Self {
        self.cover_size = (width, height);
        self
    }

    pub fn template_path(&self) -> PathBuf {
        self.config_dir.join(TEMPLATE_FILE_NAME)
    }

    pub async fn load_template(&self) -> Outcome<String> {
        let path = self.template_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(template) => {
                debug!(path = %path.display(), bytes = template.len(), "Loaded release template");
                Ok(template)
            }
            Err(e) => {
                error!(error = ?e, path = %path.display(), "Failed to read release template");
                Err(Failure::configuration(format!(
                    "Unable to read blogger release template file: {TEMPLATE_FILE_NAME}"
                )))
            }
        }
    }

    /// Loads the template, encodes the cover recorded in `state` and renders.
    pub async fn render(&self, state: &PublishState) -> Outcome<String> {
        let template = self.load_template().await?;
        let cover_path = state.internal.require_cover()?.to_path_buf();
        let (width, height) = self.cover_size;
        let cover = encode_cover_blocking(cover_path, width, height).await?;
        let html = render_template(&template, &Substitutions::from_state(state, &cover));
        info!(bytes = html.len(), "Rendered release announcement");
        Ok(html)
    }
}
