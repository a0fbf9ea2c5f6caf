use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cancel::CancellationFlag;
use crate::outcome::{FailureContext, Outcome};
use crate::slug::path_component;
use crate::state::PublishState;
use crate::step::Step;

type ArchiveError = Box<dyn std::error::Error + Send + Sync>;

/// Zips the pages of the working directory into `<output_dir>/<title> - <chapter>.zip`.
#[derive(Debug, Clone)]
pub struct CompressStep {
    output_dir: PathBuf,
}

impl CompressStep {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path of the archive for a release.
    pub fn archive_path(&self, state: &PublishState) -> PathBuf {
        let stem = format!(
            "{} - {}",
            path_component(&state.info.display_title),
            path_component(&state.info.chapter_number)
        );
        self.output_dir.join(format!("{stem}.zip"))
    }
}

/// Writes every regular file directly inside `dir` into a new archive at `target`, sorted by name.
fn zip_directory(dir: &Path, target: &Path) -> Result<usize, ArchiveError> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    pages.sort();

    let mut writer = ZipWriter::new(File::create(target)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for page in &pages {
        let name = page
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("Page file name is not valid UTF-8: {}", page.display()))?;
        writer.start_file(name, options)?;
        io::copy(&mut File::open(page)?, &mut writer)?;
        debug!(page = name, "Added page to archive");
    }
    writer.finish()?;
    Ok(pages.len())
}

#[async_trait]
impl Step for CompressStep {
    fn name(&self) -> &str {
        "compress"
    }

    async fn execute(&self, state: &mut PublishState, cancel: &CancellationFlag) -> Outcome<()> {
        let dir = state.internal.require_working_dir()?.to_path_buf();
        cancel.check(self.name())?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .or_external(&format!("Unable to create {}", self.output_dir.display()))?;

        let target = self.archive_path(state);
        let archive = target.clone();
        let pages = tokio::task::spawn_blocking(move || zip_directory(&dir, &archive))
            .await
            .or_external("Compression task failed")?
            .or_external("Unable to create zip file")?;

        info!(archive = %target.display(), pages, "Compressed chapter pages");
        state.internal.zip_file_path = Some(target);
        Ok(())
    }

    async fn undo(&self, state: &PublishState) -> Outcome<()> {
        let Some(archive) = &state.internal.zip_file_path else {
            return Ok(());
        };
        match tokio::fs::remove_file(archive).await {
            Ok(()) => {
                info!(archive = %archive.display(), "Removed zip file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(archive = %archive.display(), "Zip file already gone");
                Ok(())
            }
            Err(e) => Err(e).or_external(&format!("Unable to remove {}", archive.display())),
        }
    }
}
