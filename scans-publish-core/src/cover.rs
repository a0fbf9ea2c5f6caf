//! Cover thumbnail for the announcement: the selected page image, resized to
//! fit the cover box and embedded as a base64 PNG.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::imageops::FilterType;
use image::ImageFormat;
use tracing::debug;

use crate::outcome::{Failure, FailureContext, Outcome};

/// Bounding box of the cover embedded in the announcement.
pub const COVER_WIDTH: u32 = 200;
pub const COVER_HEIGHT: u32 = 300;

/// Decodes the image at `path`, fits it into `width`×`height` and returns it as base64 PNG.
pub fn encode_cover(path: &Path, width: u32, height: u32) -> Outcome<String> {
    if !path.is_file() {
        return Err(Failure::precondition(format!(
            "Cover image not found at {}",
            path.display()
        )));
    }
    let img = image::open(path).or_precondition("Unable to decode cover image")?;
    let resized = img.resize(width, height, FilterType::Lanczos3);

    let mut png = Cursor::new(Vec::new());
    resized
        .write_to(&mut png, ImageFormat::Png)
        .or_external("Unable to encode cover image")?;
    let png = png.into_inner();
    debug!(
        width = resized.width(),
        height = resized.height(),
        bytes = png.len(),
        "Encoded cover image"
    );
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

/// [`encode_cover`] on the blocking thread pool.
pub async fn encode_cover_blocking(path: PathBuf, width: u32, height: u32) -> Outcome<String> {
    tokio::task::spawn_blocking(move || encode_cover(&path, width, height))
        .await
        .or_external("Cover encoding task failed")?
}
