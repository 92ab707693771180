use std::{
    io::Cursor,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use arboard::Clipboard;
use image::{ImageFormat, RgbaImage};
use pasteroute_core::{ClipboardEntry, PastePayload, file_extension, mime_for_extension};
use thiserror::Error;
use tracing::debug;

pub const MIME_IMAGE_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum ClipboardSourceError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(#[from] arboard::Error),
    #[error("clipboard image has inconsistent size {width}x{height}")]
    InvalidImage { width: usize, height: usize },
    #[error("png encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("{} is not a regular file", .0.display())]
    NotAFile(std::path::PathBuf),
    #[error("failed to stat {}: {source}", .path.display())]
    Stat {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the system clipboard into a paste payload. An image wins over text,
/// and is handed on as an unnamed PNG blob the way a screenshot paste arrives.
pub fn snapshot_clipboard() -> Result<PastePayload, ClipboardSourceError> {
    let mut clipboard = Clipboard::new()?;

    match clipboard.get_image() {
        Ok(image) => {
            let png = encode_png(image.width, image.height, &image.bytes)?;
            debug!(
                width = image.width,
                height = image.height,
                bytes = png.len(),
                "clipboard image"
            );
            return Ok(PastePayload::files(vec![ClipboardEntry::blob(
                None,
                MIME_IMAGE_PNG,
                png,
            )]));
        }
        Err(arboard::Error::ContentNotAvailable) => {}
        Err(err) => return Err(err.into()),
    }

    match clipboard.get_text() {
        Ok(text) => Ok(PastePayload::text(text)),
        Err(arboard::Error::ContentNotAvailable) => Ok(PastePayload::default()),
        Err(err) => Err(err.into()),
    }
}

pub fn encode_png(
    width: usize,
    height: usize,
    rgba: &[u8],
) -> Result<Vec<u8>, ClipboardSourceError> {
    let invalid = || ClipboardSourceError::InvalidImage { width, height };
    let w = u32::try_from(width).map_err(|_| invalid())?;
    let h = u32::try_from(height).map_err(|_| invalid())?;
    let image = RgbaImage::from_raw(w, h, rgba.to_vec()).ok_or_else(invalid)?;

    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

/// Describes an existing file the way a file-manager drag hands it over.
pub async fn entry_for_path(path: &Path) -> Result<ClipboardEntry, ClipboardSourceError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| ClipboardSourceError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
    if !meta.is_file() {
        return Err(ClipboardSourceError::NotAFile(path.to_path_buf()));
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mime = mime_for_extension(&file_extension(&name));
    let modified_ms = meta
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .or_else(|| SystemTime::now().duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0);

    Ok(ClipboardEntry::on_disk(&name, path, mime, meta.len(), modified_ms))
}
