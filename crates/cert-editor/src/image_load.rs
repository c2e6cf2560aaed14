//! External image loading.
//!
//! Decoding happens on the blocking pool; the result is plain data that the
//! session inserts in one step.

use cert_core::model::ImageData;
use cert_render::data_url;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("unsupported image format {0:?} (PNG and JPEG only)")]
    UnsupportedFormat(ImageFormat),

    #[error("image decoding task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Decode `bytes`, record the intrinsic size and embed the original bytes as
/// a data URL.
pub async fn load_image(bytes: Vec<u8>) -> Result<ImageData, ImageLoadError> {
    tokio::task::spawn_blocking(move || decode(&bytes)).await?
}

fn decode(bytes: &[u8]) -> Result<ImageData, ImageLoadError> {
    let format = image::guess_format(bytes)?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(ImageLoadError::UnsupportedFormat(format));
    }
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    log::debug!(
        "loaded {:?} image {}x{} ({} bytes)",
        format,
        decoded.width(),
        decoded.height(),
        bytes.len()
    );
    Ok(ImageData {
        src: data_url::encode(format.to_mime_type(), bytes),
        natural_width: decoded.width(),
        natural_height: decoded.height(),
    })
}
