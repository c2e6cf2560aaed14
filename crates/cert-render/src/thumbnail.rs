//! Scaled raster snapshots of a document.
//!
//! Rendering only reads the document; the editor calls this for the preview
//! image stored with every saved template.

use crate::data_url;
use crate::paint::paint_document;
use cert_core::model::Document;
use thiserror::Error;
use tiny_skia::{Pixmap, Transform};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("thumbnail scale must be positive and finite (got {0})")]
    InvalidScale(f64),

    #[error("cannot allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Png(String),
}

/// Rasterize `doc` at `scale` (1.0 = canvas pixels).
pub fn render(doc: &Document, scale: f64) -> Result<Pixmap, RenderError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(RenderError::InvalidScale(scale));
    }
    let width = ((doc.canvas_width() as f64 * scale).round() as u32).max(1);
    let height = ((doc.canvas_height() as f64 * scale).round() as u32).max(1);
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Allocation { width, height })?;

    paint_document(&mut pixmap, doc, Transform::from_scale(scale as f32, scale as f32));
    log::debug!(
        "rendered {}x{} thumbnail of {} elements",
        width,
        height,
        doc.len()
    );
    Ok(pixmap)
}

/// Rasterize and encode as PNG.
pub fn render_thumbnail(doc: &Document, scale: f64) -> Result<Vec<u8>, RenderError> {
    render(doc, scale)?
        .encode_png()
        .map_err(|e| RenderError::Png(e.to_string()))
}

/// The thumbnail as a `data:image/png;base64,…` URL.
pub fn preview_data_url(doc: &Document, scale: f64) -> Result<String, RenderError> {
    Ok(data_url::encode("image/png", &render_thumbnail(doc, scale)?))
}
