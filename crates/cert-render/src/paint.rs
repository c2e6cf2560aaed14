//! Document → tiny-skia drawing commands.
//!
//! Walks the element list back to front and rasterizes fills, strokes,
//! embedded images and text. Ephemeral elements are never painted.

use crate::data_url;
use cert_core::geometry::shape_outline;
use cert_core::model::{Document, Element, ElementKind, ImageData, ShapeData, TextAlign, TextData};
use kurbo::{Affine, BezPath, PathEl, Rect};
use tiny_skia::{
    Color, ColorU8, FillRule, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Paint the document into `pixmap`. `base` maps canvas pixels to pixmap
/// pixels (e.g. a thumbnail scale).
pub fn paint_document(pixmap: &mut Pixmap, doc: &Document, base: Transform) {
    let background = solid(doc.background(), 1.0);
    fill_rect(
        pixmap,
        0.0,
        0.0,
        doc.canvas_width() as f64,
        doc.canvas_height() as f64,
        &background,
        base,
    );
    for element in doc.elements().iter().filter(|e| !e.ephemeral) {
        paint_element(pixmap, element, base, 1.0);
    }
}

fn paint_element(pixmap: &mut Pixmap, element: &Element, parent: Transform, alpha: f64) {
    let transform = parent.pre_concat(to_skia_transform(element.transform()));
    let alpha = alpha * element.opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    match &element.kind {
        ElementKind::Shape(shape) => paint_shape(pixmap, element.rect(), shape, transform, alpha),
        ElementKind::Text(text) => {
            log::trace!(
                "TEXT {} {:?} at ({}, {})",
                element.id,
                text.content,
                element.x,
                element.y
            );
            paint_text(pixmap, element.rect(), text, transform, alpha);
        }
        ElementKind::Image(image) => paint_image(pixmap, element.rect(), image, transform, alpha),
        ElementKind::Group(group) => {
            let inner = transform.pre_concat(to_skia_transform(element.child_transform()));
            for child in group.children.iter().filter(|c| !c.ephemeral) {
                paint_element(pixmap, child, inner, alpha);
            }
        }
    }
}

// ─── Shape painters ──────────────────────────────────────────────────────

fn paint_shape(pixmap: &mut Pixmap, rect: Rect, shape: &ShapeData, transform: Transform, alpha: f64) {
    let Some(path) = to_skia_path(&shape_outline(&shape.shape, rect, shape.corner_radius)) else {
        return;
    };
    if let Some(fill) = shape.fill {
        pixmap.fill_path(&path, &solid(fill, alpha), FillRule::Winding, transform, None);
    }
    if let Some(stroke) = shape.stroke
        && shape.stroke_width > 0.0
    {
        let style = Stroke {
            width: shape.stroke_width as f32,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &solid(stroke, alpha), &style, transform, None);
    }
}

/// Text is drawn as one bar per line, sized from the font metrics. Thumbnails
/// are too small for glyphs to matter and this avoids a font dependency.
fn paint_text(pixmap: &mut Pixmap, rect: Rect, text: &TextData, transform: Transform, alpha: f64) {
    let style = &text.style;
    let line_height = style.font_size * 1.2;
    let bar_height = style.font_size * if style.font_weight >= 600 { 0.6 } else { 0.45 };
    let paint = solid(style.color, alpha * 0.85);

    for (i, line) in text.content.lines().enumerate() {
        let chars = line.chars().count();
        if chars == 0 {
            continue;
        }
        let width = (chars as f64 * style.font_size * 0.52).min(rect.width().max(0.0));
        let x = match style.align {
            TextAlign::Left => rect.x0,
            TextAlign::Center => rect.x0 + (rect.width() - width) / 2.0,
            TextAlign::Right => rect.x1 - width,
        };
        let baseline = rect.y0 + line_height * (i as f64 + 1.0) - style.font_size * 0.25;
        fill_rect(pixmap, x, baseline - bar_height, width, bar_height, &paint, transform);
        if style.underline {
            let thickness = (style.font_size / 14.0).max(1.0);
            fill_rect(pixmap, x, baseline + thickness, width, thickness, &paint, transform);
        }
    }
}

fn paint_image(pixmap: &mut Pixmap, rect: Rect, image: &ImageData, transform: Transform, alpha: f64) {
    match decode_image(&image.src) {
        Some(bitmap) => {
            let sx = rect.width() / bitmap.width() as f64;
            let sy = rect.height() / bitmap.height() as f64;
            let placed = transform
                .pre_translate(rect.x0 as f32, rect.y0 as f32)
                .pre_scale(sx as f32, sy as f32);
            let paint = PixmapPaint {
                opacity: alpha as f32,
                quality: FilterQuality::Bilinear,
                ..Default::default()
            };
            pixmap.draw_pixmap(0, 0, bitmap.as_ref(), &paint, placed, None);
        }
        None => {
            // Remote or unreadable source: draw a framed stand-in.
            let frame = cert_core::Color::rgb(0xbb, 0xbb, 0xbb);
            let mut cross = BezPath::new();
            cross.move_to((rect.x0, rect.y0));
            cross.line_to((rect.x1, rect.y1));
            cross.move_to((rect.x1, rect.y0));
            cross.line_to((rect.x0, rect.y1));
            let stroke = Stroke::default();
            if let Some(path) = to_skia_path(&kurbo::Shape::to_path(&rect, 0.1)) {
                pixmap.stroke_path(&path, &solid(frame, alpha), &stroke, transform, None);
            }
            if let Some(path) = to_skia_path(&cross) {
                pixmap.stroke_path(&path, &solid(frame, alpha), &stroke, transform, None);
            }
        }
    }
}

/// Decode an embedded `data:` image into a premultiplied pixmap.
pub fn decode_image(src: &str) -> Option<Pixmap> {
    let (_, bytes) = data_url::decode(src)?;
    let rgba = match image::load_from_memory(&bytes) {
        Ok(img) => img.to_rgba8(),
        Err(err) => {
            log::warn!("cannot decode embedded image: {err}");
            return None;
        }
    };
    let size = IntSize::from_wh(rgba.width(), rgba.height())?;
    let mut bitmap = Pixmap::new(size.width(), size.height())?;
    for (dst, px) in bitmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = px.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(bitmap)
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn fill_rect(pixmap: &mut Pixmap, x: f64, y: f64, w: f64, h: f64, paint: &Paint<'_>, transform: Transform) {
    if let Some(r) = tiny_skia::Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
        pixmap.fill_path(&PathBuilder::from_rect(r), paint, FillRule::Winding, transform, None);
    }
}

fn solid(color: cert_core::Color, alpha: f64) -> Paint<'static> {
    let a = (color.a as f64 * alpha.clamp(0.0, 1.0)).round() as u8;
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(color.r, color.g, color.b, a));
    paint.anti_alias = true;
    paint
}

pub(crate) fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

pub(crate) fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}
