//! Integration tests: document → thumbnail pixels.

use cert_core::model::*;
use cert_core::archetype::QR_SIZE;
use cert_core::{archetype, starter_document};
use cert_render::{RenderError, data_url, preview_data_url, render, render_thumbnail};
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn blank(w: u32, h: u32) -> Document {
    Document::new(w, h).unwrap()
}

fn filled(shape: ShapeKind, color: Color) -> ShapeData {
    ShapeData::new(shape).filled(color).stroked(None, 0.0)
}

/// RGB at a pixmap pixel (the canvas is opaque, so premultiplied = straight).
fn rgb(pixmap: &tiny_skia::Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
    let p = pixmap.pixel(x, y).expect("pixel in bounds");
    (p.red(), p.green(), p.blue())
}

fn png_bytes(color: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba(color));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[test]
fn starter_thumbnail_is_png_and_document_untouched() {
    let doc = starter_document(Orientation::Landscape);
    let before = doc.clone();
    let lineage = doc.lineage();

    let png = render_thumbnail(&doc, 0.25).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    assert_eq!(doc, before);
    assert_eq!(doc.lineage(), lineage);

    let pixmap = render(&doc, 0.25).unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (281, 199));
}

#[test]
fn shapes_land_at_scaled_positions() {
    let mut doc = blank(400, 400);
    doc.insert(Element::shape(filled(ShapeKind::Rect, Color::rgb(255, 0, 0)), 100.0, 100.0, 200.0, 200.0))
        .unwrap();

    let pixmap = render(&doc, 0.5).unwrap();
    assert_eq!(rgb(&pixmap, 100, 100), (255, 0, 0));
    assert_eq!(rgb(&pixmap, 10, 10), (255, 255, 255));
}

#[test]
fn ephemeral_elements_are_not_rendered() {
    let mut doc = blank(100, 100);
    doc.insert(Element::shape(filled(ShapeKind::Rect, Color::BLACK), 0.0, 0.0, 100.0, 100.0).into_ephemeral())
        .unwrap();
    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 50, 50), (255, 255, 255));
}

#[test]
fn group_children_are_offset_by_the_group() {
    let mut doc = blank(300, 100);
    let child = Element::shape(filled(ShapeKind::Rect, Color::rgb(0, 0, 255)), 0.0, 0.0, 50.0, 50.0);
    doc.insert(Element::group(vec![child], 100.0, 0.0, 50.0, 50.0)).unwrap();

    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 125, 25), (0, 0, 255));
    assert_eq!(rgb(&pixmap, 25, 25), (255, 255, 255));
}

#[test]
fn resized_groups_stretch_their_children() {
    let mut doc = blank(300, 100);
    let child = Element::shape(filled(ShapeKind::Rect, Color::rgb(0, 0, 255)), 0.0, 0.0, 50.0, 50.0);
    doc.insert(Element::group(vec![child], 100.0, 0.0, 100.0, 100.0)).unwrap();

    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 175, 75), (0, 0, 255));
    assert_eq!(rgb(&pixmap, 225, 50), (255, 255, 255));
}

#[test]
fn resized_qr_placeholder_follows_its_box() {
    let mut doc = blank(1000, 1000);
    let qr = doc.insert(archetype(PlaceholderRole::QrCode, 1000, 1000)).unwrap();
    let (x, y) = {
        let e = doc.get(qr).unwrap();
        (e.x, e.y)
    };
    // Centre of the data module at (8, 8), in glyph units.
    let module = QR_SIZE / 11.0;
    let at = |scale: f64| ((x + 8.5 * module * scale) as u32, (y + 8.5 * module * scale) as u32);

    let before = render(&doc, 1.0).unwrap();
    let (px, py) = at(2.0);
    assert_eq!(rgb(&before, px, py), (255, 255, 255));

    doc.modify(qr, ChangeKind::Geometry, |e| {
        e.width = QR_SIZE * 2.0;
        e.height = QR_SIZE * 2.0;
    })
    .unwrap();
    let after = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&after, px, py), (0x1a, 0x1a, 0x1a));
    let (ox, oy) = at(1.0);
    assert_eq!(rgb(&after, ox, oy), (255, 255, 255));
}

#[test]
fn rotated_elements_are_rotated() {
    let mut doc = blank(200, 200);
    // A 160x20 bar through the center, turned upright.
    doc.insert(
        Element::shape(filled(ShapeKind::Rect, Color::BLACK), 20.0, 90.0, 160.0, 20.0).with_rotation(90.0),
    )
    .unwrap();
    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 100, 30), (0, 0, 0));
    assert_eq!(rgb(&pixmap, 30, 100), (255, 255, 255));
}

#[test]
fn transparent_elements_leave_the_background() {
    let mut doc = blank(100, 100);
    doc.insert(Element::shape(filled(ShapeKind::Ellipse, Color::BLACK), 0.0, 0.0, 100.0, 100.0).with_opacity(0.0))
        .unwrap();
    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 50, 50), (255, 255, 255));
}

#[test]
fn embedded_images_are_drawn() {
    let mut doc = blank(100, 100);
    let image = ImageData {
        src: data_url::encode("image/png", &png_bytes([0, 200, 0, 255])),
        natural_width: 2,
        natural_height: 2,
    };
    doc.insert(Element::image(image, 0.0, 0.0, 100.0, 100.0)).unwrap();
    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 50, 50), (0, 200, 0));
}

#[test]
fn background_color_fills_canvas() {
    let mut doc = blank(40, 40);
    doc.set_background(Color::rgb(10, 20, 30));
    let pixmap = render(&doc, 1.0).unwrap();
    assert_eq!(rgb(&pixmap, 0, 0), (10, 20, 30));
    assert_eq!(rgb(&pixmap, 39, 39), (10, 20, 30));
}

#[test]
fn preview_is_a_png_data_url() {
    let doc = starter_document(Orientation::Portrait);
    let url = preview_data_url(&doc, 0.1).unwrap();
    let (mime, bytes) = data_url::decode(&url).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn bad_scale_is_rejected() {
    let doc = blank(10, 10);
    assert!(matches!(render(&doc, 0.0), Err(RenderError::InvalidScale(_))));
    assert!(matches!(render(&doc, f64::NAN), Err(RenderError::InvalidScale(_))));
}
