//! Default visuals for placeholders and the built-in starter layout.
//!
//! Archetype geometry is proportional to the canvas so the same definitions
//! work for landscape and portrait templates.

use crate::model::{
    Color, Document, Element, FontStyle, Orientation, PlaceholderRole, ShapeData, ShapeKind, TextAlign, TextStyle,
};

const INK: Color = Color::rgb(0x1a, 0x1a, 0x1a);
const GOLD: Color = Color::rgb(0xb8, 0x86, 0x0b);
const PAPER: Color = Color::rgb(0xff, 0xfd, 0xf7);

pub const QR_SIZE: f64 = 110.0;

fn centered_text(content: String, style: TextStyle, canvas_w: f64, box_w: f64, y: f64, height: f64) -> Element {
    Element::text(content, style, (canvas_w - box_w) / 2.0, y, box_w, height)
}

/// Build the default element for `role` on a `width` x `height` canvas.
pub fn archetype(role: PlaceholderRole, width: u32, height: u32) -> Element {
    let w = width as f64;
    let h = height as f64;
    let element = match role {
        PlaceholderRole::StudentName => centered_text(
            role.token(),
            TextStyle {
                font_size: 48.0,
                font_weight: 700,
                color: INK,
                ..TextStyle::default()
            },
            w,
            w * 0.6,
            h * 0.38,
            64.0,
        ),
        PlaceholderRole::CourseTitle => centered_text(
            role.token(),
            TextStyle {
                font_size: 28.0,
                font_weight: 600,
                color: INK,
                ..TextStyle::default()
            },
            w,
            w * 0.7,
            h * 0.58,
            40.0,
        ),
        PlaceholderRole::IssueDate => Element::text(
            role.token(),
            TextStyle {
                font_size: 18.0,
                align: TextAlign::Left,
                ..TextStyle::default()
            },
            w * 0.12,
            h * 0.80,
            w * 0.25,
            28.0,
        ),
        PlaceholderRole::QrCode => qr_glyph(w * 0.88 - QR_SIZE, h * 0.88 - QR_SIZE - 24.0),
        PlaceholderRole::VerificationUrl => Element::text(
            role.token(),
            TextStyle {
                font_size: 12.0,
                align: TextAlign::Right,
                color: Color::rgb(0x55, 0x55, 0x55),
                ..TextStyle::default()
            },
            w * 0.88 - w * 0.35,
            h * 0.88 - 16.0,
            w * 0.35,
            18.0,
        ),
    };
    element.with_role(role)
}

/// The QR stand-in: a framed square with three finder patterns and a few
/// data modules, composed as one group.
fn qr_glyph(x: f64, y: f64) -> Element {
    let module = QR_SIZE / 11.0;
    let dark = |mx: f64, my: f64, size: f64| {
        Element::shape(
            ShapeData::new(ShapeKind::Rect).filled(INK).stroked(None, 0.0),
            mx * module,
            my * module,
            size * module,
            size * module,
        )
    };
    let light = |mx: f64, my: f64, size: f64| {
        Element::shape(
            ShapeData::new(ShapeKind::Rect).filled(Color::WHITE).stroked(None, 0.0),
            mx * module,
            my * module,
            size * module,
            size * module,
        )
    };

    let mut children = vec![Element::shape(
        ShapeData::new(ShapeKind::Rect)
            .filled(Color::WHITE)
            .stroked(Some(INK), 1.0),
        0.0,
        0.0,
        QR_SIZE,
        QR_SIZE,
    )];
    for (fx, fy) in [(1.0, 1.0), (7.0, 1.0), (1.0, 7.0)] {
        children.push(dark(fx, fy, 3.0));
        children.push(light(fx + 0.75, fy + 0.75, 1.5));
        children.push(dark(fx + 1.0, fy + 1.0, 1.0));
    }
    for (mx, my) in [(5.0, 2.0), (5.0, 5.0), (7.0, 5.0), (8.0, 8.0), (5.0, 8.0), (2.0, 5.0)] {
        children.push(dark(mx, my, 1.0));
    }
    Element::group(children, x, y, QR_SIZE, QR_SIZE)
}

/// A fresh document: decorative border, headings, signature line and seal,
/// plus all five placeholders.
pub fn starter_document(orientation: Orientation) -> Document {
    let mut doc = Document::with_orientation(orientation);
    doc.set_background(PAPER);
    let w = doc.canvas_width() as f64;
    let h = doc.canvas_height() as f64;

    let decorations = [
        Element::shape(
            ShapeData::new(ShapeKind::Rect).stroked(Some(GOLD), 8.0),
            20.0,
            20.0,
            w - 40.0,
            h - 40.0,
        ),
        Element::shape(
            ShapeData::new(ShapeKind::Rect).stroked(Some(GOLD), 2.0),
            36.0,
            36.0,
            w - 72.0,
            h - 72.0,
        ),
        centered_text(
            "Certificate of Completion".into(),
            TextStyle {
                font_size: 44.0,
                font_weight: 700,
                color: GOLD,
                ..TextStyle::default()
            },
            w,
            w * 0.7,
            h * 0.12,
            56.0,
        ),
        centered_text(
            "This is to certify that".into(),
            TextStyle {
                font_size: 20.0,
                font_style: FontStyle::Italic,
                ..TextStyle::default()
            },
            w,
            w * 0.5,
            h * 0.30,
            28.0,
        ),
        centered_text(
            "has successfully completed the course".into(),
            TextStyle {
                font_size: 20.0,
                font_style: FontStyle::Italic,
                ..TextStyle::default()
            },
            w,
            w * 0.5,
            h * 0.50,
            28.0,
        ),
        Element::shape(
            ShapeData::new(ShapeKind::Line).stroked(Some(INK), 1.5),
            (w - 220.0) / 2.0,
            h * 0.80 + 20.0,
            220.0,
            0.0,
        ),
        centered_text(
            "Authorized Signature".into(),
            TextStyle {
                font_size: 14.0,
                ..TextStyle::default()
            },
            w,
            220.0,
            h * 0.80 + 26.0,
            20.0,
        ),
        Element::shape(
            ShapeData::new(ShapeKind::Star {
                points: 12,
                inner_ratio: 0.82,
            })
            .filled(GOLD)
            .stroked(Some(Color::rgb(0x8b, 0x65, 0x08)), 2.0),
            w * 0.12,
            h * 0.60,
            90.0,
            90.0,
        ),
    ];

    for element in decorations.into_iter().chain(PlaceholderRole::ALL.map(|r| archetype(r, w as u32, h as u32))) {
        if let Err(err) = doc.insert(element) {
            log::warn!("starter layout element rejected: {err}");
        }
    }
    doc.drain_events();
    doc
}
