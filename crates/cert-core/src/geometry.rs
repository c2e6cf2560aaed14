//! Element geometry: boxes, rotation transforms, and shape outlines.
//!
//! Rotation is about the element center, in degrees, clockwise on a
//! y-down canvas.

use crate::model::{Element, ElementKind, ShapeKind};
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape};
use std::f64::consts::PI;

/// Curve flattening tolerance for outlines, in canvas pixels.
pub const TOLERANCE: f64 = 0.1;

impl Element {
    /// The unrotated box in the parent's coordinate space.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Local-to-parent transform (rotation about the center).
    pub fn transform(&self) -> Affine {
        if self.rotation == 0.0 {
            Affine::IDENTITY
        } else {
            Affine::rotate_about(self.rotation.to_radians(), self.center())
        }
    }

    /// Axis-aligned bounds after rotation.
    pub fn aabb(&self) -> Rect {
        self.transform().transform_rect_bbox(self.rect())
    }

    /// Far corner of a group's children, measured from the group origin.
    /// `None` for non-groups and for groups with nothing to lay out.
    pub fn content_extent(&self) -> Option<(f64, f64)> {
        let ElementKind::Group(group) = &self.kind else {
            return None;
        };
        let (w, h) = group
            .children
            .iter()
            .filter(|c| !c.ephemeral)
            .map(Element::aabb)
            .fold((0.0_f64, 0.0_f64), |(w, h), bb| (w.max(bb.x1), h.max(bb.y1)));
        (w > 0.0 || h > 0.0).then_some((w, h))
    }

    /// Child-to-parent transform of a group, before its rotation. Children
    /// are stretched so their extent fills the group box; an axis with no
    /// extent is left unscaled.
    pub fn child_transform(&self) -> Affine {
        let translate = Affine::translate((self.x, self.y));
        let Some((w, h)) = self.content_extent() else {
            return translate;
        };
        let sx = if w > 0.0 { self.width / w } else { 1.0 };
        let sy = if h > 0.0 { self.height / h } else { 1.0 };
        translate * Affine::scale_non_uniform(sx, sy)
    }

    /// Whether a parent-space point falls inside the rotated box.
    pub fn contains_point(&self, p: Point) -> bool {
        let local = self.transform().inverse() * p;
        let r = self.rect();
        // Degenerate boxes (lines) get a small grab margin.
        let r = if r.width() < 4.0 || r.height() < 4.0 { r.inflate(2.0, 2.0) } else { r };
        r.contains(local)
    }
}

/// Outline of a shape filling `rect`, before rotation.
pub fn shape_outline(shape: &ShapeKind, rect: Rect, corner_radius: f64) -> BezPath {
    match *shape {
        ShapeKind::Rect => {
            if corner_radius > 0.0 {
                let max = rect.width().min(rect.height()) / 2.0;
                RoundedRect::from_rect(rect, corner_radius.min(max)).to_path(TOLERANCE)
            } else {
                rect.to_path(TOLERANCE)
            }
        }
        ShapeKind::Ellipse => Ellipse::from_rect(rect).to_path(TOLERANCE),
        ShapeKind::Triangle => closed(&[
            Point::new(rect.center().x, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ]),
        ShapeKind::Polygon { sides } => closed(&regular_vertices(rect, sides.max(3) as usize, 1.0, 1.0)),
        ShapeKind::Line => {
            let mut path = BezPath::new();
            path.move_to((rect.x0, rect.y0));
            path.line_to((rect.x1, rect.y1));
            path
        }
        ShapeKind::Star { points, inner_ratio } => {
            let n = points.max(3) as usize;
            closed(&regular_vertices(rect, n * 2, 1.0, inner_ratio.clamp(0.05, 1.0)))
        }
    }
}

/// Vertices around the ellipse inscribed in `rect`, first vertex pointing up.
/// Odd-indexed vertices use `odd_scale` (for stars).
fn regular_vertices(rect: Rect, count: usize, even_scale: f64, odd_scale: f64) -> Vec<Point> {
    let c = rect.center();
    let (rx, ry) = (rect.width() / 2.0, rect.height() / 2.0);
    (0..count)
        .map(|i| {
            let angle = -PI / 2.0 + 2.0 * PI * i as f64 / count as f64;
            let scale = if i % 2 == 0 { even_scale } else { odd_scale };
            Point::new(c.x + rx * scale * angle.cos(), c.y + ry * scale * angle.sin())
        })
        .collect()
}

fn closed(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}
