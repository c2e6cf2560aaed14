//! Hit testing: point → element lookup.
//!
//! Walks the element list front to back (last painted = topmost). Groups are
//! hit as one unit; ephemeral elements are transparent to the pointer.

use cert_core::id::ElementId;
use cert_core::model::Document;
use kurbo::{Point, Rect};

/// Find the topmost element at `point` (canvas coordinates), honoring
/// rotation. Returns `None` on empty canvas.
pub fn hit_test(doc: &Document, point: Point) -> Option<ElementId> {
    doc.elements()
        .iter()
        .rev()
        .filter(|e| !e.ephemeral)
        .find(|e| e.contains_point(point))
        .map(|e| e.id)
}

/// Find all elements whose rotated bounds touch the marquee rectangle,
/// back to front.
pub fn hit_test_rect(doc: &Document, marquee: Rect) -> Vec<ElementId> {
    let marquee = marquee.abs();
    doc.elements()
        .iter()
        .filter(|e| !e.ephemeral)
        .filter(|e| overlaps(e.aabb(), marquee))
        .map(|e| e.id)
        .collect()
}

/// Closed-interval overlap, so zero-height lines still register.
fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}
