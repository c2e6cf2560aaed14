//! Lint diagnostics for certificate documents.
//!
//! Reports problems without modifying the document. The CLI prints these from
//! `check`; `check --write` fixes the missing-placeholder case through
//! [`crate::codec::load_document`].

use crate::id::ElementId;
use crate::model::{Document, Element, ElementKind, PlaceholderRole};
use kurbo::Rect;

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LintSeverity {
    /// Breaks the placeholder contract; issuance would fail.
    Error,
    /// Likely a mistake.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct LintDiagnostic {
    /// The element this refers to, or `None` for document-level findings.
    pub element: Option<ElementId>,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "missing-role", "off-canvas").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules and return diagnostics, most severe first.
#[must_use]
pub fn lint_document(doc: &Document) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_roles(doc, &mut diags);
    for element in doc.elements().iter().filter(|e| !e.ephemeral) {
        lint_off_canvas(doc, element, &mut diags);
        lint_element(element, &mut diags);
        element.for_each_descendant(&mut |child| lint_element(child, &mut diags));
    }
    diags.sort_by_key(|d| d.severity);
    diags
}

/// True if no diagnostic is an error.
pub fn is_issuable(diags: &[LintDiagnostic]) -> bool {
    diags.iter().all(|d| d.severity != LintSeverity::Error)
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn lint_roles(doc: &Document, diags: &mut Vec<LintDiagnostic>) {
    for role in PlaceholderRole::ALL {
        match doc.role_count(role) {
            0 => diags.push(LintDiagnostic {
                element: None,
                message: format!("No element carries the {role} placeholder."),
                severity: LintSeverity::Error,
                rule: "missing-role",
            }),
            1 => {}
            n => diags.push(LintDiagnostic {
                element: doc.element_with_role(role).map(|e| e.id),
                message: format!("{n} elements carry the {role} placeholder; exactly one is allowed."),
                severity: LintSeverity::Error,
                rule: "duplicate-role",
            }),
        }
    }
}

fn lint_off_canvas(doc: &Document, element: &Element, diags: &mut Vec<LintDiagnostic>) {
    let canvas = Rect::new(0.0, 0.0, doc.canvas_width() as f64, doc.canvas_height() as f64);
    let bounds = element.aabb();
    // Touching edges still counts as on-canvas; zero-height lines have empty area.
    let outside = bounds.x1 < canvas.x0 || bounds.y1 < canvas.y0 || bounds.x0 > canvas.x1 || bounds.y0 > canvas.y1;
    if outside {
        diags.push(LintDiagnostic {
            element: Some(element.id),
            message: format!("`{}` lies entirely outside the canvas.", element.id),
            severity: if element.is_placeholder() {
                LintSeverity::Error
            } else {
                LintSeverity::Warning
            },
            rule: "off-canvas",
        });
    }
}

fn lint_element(element: &Element, diags: &mut Vec<LintDiagnostic>) {
    if !(0.0..=1.0).contains(&element.opacity) {
        diags.push(LintDiagnostic {
            element: Some(element.id),
            message: format!("`{}` has opacity {} outside 0..1.", element.id, element.opacity),
            severity: LintSeverity::Warning,
            rule: "opacity-range",
        });
    }

    let is_line = matches!(&element.kind, ElementKind::Shape(s) if s.shape == crate::model::ShapeKind::Line);
    let bad_size = if is_line {
        element.width < 0.0 || element.height < 0.0 || (element.width == 0.0 && element.height == 0.0)
    } else {
        element.width <= 0.0 || element.height <= 0.0
    };
    if bad_size {
        diags.push(LintDiagnostic {
            element: Some(element.id),
            message: format!(
                "`{}` has a non-positive size ({} x {}).",
                element.id, element.width, element.height
            ),
            severity: LintSeverity::Warning,
            rule: "non-positive-size",
        });
    }

    if let Some(role) = element.role
        && let ElementKind::Text(text) = &element.kind
        && text.content.trim().is_empty()
    {
        diags.push(LintDiagnostic {
            element: Some(element.id),
            message: format!("The {role} placeholder has no visible text; use `{}`.", role.token()),
            severity: LintSeverity::Info,
            rule: "empty-placeholder",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::starter_document;
    use crate::model::{ChangeKind, Orientation, ShapeData, ShapeKind};

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn starter_is_clean() {
        let doc = starter_document(Orientation::Landscape);
        let diags = lint_document(&doc);
        assert!(diags.is_empty(), "{diags:?}");
        assert!(is_issuable(&diags));
    }

    #[test]
    fn empty_document_misses_every_role() {
        let doc = Document::new(100, 100).unwrap();
        let diags = lint_document(&doc);
        assert_eq!(diags.len(), 5);
        assert!(diags.iter().all(|d| d.rule == "missing-role"));
        assert!(!is_issuable(&diags));
    }

    #[test]
    fn off_canvas_and_bad_size() {
        let mut doc = starter_document(Orientation::Portrait);
        doc.insert(Element::shape(ShapeData::new(ShapeKind::Rect), 5000.0, 10.0, 20.0, 20.0))
            .unwrap();
        doc.insert(Element::shape(ShapeData::new(ShapeKind::Ellipse), 10.0, 10.0, 0.0, 20.0))
            .unwrap();
        // A horizontal line is fine.
        doc.insert(Element::shape(ShapeData::new(ShapeKind::Line), 10.0, 10.0, 50.0, 0.0))
            .unwrap();
        assert_eq!(rules(&lint_document(&doc)), vec!["off-canvas", "non-positive-size"]);
    }

    #[test]
    fn blank_placeholder_text_is_reported() {
        let mut doc = starter_document(Orientation::Landscape);
        let id = doc.element_with_role(PlaceholderRole::CourseTitle).unwrap().id;
        doc.modify(id, ChangeKind::Content, |e| {
            if let ElementKind::Text(t) = &mut e.kind {
                t.content = "   ".into();
            }
        })
        .unwrap();
        let diags = lint_document(&doc);
        assert_eq!(rules(&diags), vec!["empty-placeholder"]);
        assert_eq!(diags[0].element, Some(id));
        assert!(is_issuable(&diags));
    }
}
