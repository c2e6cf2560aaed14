//! Placeholder protection.
//!
//! Every document keeps exactly one top-level element per
//! [`PlaceholderRole`]. Destructive requests against placeholders are
//! refused up front (delete, duplicate, re-role); anything that slips past the
//! checks is repaired afterwards by re-materializing the role from its
//! archetype.

use crate::archetype::archetype;
use crate::error::ModelError;
use crate::id::ElementId;
use crate::model::{Document, Element, PlaceholderRole};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Non-fatal notification for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// A placeholder was removed through an indirect path and re-created.
    PlaceholderRestored { role: PlaceholderRole, id: ElementId },
}

/// False iff the element holds a placeholder role.
pub fn can_remove(element: &Element) -> bool {
    element.role.is_none()
}

pub fn check_removable(element: &Element) -> Result<(), ModelError> {
    match element.role {
        Some(role) => Err(ModelError::CannotRemovePlaceholder(role)),
        None => Ok(()),
    }
}

pub fn check_duplicable(element: &Element) -> Result<(), ModelError> {
    match element.role {
        Some(role) => Err(ModelError::CannotDuplicatePlaceholder(role)),
        None => Ok(()),
    }
}

/// Post-removal hook, called by [`Document::remove`] for every removal.
///
/// If `removed` was a placeholder, its archetype is inserted at the same
/// z-index with the removed element's (x, y).
pub(crate) fn restore_removed(doc: &mut Document, removed: &Element, index: usize) -> Option<Notice> {
    let role = removed.role?;
    if doc.element_with_role(role).is_some() {
        return None;
    }
    let mut replacement = archetype(role, doc.canvas_width(), doc.canvas_height());
    replacement.x = removed.x;
    replacement.y = removed.y;
    let id = doc.insert_at(index, replacement).ok()?;
    log::info!("restored {role} placeholder as {id} at ({}, {})", removed.x, removed.y);
    Some(Notice::PlaceholderRestored { role, id })
}

/// Tracks which placeholder roles a document holds and re-creates the
/// missing ones.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderEnforcer {
    present: BTreeSet<PlaceholderRole>,
}

impl PlaceholderEnforcer {
    pub fn new(doc: &Document) -> Self {
        Self {
            present: doc.roles_present(),
        }
    }

    /// Roles seen at the last scan.
    pub fn present(&self) -> &BTreeSet<PlaceholderRole> {
        &self.present
    }

    pub fn missing(&self) -> SmallVec<[PlaceholderRole; 5]> {
        PlaceholderRole::ALL
            .into_iter()
            .filter(|r| !self.present.contains(r))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.present.len() == PlaceholderRole::ALL.len()
    }

    /// Re-scan the document.
    pub fn refresh(&mut self, doc: &Document) {
        self.present = doc.roles_present();
    }

    /// Insert a default-archetype element on top of the z-order for every
    /// role the document lacks. Returns the roles that were synthesized.
    pub fn ensure_all_present(&mut self, doc: &mut Document) -> SmallVec<[PlaceholderRole; 5]> {
        self.refresh(doc);
        let mut synthesized = SmallVec::new();
        for role in self.missing() {
            let element = archetype(role, doc.canvas_width(), doc.canvas_height());
            match doc.insert(element) {
                Ok(id) => {
                    log::info!("synthesized missing {role} placeholder as {id}");
                    synthesized.push(role);
                }
                Err(err) => log::warn!("could not synthesize {role} placeholder: {err}"),
            }
        }
        self.refresh(doc);
        synthesized
    }

    pub fn can_remove(&self, element: &Element) -> bool {
        can_remove(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::starter_document;
    use crate::model::{Orientation, RemovalOrigin, ShapeData, ShapeKind};

    #[test]
    fn empty_document_gets_all_roles() {
        let mut doc = Document::new(800, 600).unwrap();
        let mut enforcer = PlaceholderEnforcer::new(&doc);
        assert_eq!(enforcer.missing().len(), 5);

        let added = enforcer.ensure_all_present(&mut doc);
        assert_eq!(added.as_slice(), &PlaceholderRole::ALL);
        assert!(enforcer.is_complete());
        for role in PlaceholderRole::ALL {
            assert_eq!(doc.role_count(role), 1);
        }

        // Idempotent
        assert!(enforcer.ensure_all_present(&mut doc).is_empty());
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn structural_removal_restores_at_same_place() {
        let mut doc = starter_document(Orientation::Landscape);
        let target = doc.element_with_role(PlaceholderRole::CourseTitle).unwrap().clone();
        let index = doc.index_of(target.id).unwrap();

        let removal = doc
            .remove(target.id, RemovalOrigin::Structural)
            .unwrap()
            .expect("element existed");

        let Some(Notice::PlaceholderRestored { role, id }) = removal.restored else {
            panic!("expected a restore notice");
        };
        assert_eq!(role, PlaceholderRole::CourseTitle);
        let restored = doc.get(id).unwrap();
        assert_eq!((restored.x, restored.y), (target.x, target.y));
        assert_eq!(doc.index_of(id), Some(index));
        assert_eq!(doc.role_count(PlaceholderRole::CourseTitle), 1);
    }

    #[test]
    fn ordinary_removal_has_no_notice() {
        let mut doc = Document::new(100, 100).unwrap();
        let id = doc
            .insert(Element::shape(ShapeData::new(ShapeKind::Ellipse), 0.0, 0.0, 5.0, 5.0))
            .unwrap();
        let removal = doc.remove(id, RemovalOrigin::UserDelete).unwrap().unwrap();
        assert_eq!(removal.restored, None);
        assert!(doc.is_empty());
    }

    #[test]
    fn placeholders_cannot_be_duplicated() {
        let mut doc = starter_document(Orientation::Portrait);
        let qr = doc.element_with_role(PlaceholderRole::QrCode).unwrap().id;
        let before = doc.len();
        assert_eq!(
            doc.duplicate(qr, 10.0, 10.0),
            Err(ModelError::CannotDuplicatePlaceholder(PlaceholderRole::QrCode))
        );
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn enforcer_can_remove_matches_role() {
        let doc = starter_document(Orientation::Landscape);
        let enforcer = PlaceholderEnforcer::new(&doc);
        for element in doc.elements() {
            assert_eq!(enforcer.can_remove(element), element.role.is_none());
        }
    }
}
