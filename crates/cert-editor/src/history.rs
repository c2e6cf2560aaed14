//! Snapshot-based undo/redo.
//!
//! Every entry is a complete MessagePack snapshot of the document without its
//! ephemeral elements. The list is bounded; a new checkpoint after an undo
//! truncates the redo branch. Entries are bound to the document's lineage: if
//! the document was swapped out from under the history, the next undo/redo
//! starts over from the current state instead of restoring foreign content.

use cert_core::{Document, DocumentSnapshot, PlaceholderEnforcer, PlaceholderRole};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("cannot encode history snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("cannot decode history snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// One immutable checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    bytes: Vec<u8>,
}

impl HistoryEntry {
    pub fn capture(doc: &Document) -> Result<Self, HistoryError> {
        Ok(Self {
            bytes: rmp_serde::to_vec(&DocumentSnapshot::from(doc))?,
        })
    }

    pub fn restore(&self) -> Result<Document, HistoryError> {
        let snapshot: DocumentSnapshot = rmp_serde::from_slice(&self.bytes)?;
        Ok(snapshot.into_document())
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// What an undo or redo did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStep {
    /// The cursor moved and the document was restored. Lists any roles the
    /// enforcer had to re-create afterwards.
    Restored { synthesized: Vec<PlaceholderRole> },
    /// Already at the oldest (undo) or newest (redo) entry.
    AtBoundary,
    /// The document had been replaced; history now starts from it.
    Reseeded,
}

/// Bounded checkpoint list plus a cursor (index of the entry matching the
/// current document).
#[derive(Debug)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    max_depth: usize,
    lineage: Option<u64>,
}

impl HistoryManager {
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_depth),
            cursor: 0,
            max_depth: max_depth.max(1),
            lineage: None,
        }
    }

    /// Drop everything and start from `doc`.
    pub fn seed(&mut self, doc: &Document) -> Result<(), HistoryError> {
        let entry = HistoryEntry::capture(doc)?;
        self.entries.clear();
        self.entries.push(entry);
        self.cursor = 0;
        self.lineage = Some(doc.lineage());
        log::debug!("history seeded for document lineage {}", doc.lineage());
        Ok(())
    }

    /// Record the current state, even if it equals the current entry; the
    /// session decides when there is something worth recording. Entries
    /// after the cursor are discarded and the oldest entry is dropped past
    /// `max_depth`.
    pub fn checkpoint(&mut self, doc: &Document) -> Result<(), HistoryError> {
        if self.lineage != Some(doc.lineage()) {
            return self.seed(doc);
        }
        let entry = HistoryEntry::capture(doc)?;
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);
        if self.entries.len() > self.max_depth {
            let excess = self.entries.len() - self.max_depth;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
        log::debug!("checkpoint {} of {}", self.cursor + 1, self.entries.len());
        Ok(())
    }

    /// Step back one entry and restore it into `doc`, then make sure every
    /// placeholder exists.
    pub fn undo(&mut self, doc: &mut Document, enforcer: &mut PlaceholderEnforcer) -> Result<HistoryStep, HistoryError> {
        if self.invalidated(doc)? {
            return Ok(HistoryStep::Reseeded);
        }
        if self.cursor == 0 {
            return Ok(HistoryStep::AtBoundary);
        }
        self.restore(self.cursor - 1, doc, enforcer)
    }

    /// Mirror of [`HistoryManager::undo`].
    pub fn redo(&mut self, doc: &mut Document, enforcer: &mut PlaceholderEnforcer) -> Result<HistoryStep, HistoryError> {
        if self.invalidated(doc)? {
            return Ok(HistoryStep::Reseeded);
        }
        if self.cursor + 1 >= self.entries.len() {
            return Ok(HistoryStep::AtBoundary);
        }
        self.restore(self.cursor + 1, doc, enforcer)
    }

    fn invalidated(&mut self, doc: &Document) -> Result<bool, HistoryError> {
        if self.lineage == Some(doc.lineage()) && !self.entries.is_empty() {
            return Ok(false);
        }
        log::warn!("document was replaced outside the history; discarding {} entries", self.entries.len());
        self.seed(doc)?;
        Ok(true)
    }

    fn restore(
        &mut self,
        target: usize,
        doc: &mut Document,
        enforcer: &mut PlaceholderEnforcer,
    ) -> Result<HistoryStep, HistoryError> {
        let snapshot = self.entries[target].restore()?;
        doc.restore_from(snapshot);
        let synthesized = enforcer.ensure_all_present(doc);
        doc.drain_events();
        self.cursor = target;
        log::debug!("history moved to entry {} of {}", target + 1, self.entries.len());
        Ok(HistoryStep::Restored {
            synthesized: synthesized.to_vec(),
        })
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cert_core::model::{ChangeKind, Element, Orientation, RemovalOrigin, ShapeData, ShapeKind};
    use cert_core::starter_document;

    fn setup() -> (Document, PlaceholderEnforcer, HistoryManager) {
        let doc = starter_document(Orientation::Landscape);
        let enforcer = PlaceholderEnforcer::new(&doc);
        let mut history = HistoryManager::new(50);
        history.seed(&doc).unwrap();
        (doc, enforcer, history)
    }

    fn add_rect(doc: &mut Document, x: f64) -> cert_core::ElementId {
        doc.insert(Element::shape(ShapeData::new(ShapeKind::Rect), x, 0.0, 10.0, 10.0))
            .unwrap()
    }

    #[test]
    fn undo_redo_move() {
        let (mut doc, mut enforcer, mut history) = setup();
        let id = add_rect(&mut doc, 0.0);
        history.checkpoint(&doc).unwrap();
        doc.modify(id, ChangeKind::Geometry, |e| e.x = 50.0).unwrap();
        history.checkpoint(&doc).unwrap();

        assert!(matches!(history.undo(&mut doc, &mut enforcer).unwrap(), HistoryStep::Restored { .. }));
        assert_eq!(doc.get(id).unwrap().x, 0.0);

        history.redo(&mut doc, &mut enforcer).unwrap();
        assert_eq!(doc.get(id).unwrap().x, 50.0);
    }

    #[test]
    fn new_checkpoint_truncates_redo() {
        let (mut doc, mut enforcer, mut history) = setup();
        add_rect(&mut doc, 1.0);
        history.checkpoint(&doc).unwrap();
        history.undo(&mut doc, &mut enforcer).unwrap();
        assert!(history.can_redo());

        add_rect(&mut doc, 2.0);
        history.checkpoint(&doc).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn max_depth_trims_oldest() {
        let (mut doc, mut enforcer, _) = setup();
        let mut history = HistoryManager::new(3);
        history.seed(&doc).unwrap();
        for i in 0..5 {
            add_rect(&mut doc, i as f64);
            history.checkpoint(&doc).unwrap();
        }
        assert_eq!(history.len(), 3);
        let mut undo_count = 0;
        while history.undo(&mut doc, &mut enforcer).unwrap() != HistoryStep::AtBoundary {
            undo_count += 1;
        }
        assert_eq!(undo_count, 2);
    }

    #[test]
    fn every_checkpoint_is_recorded_up_to_the_bound() {
        let (doc, _, mut history) = setup();
        for _ in 0..60 {
            history.checkpoint(&doc).unwrap();
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.cursor(), 49);
    }

    #[test]
    fn ephemeral_elements_do_not_reach_history() {
        let (mut doc, _, mut history) = setup();
        let before = history.entries()[0].clone();
        doc.insert(Element::shape(ShapeData::new(ShapeKind::Line), 0.0, 50.0, 100.0, 0.0).into_ephemeral())
            .unwrap();
        history.checkpoint(&doc).unwrap();
        assert_eq!(history.entries()[1], before);
    }

    #[test]
    fn boundaries_are_silent() {
        let (mut doc, mut enforcer, mut history) = setup();
        let before = doc.clone();
        assert_eq!(history.undo(&mut doc, &mut enforcer).unwrap(), HistoryStep::AtBoundary);
        assert_eq!(history.redo(&mut doc, &mut enforcer).unwrap(), HistoryStep::AtBoundary);
        assert_eq!(doc, before);
    }

    #[test]
    fn replaced_document_reseeds() {
        let (mut doc, mut enforcer, mut history) = setup();
        add_rect(&mut doc, 3.0);
        history.checkpoint(&doc).unwrap();
        assert_eq!(history.len(), 2);

        doc.replace(starter_document(Orientation::Portrait));
        let current = doc.clone();
        assert_eq!(history.undo(&mut doc, &mut enforcer).unwrap(), HistoryStep::Reseeded);
        assert_eq!(doc, current);
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn restore_re_creates_missing_placeholders() {
        let mut doc = Document::new(800, 600).unwrap();
        let mut enforcer = PlaceholderEnforcer::new(&doc);
        let mut history = HistoryManager::new(10);
        // A legacy history entry taken before any placeholder existed.
        history.seed(&doc).unwrap();
        enforcer.ensure_all_present(&mut doc);
        history.checkpoint(&doc).unwrap();

        let step = history.undo(&mut doc, &mut enforcer).unwrap();
        assert_eq!(
            step,
            HistoryStep::Restored {
                synthesized: PlaceholderRole::ALL.to_vec()
            }
        );
        for role in PlaceholderRole::ALL {
            assert_eq!(doc.role_count(role), 1);
        }
        assert!(doc.drain_events().is_empty());

        // Structural removal inside restored content still self-heals.
        let qr = doc.element_with_role(PlaceholderRole::QrCode).unwrap().id;
        let removal = doc.remove(qr, RemovalOrigin::Structural).unwrap().unwrap();
        assert!(removal.restored.is_some());
    }
}
