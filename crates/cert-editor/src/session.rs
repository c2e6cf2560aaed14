//! The editing session: one document, its placeholder enforcer and its
//! history, plus the selection and grid state of the canvas.
//!
//! Every mutation goes through [`EditorSession::apply`], which drains the
//! document's events afterwards:
//!
//! - **Structural** events (add, remove, z-order, canvas size) are
//!   checkpointed right away, after the enforcer has made sure every
//!   placeholder still exists.
//! - **Geometry/style/content** events only mark the session dirty. Drags
//!   and keystrokes are coalesced until the host sends a commit
//!   ([`EditorSession::commit`]) on pointer-up or blur.
//!
//! Grid guides are ephemeral elements. Adding or removing them drains the
//! events without dispatching, so they never reach the history.

use crate::config::EditorConfig;
use crate::error::EditError;
use crate::history::{HistoryManager, HistoryStep};
use crate::persist::{SaveAck, SaveOutcome, SaveRequest, SaveTicket, Template, TemplateId, TemplatePayload};
use crate::selection::{PropertyEdit, PropertyView};
use crate::shortcuts::ShortcutAction;
use cert_core::codec::{self, CodecWarning};
use cert_core::id::ElementId;
use cert_core::kurbo::Point;
use cert_core::model::*;
use cert_core::{
    LintDiagnostic, ModelError, Notice, PlaceholderEnforcer, lint_document, placeholder_bindings, starter_document,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

const GRID_COLOR: Color = Color::rgba(0x9e, 0xb3, 0xc8, 0x80);

/// Identifies one document lifetime within a session. Rotated whenever a
/// different template is opened, so late async results can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

impl SessionToken {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SessionToken(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A mutation from canvas or inspector interaction.
#[derive(Debug, Clone)]
pub enum EditMutation {
    Insert(Element),
    Move { id: ElementId, dx: f64, dy: f64 },
    Resize { id: ElementId, width: f64, height: f64 },
    Rotate { id: ElementId, degrees: f64 },
    SetProperty { id: ElementId, edit: PropertyEdit },
    /// User delete; placeholders are refused.
    Remove { id: ElementId },
    Reorder { id: ElementId, op: ZOrder },
    Duplicate { id: ElementId },
    SetBackground(Color),
    ResizeCanvas { width: u32, height: u32 },
    /// Remove every decorative element.
    Clear,
}

/// Result of a successful [`EditorSession::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    /// Id of the inserted or duplicated element.
    pub created: Option<ElementId>,
    /// Whether a history entry was recorded.
    pub checkpointed: bool,
}

/// Outcome of [`EditorSession::perform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Performed {
    Applied,
    /// Nothing to act on (empty selection, history boundary).
    Unchanged,
    /// The host should run the async save flow.
    SaveRequested,
}

pub struct EditorSession {
    token: SessionToken,
    document: Document,
    enforcer: PlaceholderEnforcer,
    history: HistoryManager,
    selection: Option<ElementId>,
    notices: Vec<Notice>,
    /// Uncommitted geometry/style/content changes.
    pending: bool,
    grid_visible: bool,
    config: EditorConfig,
    template_id: Option<TemplateId>,
    disposed: bool,
}

impl EditorSession {
    /// Start from the built-in landscape starter layout.
    pub fn new(config: EditorConfig) -> Result<Self, EditError> {
        Self::from_document(starter_document(Orientation::Landscape), config)
    }

    /// Start from an existing document. Missing placeholders are created
    /// before the first checkpoint. The config is validated first.
    pub fn from_document(mut document: Document, config: EditorConfig) -> Result<Self, EditError> {
        config.validate()?;
        let mut enforcer = PlaceholderEnforcer::new(&document);
        enforcer.ensure_all_present(&mut document);
        document.drain_events();
        let mut history = HistoryManager::new(config.history_depth);
        history.seed(&document)?;
        Ok(Self {
            token: SessionToken::next(),
            document,
            enforcer,
            history,
            selection: None,
            notices: Vec::new(),
            pending: false,
            grid_visible: false,
            config,
            template_id: None,
            disposed: false,
        })
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn template_id(&self) -> Option<&TemplateId> {
        self.template_id.as_ref()
    }

    pub fn selection(&self) -> Option<ElementId> {
        self.selection
    }

    pub fn grid_visible(&self) -> bool {
        self.grid_visible
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Take the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn lint(&self) -> Vec<LintDiagnostic> {
        lint_document(&self.document)
    }

    /// Which element the issuance renderer substitutes for each role.
    pub fn bindings(&self) -> BTreeMap<PlaceholderRole, ElementId> {
        placeholder_bindings(&self.document)
    }

    fn live(&self) -> Result<(), EditError> {
        if self.disposed { Err(EditError::Disposed) } else { Ok(()) }
    }

    fn editable(&self, id: ElementId) -> Result<&Element, EditError> {
        let element = self.document.get(id).ok_or(ModelError::UnknownElement(id))?;
        if element.ephemeral {
            return Err(EditError::Ephemeral);
        }
        Ok(element)
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Apply one mutation and dispatch its events. On error the document
    /// and history are unchanged.
    pub fn apply(&mut self, mutation: EditMutation) -> Result<Applied, EditError> {
        self.live()?;
        let mut created = None;
        let events = match mutation {
            EditMutation::Insert(element) => {
                if element.ephemeral {
                    return Err(EditError::Ephemeral);
                }
                created = Some(self.document.insert(element)?);
                self.document.drain_events()
            }
            EditMutation::Move { id, dx, dy } => {
                finite("x", dx)?;
                finite("y", dy)?;
                self.editable(id)?;
                self.document.modify(id, ChangeKind::Geometry, |e| {
                    e.x += dx;
                    e.y += dy;
                })?;
                self.document.drain_events()
            }
            EditMutation::Resize { id, width, height } => {
                non_negative("width", width)?;
                non_negative("height", height)?;
                self.editable(id)?;
                self.document.modify(id, ChangeKind::Geometry, |e| {
                    e.width = width;
                    e.height = height;
                })?;
                self.document.drain_events()
            }
            EditMutation::Rotate { id, degrees } => {
                finite("rotation", degrees)?;
                self.editable(id)?;
                self.document
                    .modify(id, ChangeKind::Geometry, |e| e.rotation = degrees.rem_euclid(360.0))?;
                self.document.drain_events()
            }
            EditMutation::SetProperty { id, edit } => {
                edit.check(self.editable(id)?)?;
                self.document.modify(id, edit.change_kind(), |e| edit.apply(e))?;
                self.document.drain_events()
            }
            EditMutation::Remove { id } => {
                self.editable(id)?;
                self.document.remove(id, RemovalOrigin::UserDelete)?;
                self.document.drain_events()
            }
            EditMutation::Reorder { id, op } => {
                self.editable(id)?;
                // Guides sit at the bottom; keep them out of the z-order arithmetic.
                self.remove_grid_lines();
                self.document.reorder(id, op);
                let events = self.document.drain_events();
                self.add_grid_lines();
                events
            }
            EditMutation::Duplicate { id } => {
                self.editable(id)?;
                let offset = self.config.duplicate_offset;
                created = Some(self.document.duplicate(id, offset, offset)?);
                self.document.drain_events()
            }
            EditMutation::SetBackground(color) => {
                self.document.set_background(color);
                self.document.drain_events()
            }
            EditMutation::ResizeCanvas { width, height } => {
                if width == 0 || height == 0 {
                    return Err(ModelError::InvalidCanvasSize { width, height }.into());
                }
                self.remove_grid_lines();
                self.document.resize_canvas(width, height)?;
                let events = self.document.drain_events();
                self.add_grid_lines();
                events
            }
            EditMutation::Clear => {
                let removals = self.document.clear();
                self.notices.extend(removals.into_iter().filter_map(|r| r.restored));
                self.document.drain_events()
            }
        };
        let checkpointed = self.dispatch(events)?;
        self.fix_selection();
        Ok(Applied { created, checkpointed })
    }

    fn dispatch(&mut self, events: Vec<DocumentEvent>) -> Result<bool, EditError> {
        if events.is_empty() {
            return Ok(false);
        }
        let structural = events.iter().any(DocumentEvent::is_structural);
        if events.iter().any(|e| !e.is_structural()) {
            self.pending = true;
        }
        if !structural {
            return Ok(false);
        }
        // Self-heal before the snapshot is taken.
        let synthesized = self.enforcer.ensure_all_present(&mut self.document);
        self.document.drain_events();
        self.push_synthesized(&synthesized);
        self.checkpoint()
    }

    fn checkpoint(&mut self) -> Result<bool, EditError> {
        self.history.checkpoint(&self.document)?;
        self.pending = false;
        Ok(true)
    }

    /// Commit event (pointer-up, blur): checkpoint coalesced changes.
    /// Returns whether an entry was recorded.
    pub fn commit(&mut self) -> Result<bool, EditError> {
        self.live()?;
        if !self.pending {
            return Ok(false);
        }
        self.checkpoint()
    }

    fn push_synthesized(&mut self, roles: &[PlaceholderRole]) {
        for &role in roles {
            if let Some(element) = self.document.element_with_role(role) {
                self.notices.push(Notice::PlaceholderRestored { role, id: element.id });
            }
        }
    }

    fn fix_selection(&mut self) {
        if let Some(id) = self.selection
            && !self.document.contains_id(id)
        {
            self.selection = None;
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select an element. Switching the selection commits pending edits.
    pub fn select(&mut self, id: ElementId) -> Result<(), EditError> {
        self.live()?;
        self.editable(id)?;
        if self.selection != Some(id) {
            self.commit()?;
        }
        self.selection = Some(id);
        Ok(())
    }

    /// Select the topmost element under `point`, or clear the selection on
    /// empty canvas.
    pub fn select_at(&mut self, point: Point) -> Result<Option<ElementId>, EditError> {
        self.live()?;
        match cert_render::hit_test(&self.document, point) {
            Some(id) => {
                self.select(id)?;
                Ok(Some(id))
            }
            None => {
                self.deselect()?;
                Ok(None)
            }
        }
    }

    pub fn deselect(&mut self) -> Result<(), EditError> {
        self.live()?;
        self.commit()?;
        self.selection = None;
        Ok(())
    }

    pub fn selected_properties(&self) -> Option<PropertyView> {
        self.selection
            .and_then(|id| self.document.get(id))
            .map(PropertyView::of)
    }

    fn selected(&self) -> Result<ElementId, EditError> {
        self.selection.ok_or(EditError::NothingSelected)
    }

    /// Write one inspector property on the selection. Checkpointed on the
    /// next commit.
    pub fn set_property(&mut self, edit: PropertyEdit) -> Result<(), EditError> {
        let id = self.selected()?;
        self.apply(EditMutation::SetProperty { id, edit })?;
        Ok(())
    }

    /// Drag step on the selection. Checkpointed on the next commit.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> Result<(), EditError> {
        let id = self.selected()?;
        self.apply(EditMutation::Move { id, dx, dy })?;
        Ok(())
    }

    /// Arrow-key move. A nudge is a complete gesture and commits at once.
    pub fn nudge(&mut self, dx: i8, dy: i8, large: bool) -> Result<(), EditError> {
        let step = if large {
            self.config.nudge_step_large
        } else {
            self.config.nudge_step
        };
        self.move_selected(f64::from(dx) * step, f64::from(dy) * step)?;
        self.commit()?;
        Ok(())
    }

    pub fn delete_selected(&mut self) -> Result<(), EditError> {
        let id = self.selected()?;
        self.apply(EditMutation::Remove { id })?;
        self.selection = None;
        Ok(())
    }

    /// Duplicate the selection and select the copy.
    pub fn duplicate_selected(&mut self) -> Result<ElementId, EditError> {
        let id = self.selected()?;
        let applied = self.apply(EditMutation::Duplicate { id })?;
        let copy = applied.created.ok_or(ModelError::UnknownElement(id))?;
        self.selection = Some(copy);
        Ok(copy)
    }

    /// Returns whether the z-order changed.
    pub fn reorder_selected(&mut self, op: ZOrder) -> Result<bool, EditError> {
        let id = self.selected()?;
        Ok(self.apply(EditMutation::Reorder { id, op })?.checkpointed)
    }

    // ─── Canvas ──────────────────────────────────────────────────────────

    /// Remove every non-placeholder element in one checkpoint. Returns the
    /// number of elements removed.
    pub fn clear(&mut self) -> Result<usize, EditError> {
        let before = self.document.len();
        self.apply(EditMutation::Clear)?;
        Ok(before.saturating_sub(self.document.len()))
    }

    pub fn set_background(&mut self, color: Color) -> Result<(), EditError> {
        self.apply(EditMutation::SetBackground(color))?;
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<(), EditError> {
        let (width, height) = orientation.dimensions();
        self.resize_canvas(width, height)
    }

    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<(), EditError> {
        self.apply(EditMutation::ResizeCanvas { width, height })?;
        Ok(())
    }

    /// Show or hide the guide grid. Returns the new visibility.
    pub fn toggle_grid(&mut self) -> Result<bool, EditError> {
        self.live()?;
        if self.grid_visible {
            self.remove_grid_lines();
            self.grid_visible = false;
        } else {
            self.grid_visible = true;
            self.add_grid_lines();
        }
        Ok(self.grid_visible)
    }

    fn remove_grid_lines(&mut self) {
        let guides: Vec<ElementId> = self
            .document
            .elements()
            .iter()
            .filter(|e| e.ephemeral)
            .map(|e| e.id)
            .collect();
        for id in guides {
            if let Err(err) = self.document.remove(id, RemovalOrigin::Structural) {
                log::warn!("cannot remove grid guide {id}: {err}");
            }
        }
        self.document.drain_events();
    }

    fn add_grid_lines(&mut self) {
        if !self.grid_visible {
            return;
        }
        let lines = grid_lines(
            self.document.canvas_width(),
            self.document.canvas_height(),
            self.config.grid_spacing,
        );
        for (index, line) in lines.into_iter().enumerate() {
            if let Err(err) = self.document.insert_at(index, line) {
                log::warn!("cannot add grid guide: {err}");
            }
        }
        self.document.drain_events();
    }

    /// Insert a loaded image scaled to fit the canvas, centered, as one
    /// checkpoint. The new element is selected.
    pub fn insert_image(&mut self, image: ImageData) -> Result<ElementId, EditError> {
        let (w, h) = fit_within(
            image.natural_width as f64,
            image.natural_height as f64,
            self.document.canvas_width() as f64,
            self.document.canvas_height() as f64,
        );
        let x = (self.document.canvas_width() as f64 - w) / 2.0;
        let y = (self.document.canvas_height() as f64 - h) / 2.0;
        let element = Element::image(image, x, y, w, h);
        let id = element.id;
        self.apply(EditMutation::Insert(element))?;
        self.selection = Some(id);
        Ok(id)
    }

    /// [`EditorSession::insert_image`] for a load that was started under
    /// `token`. Refused once the session has moved on.
    pub fn insert_loaded_image(&mut self, token: SessionToken, image: ImageData) -> Result<ElementId, EditError> {
        self.live()?;
        if token != self.token {
            log::debug!("dropping image loaded for an earlier document");
            return Err(EditError::Stale);
        }
        self.insert_image(image)
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<HistoryStep, EditError> {
        self.step_history(HistoryManager::undo)
    }

    pub fn redo(&mut self) -> Result<HistoryStep, EditError> {
        self.step_history(HistoryManager::redo)
    }

    fn step_history(
        &mut self,
        step: fn(
            &mut HistoryManager,
            &mut Document,
            &mut PlaceholderEnforcer,
        ) -> Result<HistoryStep, crate::history::HistoryError>,
    ) -> Result<HistoryStep, EditError> {
        self.live()?;
        self.commit()?;
        let outcome = step(&mut self.history, &mut self.document, &mut self.enforcer)?;
        if let HistoryStep::Restored { synthesized } = &outcome {
            self.push_synthesized(synthesized);
            self.add_grid_lines();
        }
        self.pending = false;
        self.fix_selection();
        Ok(outcome)
    }

    // ─── Whole-document loads ────────────────────────────────────────────

    /// Start over from the starter layout.
    pub fn new_document(&mut self, orientation: Orientation) -> Result<(), EditError> {
        self.live()?;
        self.install(starter_document(orientation), None)
    }

    /// Open a document from its JSON. History restarts from it.
    pub fn open_json(&mut self, json: &str) -> Result<Vec<CodecWarning>, EditError> {
        self.live()?;
        let decoded = codec::load_document(json)?;
        self.install(decoded.document, None)?;
        Ok(decoded.warnings)
    }

    /// Open a stored template. History restarts from it.
    pub fn load_template(&mut self, template: &Template) -> Result<Vec<CodecWarning>, EditError> {
        self.live()?;
        let decoded = codec::load_document(&template.payload.document_json)?;
        self.install(decoded.document, Some(template.id.clone()))?;
        log::info!("opened template {} ({})", template.id, template.payload.name);
        Ok(decoded.warnings)
    }

    fn install(&mut self, document: Document, template_id: Option<TemplateId>) -> Result<(), EditError> {
        let mut history = HistoryManager::new(self.config.history_depth);
        history.seed(&document)?;
        self.document.replace(document);
        self.enforcer.refresh(&self.document);
        self.history = history;
        self.token = SessionToken::next();
        self.template_id = template_id;
        self.selection = None;
        self.pending = false;
        self.add_grid_lines();
        Ok(())
    }

    /// Swap the document without touching the history. The next undo or
    /// redo notices the foreign lineage and restarts the history from the
    /// current state.
    pub fn replace_document(&mut self, document: Document) -> Result<(), EditError> {
        self.live()?;
        self.document.replace(document);
        let synthesized = self.enforcer.ensure_all_present(&mut self.document);
        self.document.drain_events();
        self.push_synthesized(&synthesized);
        self.pending = false;
        self.add_grid_lines();
        self.fix_selection();
        Ok(())
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Build the save payload for the current state. Pending edits are
    /// committed first; nothing else changes.
    pub fn prepare_save(
        &mut self,
        name: impl Into<String>,
        course_id: Option<String>,
        is_default: bool,
    ) -> Result<SaveRequest, EditError> {
        self.live()?;
        self.commit()?;
        let payload = TemplatePayload {
            name: name.into(),
            course_id,
            is_default,
            canvas_width: self.document.canvas_width(),
            canvas_height: self.document.canvas_height(),
            document_json: codec::to_json_string(&self.document)?,
            preview_image: cert_render::preview_data_url(&self.document, self.config.thumbnail_scale)?,
            orientation: self.document.orientation(),
        };
        Ok(SaveRequest {
            ticket: SaveTicket {
                token: self.token,
                template_id: self.template_id.clone(),
            },
            payload,
        })
    }

    /// Apply a finished save. Never touches the document or history.
    pub fn acknowledge_save(&mut self, outcome: SaveOutcome) -> SaveAck {
        if self.disposed || outcome.ticket.token != self.token {
            log::debug!("ignoring save result for a closed or switched session");
            return SaveAck::Stale;
        }
        match outcome.result {
            Ok(template) => {
                log::info!("saved template {}", template.id);
                self.template_id = Some(template.id.clone());
                SaveAck::Applied(template.id)
            }
            Err(err) => SaveAck::Failed(err),
        }
    }

    // ─── Shortcuts & lifecycle ───────────────────────────────────────────

    pub fn perform(&mut self, action: ShortcutAction) -> Result<Performed, EditError> {
        self.live()?;
        let changed = match action {
            ShortcutAction::Undo => matches!(self.undo()?, HistoryStep::Restored { .. }),
            ShortcutAction::Redo => matches!(self.redo()?, HistoryStep::Restored { .. }),
            ShortcutAction::Save => return Ok(Performed::SaveRequested),
            ShortcutAction::ToggleGrid => {
                self.toggle_grid()?;
                true
            }
            ShortcutAction::ClearAll => self.clear()? > 0,
            ShortcutAction::Deselect => {
                let had = self.selection.is_some();
                self.deselect()?;
                had
            }
            _ if self.selection.is_none() => false,
            ShortcutAction::Delete => {
                self.delete_selected()?;
                true
            }
            ShortcutAction::Duplicate => {
                self.duplicate_selected()?;
                true
            }
            ShortcutAction::Nudge { dx, dy, large } => {
                self.nudge(dx, dy, large)?;
                true
            }
            ShortcutAction::SendBackward => self.reorder_selected(ZOrder::Backward)?,
            ShortcutAction::BringForward => self.reorder_selected(ZOrder::Forward)?,
            ShortcutAction::SendToBack => self.reorder_selected(ZOrder::Back)?,
            ShortcutAction::BringToFront => self.reorder_selected(ZOrder::Front)?,
        };
        Ok(if changed { Performed::Applied } else { Performed::Unchanged })
    }

    /// Close the session. History is discarded; every later call fails with
    /// [`EditError::Disposed`] and late save results are ignored.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.history = HistoryManager::new(1);
        self.selection = None;
        self.pending = false;
        log::debug!("editing session closed");
    }
}

fn finite(property: &'static str, value: f64) -> Result<(), EditError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EditError::InvalidValue { property, value })
    }
}

fn non_negative(property: &'static str, value: f64) -> Result<(), EditError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EditError::InvalidValue { property, value })
    }
}

/// Largest size with the image's aspect ratio that fits the canvas, never
/// upscaled.
fn fit_within(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (max_width.min(100.0), max_height.min(100.0));
    }
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

fn grid_lines(width: u32, height: u32, spacing: f64) -> Vec<Element> {
    let (w, h) = (width as f64, height as f64);
    let style = ShapeData::new(ShapeKind::Line).stroked(Some(GRID_COLOR), 1.0);
    let mut lines = Vec::new();
    let mut x = spacing;
    while x < w {
        lines.push(Element::shape(style.clone(), x, 0.0, 0.0, h).into_ephemeral());
        x += spacing;
    }
    let mut y = spacing;
    while y < h {
        lines.push(Element::shape(style.clone(), 0.0, y, w, 0.0).into_ephemeral());
        y += spacing;
    }
    lines
}
