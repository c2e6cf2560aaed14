//! Integration tests: editing session + history.
//!
//! Drives `EditorSession` the way the canvas host does and checks what ends
//! up in the history.

use cert_core::codec;
use cert_core::id::ElementId;
use cert_core::model::*;
use cert_core::{ModelError, Notice};
use cert_editor::{EditError, EditMutation, EditorConfig, EditorSession, HistoryStep, PropertyEdit};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn session() -> EditorSession {
    EditorSession::new(EditorConfig::default()).unwrap()
}

fn rect(x: f64) -> Element {
    Element::shape(ShapeData::new(ShapeKind::Rect).filled(Color::rgb(0, 128, 0)), x, 10.0, 30.0, 30.0)
}

fn insert(s: &mut EditorSession, element: Element) -> ElementId {
    s.apply(EditMutation::Insert(element)).unwrap().created.unwrap()
}

fn placeholder(s: &EditorSession, role: PlaceholderRole) -> ElementId {
    s.document().element_with_role(role).unwrap().id
}

fn json(s: &EditorSession) -> serde_json::Value {
    codec::to_value(s.document()).unwrap()
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn fresh_template_scenario() {
    let s = session();
    for role in PlaceholderRole::ALL {
        assert_eq!(s.document().role_count(role), 1, "{role} missing");
    }
    assert_eq!(s.history().len(), 1);
    assert!(!s.history().can_undo());
    assert!(!s.history().can_redo());
    assert!(s.selection().is_none());
}

#[test]
fn coalesced_drag_checkpoints_once_on_commit() {
    let mut s = session();
    let id = insert(&mut s, rect(0.0));
    s.select(id).unwrap();
    let entries = s.history().len();

    for _ in 0..3 {
        s.move_selected(5.0, 2.0).unwrap();
    }
    assert_eq!(s.history().len(), entries, "drag steps must not checkpoint");
    assert!(s.has_pending_changes());

    assert!(s.commit().unwrap());
    assert_eq!(s.history().len(), entries + 1);
    assert!(!s.commit().unwrap(), "second commit has nothing to record");

    s.undo().unwrap();
    assert_eq!(s.document().get(id).unwrap().x, 0.0);
}

#[test]
fn history_keeps_the_fifty_newest_in_order() {
    let mut s = session();
    let base = s.document().len();
    for i in 0..60 {
        insert(&mut s, rect(i as f64));
    }
    assert_eq!(s.history().len(), 50);

    let mut expected = base + 60;
    loop {
        assert_eq!(s.document().len(), expected);
        match s.undo().unwrap() {
            HistoryStep::Restored { synthesized } => {
                assert!(synthesized.is_empty());
                expected -= 1;
            }
            HistoryStep::AtBoundary => break,
            HistoryStep::Reseeded => panic!("history must not reseed"),
        }
    }
    // Oldest surviving entry is the state after the 11th insert.
    assert_eq!(s.document().len(), base + 11);
    let xs: Vec<f64> = s
        .document()
        .elements()
        .iter()
        .filter(|e| !e.is_placeholder())
        .filter_map(|e| matches!(e.kind, ElementKind::Shape(ref d) if d.fill == Some(Color::rgb(0, 128, 0))).then_some(e.x))
        .collect();
    assert_eq!(xs, (0..11).map(|i| i as f64).collect::<Vec<_>>());
}

#[test]
fn undo_redo_symmetry() {
    let mut s = session();
    let mut states = vec![json(&s)];

    let a = insert(&mut s, rect(0.0));
    states.push(json(&s));

    s.select(a).unwrap();
    s.move_selected(40.0, 0.0).unwrap();
    s.commit().unwrap();
    states.push(json(&s));

    s.set_property(PropertyEdit::Fill(Some(Color::rgb(200, 0, 0)))).unwrap();
    s.commit().unwrap();
    states.push(json(&s));

    let title = placeholder(&s, PlaceholderRole::CourseTitle);
    s.select(title).unwrap();
    s.set_property(PropertyEdit::FontSize(40.0)).unwrap();
    s.deselect().unwrap();
    states.push(json(&s));

    s.set_orientation(Orientation::Portrait).unwrap();
    states.push(json(&s));

    for expected in states.iter().rev().skip(1) {
        assert!(matches!(s.undo().unwrap(), HistoryStep::Restored { .. }));
        assert_eq!(&json(&s), expected);
    }
    assert_eq!(s.undo().unwrap(), HistoryStep::AtBoundary);

    for expected in states.iter().skip(1) {
        assert!(matches!(s.redo().unwrap(), HistoryStep::Restored { .. }));
        assert_eq!(&json(&s), expected);
    }
    assert_eq!(s.redo().unwrap(), HistoryStep::AtBoundary);
}

#[test]
fn uncommitted_changes_are_committed_before_undo() {
    let mut s = session();
    let id = insert(&mut s, rect(0.0));
    s.select(id).unwrap();
    s.move_selected(10.0, 0.0).unwrap();

    s.undo().unwrap();
    assert_eq!(s.document().get(id).unwrap().x, 0.0);
    s.redo().unwrap();
    assert_eq!(s.document().get(id).unwrap().x, 10.0);
}

#[derive(Debug, Clone)]
enum Gesture {
    Insert(f64),
    DragLast(f64),
    Background(u8, u8, u8),
}

fn gesture() -> impl Strategy<Value = Gesture> {
    prop_oneof![
        (-500.0..500.0f64).prop_map(Gesture::Insert),
        (1.0..80.0f64).prop_map(Gesture::DragLast),
        any::<(u8, u8, u8)>().prop_map(|(r, g, b)| Gesture::Background(r, g, b)),
    ]
}

proptest! {
    #[test]
    fn n_undos_then_n_redos_walk_the_same_states(gestures in prop::collection::vec(gesture(), 1..30)) {
        let mut s = session();
        let mut states = vec![json(&s)];
        let mut last = None;
        for step in gestures {
            let recorded = match step {
                Gesture::Insert(x) => {
                    last = Some(insert(&mut s, rect(x)));
                    true
                }
                Gesture::DragLast(dx) => match last {
                    Some(id) => {
                        s.select(id).unwrap();
                        s.move_selected(dx, 0.0).unwrap();
                        s.commit().unwrap()
                    }
                    None => false,
                },
                Gesture::Background(r, g, b) => {
                    s.set_background(Color::rgb(r, g, b)).unwrap();
                    s.commit().unwrap()
                }
            };
            if recorded {
                states.push(json(&s));
            }
        }
        prop_assert_eq!(s.history().len(), states.len());

        for expected in states.iter().rev().skip(1) {
            let restored = matches!(s.undo().unwrap(), HistoryStep::Restored { .. });
            prop_assert!(restored);
            prop_assert_eq!(&json(&s), expected);
        }
        prop_assert_eq!(s.undo().unwrap(), HistoryStep::AtBoundary);

        for expected in states.iter().skip(1) {
            let restored = matches!(s.redo().unwrap(), HistoryStep::Restored { .. });
            prop_assert!(restored);
            prop_assert_eq!(&json(&s), expected);
        }
        prop_assert_eq!(s.redo().unwrap(), HistoryStep::AtBoundary);
    }
}

// ─── Placeholder protection ─────────────────────────────────────────────

#[test]
fn placeholders_cannot_be_deleted_or_duplicated() {
    let mut s = session();
    let name = placeholder(&s, PlaceholderRole::StudentName);
    s.select(name).unwrap();
    let before = json(&s);
    let entries = s.history().len();

    assert!(matches!(
        s.delete_selected(),
        Err(EditError::Model(ModelError::CannotRemovePlaceholder(PlaceholderRole::StudentName)))
    ));
    assert!(matches!(
        s.duplicate_selected(),
        Err(EditError::Model(ModelError::CannotDuplicatePlaceholder(_)))
    ));
    assert_eq!(json(&s), before);
    assert_eq!(s.history().len(), entries);
    assert_eq!(s.selection(), Some(name));
}

#[test]
fn placeholder_selection_is_locked_but_editable() {
    let mut s = session();
    let date = placeholder(&s, PlaceholderRole::IssueDate);
    s.select(date).unwrap();
    let view = s.selected_properties().unwrap();
    assert_eq!(view.role, Some(PlaceholderRole::IssueDate));
    assert!(view.text.is_some());

    s.set_property(PropertyEdit::X(12.0)).unwrap();
    assert_eq!(s.document().get(date).unwrap().x, 12.0);
}

#[test]
fn clear_keeps_placeholders_where_they_were() {
    let mut s = session();
    insert(&mut s, rect(0.0));
    insert(&mut s, rect(50.0));
    let qr = placeholder(&s, PlaceholderRole::QrCode);
    s.select(qr).unwrap();
    s.move_selected(-100.0, -30.0).unwrap();
    s.commit().unwrap();
    let moved = s.document().get(qr).unwrap().clone();
    let before = json(&s);
    let entries = s.history().len();

    let removed = s.clear().unwrap();
    assert!(removed >= 2);
    assert_eq!(s.history().len(), entries + 1, "clear is one checkpoint");
    assert_eq!(s.document().len(), PlaceholderRole::ALL.len());
    assert_eq!(s.document().get(qr), Some(&moved));
    assert!(s.take_notices().is_empty());

    s.undo().unwrap();
    assert_eq!(json(&s), before);
}

#[test]
fn duplicate_selects_the_offset_copy() {
    let mut s = session();
    let id = insert(&mut s, rect(100.0));
    s.select(id).unwrap();
    let copy = s.duplicate_selected().unwrap();
    assert_ne!(copy, id);
    assert_eq!(s.selection(), Some(copy));
    let offset = s.config().duplicate_offset;
    let e = s.document().get(copy).unwrap();
    assert_eq!((e.x, e.y), (100.0 + offset, 10.0 + offset));
    assert_eq!(s.document().elements().last().unwrap().id, copy);
}

#[test]
fn nudge_commits_immediately() {
    let mut s = session();
    let id = insert(&mut s, rect(0.0));
    s.select(id).unwrap();
    let entries = s.history().len();

    s.nudge(1, 0, false).unwrap();
    s.nudge(0, 1, true).unwrap();
    assert_eq!(s.history().len(), entries + 2);
    let e = s.document().get(id).unwrap();
    assert_eq!((e.x, e.y), (1.0, 20.0));
}

// ─── Grid ───────────────────────────────────────────────────────────────

#[test]
fn grid_is_never_checkpointed_or_serialized() {
    let mut s = session();
    let before = json(&s);
    let entries = s.history().len();

    assert!(s.toggle_grid().unwrap());
    assert!(s.document().elements().iter().any(|e| e.ephemeral));
    assert_eq!(s.history().len(), entries);
    assert!(!s.has_pending_changes());
    assert_eq!(json(&s), before);

    // Survives undo/redo.
    insert(&mut s, rect(0.0));
    s.undo().unwrap();
    assert!(s.document().elements().iter().any(|e| e.ephemeral));
    assert_eq!(json(&s), before);

    assert!(!s.toggle_grid().unwrap());
    assert!(s.document().elements().iter().all(|e| !e.ephemeral));
}

#[test]
fn grid_follows_canvas_resize() {
    let mut s = session();
    s.toggle_grid().unwrap();
    s.set_orientation(Orientation::Portrait).unwrap();
    let (w, h) = Orientation::Portrait.dimensions();
    let vertical = s
        .document()
        .elements()
        .iter()
        .filter(|e| e.ephemeral && e.width == 0.0)
        .count();
    let spacing = s.config().grid_spacing;
    assert_eq!(vertical, ((w as f64 - 1.0) / spacing).floor() as usize);
    assert!(s.document().elements().iter().filter(|e| e.ephemeral).all(|e| e.height <= h as f64));
}

// ─── External replacement ───────────────────────────────────────────────

#[test]
fn replaced_document_reseeds_history() {
    let mut s = session();
    insert(&mut s, rect(0.0));
    assert!(s.history().can_undo());

    s.replace_document(Document::new(600, 400).unwrap()).unwrap();
    // Missing placeholders are synthesized and announced.
    let restored: Vec<PlaceholderRole> = s
        .take_notices()
        .into_iter()
        .map(|Notice::PlaceholderRestored { role, .. }| role)
        .collect();
    assert_eq!(restored, PlaceholderRole::ALL.to_vec());

    let current = json(&s);
    assert_eq!(s.undo().unwrap(), HistoryStep::Reseeded);
    assert_eq!(json(&s), current);
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.undo().unwrap(), HistoryStep::AtBoundary);
}

#[test]
fn open_json_repairs_and_restarts_history() {
    let mut s = session();
    insert(&mut s, rect(0.0));
    let token = s.token();

    let warnings = s
        .open_json(r#"{ "canvasWidth": 800, "canvasHeight": 600, "elements": [
            { "kind": "text", "role": "STUDENT_NAME", "text": "{{STUDENT_NAME}}", "x": 1, "y": 2 },
            { "kind": "sparkle" }
        ] }"#)
        .unwrap();
    assert!(!warnings.is_empty());
    assert_ne!(s.token(), token);
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.document().canvas_width(), 800);
    for role in PlaceholderRole::ALL {
        assert_eq!(s.document().role_count(role), 1);
    }
}

#[test]
fn disposed_session_refuses_everything() {
    let mut s = session();
    let id = insert(&mut s, rect(0.0));
    s.dispose();
    assert!(s.is_disposed());
    assert!(matches!(s.select(id), Err(EditError::Disposed)));
    assert!(matches!(s.undo(), Err(EditError::Disposed)));
    assert!(matches!(s.apply(EditMutation::Clear), Err(EditError::Disposed)));
    assert!(matches!(s.toggle_grid(), Err(EditError::Disposed)));
}
