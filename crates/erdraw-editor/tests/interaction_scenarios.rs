//! End-to-end pointer, wheel and keyboard scenarios against a loaded diagram.
//!
//! The surface sits at the client origin and the viewport starts at identity,
//! so screen and canonical coordinates coincide unless a test pans or zooms.

use erdraw_core::viewport::{canonical_to_screen, screen_to_canonical};
use erdraw_core::{Bounds, ElementId, Point};
use erdraw_editor::{
    Button, ContextTarget, DiagramEditor, DiagramPayload, DrawingMode, EditorEvent, InputEvent,
    Mode, Modifiers, Prompt, Response,
};
use erdraw_render::{ResizeHandle, SceneItem};
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

type Asked = Rc<RefCell<Vec<(String, String)>>>;

struct ScriptedPrompt {
    answers: VecDeque<Option<String>>,
    asked: Asked,
}

impl Prompt for ScriptedPrompt {
    fn prompt(&mut self, message: &str, default: &str) -> Option<String> {
        self.asked
            .borrow_mut()
            .push((message.to_string(), default.to_string()));
        self.answers.pop_front().flatten()
    }
}

fn payload() -> DiagramPayload {
    serde_json::from_str(include_str!("fixtures/warehouse.json")).unwrap()
}

fn editor_with(answers: &[Option<&str>]) -> (DiagramEditor, Asked) {
    let asked: Asked = Rc::default();
    let prompt = ScriptedPrompt {
        answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
        asked: Rc::clone(&asked),
    };
    let mut editor = DiagramEditor::default()
        .with_clock(Box::new(|| 1_700_000_000_000.0))
        .with_prompt(Box::new(prompt));
    let p = payload();
    editor.load(p.diagram, p.layout.unwrap_or_default());
    (editor, asked)
}

fn editor() -> DiagramEditor {
    editor_with(&[]).0
}

fn down(e: &mut DiagramEditor, x: f64, y: f64) -> Response {
    e.handle(&InputEvent::PointerDown {
        at: Point::new(x, y),
        button: Button::Primary,
        modifiers: Modifiers::default(),
    })
}

fn mv(e: &mut DiagramEditor, x: f64, y: f64) -> Response {
    e.handle(&InputEvent::PointerMove {
        at: Point::new(x, y),
        modifiers: Modifiers::default(),
    })
}

fn up(e: &mut DiagramEditor, x: f64, y: f64) -> Response {
    e.handle(&InputEvent::PointerUp {
        at: Point::new(x, y),
        modifiers: Modifiers::default(),
    })
}

fn key(e: &mut DiagramEditor, key: &str, modifiers: Modifiers) -> Response {
    e.handle(&InputEvent::Key {
        key: key.to_string(),
        modifiers,
    })
}

const CTRL: Modifiers = Modifiers {
    shift: false,
    ctrl: true,
    alt: false,
    meta: false,
};

fn note() -> ElementId {
    ElementId::intern("rect_note")
}

fn note_bounds(e: &DiagramEditor) -> Bounds {
    e.state().layout.rect(note()).unwrap().bounds()
}

fn select_note(e: &mut DiagramEditor) {
    down(e, 150.0, 450.0);
    up(e, 150.0, 450.0);
    assert_eq!(e.state().selection, Some(note()));
}

// ─── Pan & zoom ──────────────────────────────────────────────────────────

#[test]
fn background_drag_pans_by_pointer_delta() {
    let mut e = editor();
    down(&mut e, 400.0, 300.0);
    assert_eq!(e.mode(), Mode::Panning);

    mv(&mut e, 402.0, 301.0);
    assert_eq!(e.state().viewport.pan_x, 0.0, "below the drag threshold");

    mv(&mut e, 500.0, 350.0);
    up(&mut e, 500.0, 350.0);
    let vp = e.state().viewport;
    assert_eq!((vp.pan_x, vp.pan_y), (100.0, 50.0));
    assert_eq!(e.mode(), Mode::Default);
    assert!(e.store().history().is_empty());
}

#[test]
fn middle_button_pans_even_over_an_entity() {
    let mut e = editor();
    e.handle(&InputEvent::PointerDown {
        at: Point::new(150.0, 120.0),
        button: Button::Middle,
        modifiers: Modifiers::default(),
    });
    mv(&mut e, 170.0, 130.0);
    up(&mut e, 170.0, 130.0);
    let vp = e.state().viewport;
    assert_eq!((vp.pan_x, vp.pan_y), (20.0, 10.0));
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(100.0, 100.0)));
}

#[test]
fn wheel_steps_scale_and_keeps_cursor_point() {
    let mut e = editor();
    let cursor = Point::new(300.0, 200.0);
    let origin = e.surface_origin();
    let before = screen_to_canonical(cursor, origin, &e.state().viewport);

    e.handle(&InputEvent::Wheel {
        at: cursor,
        delta_y: -100.0,
    });
    let vp = e.state().viewport;
    assert!((vp.scale - 1.1).abs() < 1e-12);
    let after = screen_to_canonical(cursor, origin, &vp);
    assert!((before.x - after.x).abs() < 1e-9 && (before.y - after.y).abs() < 1e-9);

    let mut e = editor();
    e.handle(&InputEvent::Wheel {
        at: cursor,
        delta_y: 100.0,
    });
    assert!((e.state().viewport.scale - 0.9).abs() < 1e-12);
}

#[test]
fn wheel_scale_stays_in_range() {
    let mut e = editor();
    for _ in 0..60 {
        e.handle(&InputEvent::Wheel {
            at: Point::new(10.0, 10.0),
            delta_y: -1.0,
        });
        let s = e.state().viewport.scale;
        assert!((0.1..=5.0).contains(&s), "{s}");
    }
    for _ in 0..120 {
        e.handle(&InputEvent::Wheel {
            at: Point::new(10.0, 10.0),
            delta_y: 1.0,
        });
        let s = e.state().viewport.scale;
        assert!((0.1..=5.0).contains(&s), "{s}");
    }
    assert_eq!(e.state().viewport.scale, 0.1);
}

#[test]
fn zoom_to_fit_brings_all_content_on_screen() {
    let mut e = editor();
    e.handle(&InputEvent::Wheel {
        at: Point::new(0.0, 0.0),
        delta_y: -1.0,
    });
    key(&mut e, "0", CTRL);

    let content = e.scene().content_bounds().unwrap();
    let vp = e.state().viewport;
    let origin = e.surface_origin();
    for corner in [
        Point::new(content.x, content.y),
        Point::new(content.right(), content.bottom()),
    ] {
        let s = canonical_to_screen(corner, origin, &vp);
        assert!(s.x >= 39.0 && s.x <= 761.0, "{s:?}");
        assert!(s.y >= 39.0 && s.y <= 561.0, "{s:?}");
    }
}

// ─── Click vs drag ───────────────────────────────────────────────────────

#[test]
fn short_travel_is_a_click() {
    let mut e = editor();
    down(&mut e, 150.0, 120.0);
    assert_eq!(e.mode(), Mode::DraggingEntity);
    mv(&mut e, 153.0, 122.0);
    let r = up(&mut e, 153.0, 122.0);

    assert_eq!(
        r.events,
        vec![EditorEvent::EntityClick {
            entity: "customers".into()
        }]
    );
    assert!(!e.interaction().drag_occurred());
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(100.0, 100.0)));
    assert!(e.store().history().is_empty());

    // The host's own click for the same gesture is swallowed once.
    let r = e.handle(&InputEvent::Click {
        at: Point::new(153.0, 122.0),
    });
    assert_eq!(r, Response::default());
    let r = e.handle(&InputEvent::Click {
        at: Point::new(550.0, 120.0),
    });
    assert_eq!(
        r.events,
        vec![EditorEvent::EntityClick {
            entity: "invoices".into()
        }]
    );
}

#[test]
fn long_travel_drags_and_suppresses_click() {
    let mut e = editor();
    down(&mut e, 150.0, 120.0);
    mv(&mut e, 160.0, 120.0);
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(110.0, 100.0)));
    mv(&mut e, 200.0, 150.0);
    let r = up(&mut e, 200.0, 150.0);

    assert!(r.events.is_empty());
    assert!(e.interaction().drag_occurred());
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(150.0, 130.0)));
    assert_eq!(e.store().history().len(), 1);
    assert_eq!(
        e.handle(&InputEvent::Click {
            at: Point::new(200.0, 150.0)
        }),
        Response::default()
    );

    key(&mut e, "z", CTRL);
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(100.0, 100.0)));
    key(
        &mut e,
        "Z",
        Modifiers {
            shift: true,
            ..CTRL
        },
    );
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(150.0, 130.0)));
}

#[test]
fn dragging_an_unpositioned_entity_stores_its_position() {
    let mut e = editor();
    assert_eq!(e.state().layout.position("products"), None);
    down(&mut e, 60.0, 260.0);
    mv(&mut e, 80.0, 260.0);
    up(&mut e, 80.0, 260.0);
    assert_eq!(e.state().layout.position("products"), Some(Point::new(70.0, 250.0)));
}

#[test]
fn relationship_click_reports_constraint() {
    let mut e = editor();
    let scene = e.scene().clone();
    let points = scene
        .items
        .iter()
        .find_map(|item| match item {
            SceneItem::Relationship { points, .. } => Some(points.clone()),
            _ => None,
        })
        .unwrap();
    let spot = points
        .windows(2)
        .map(|w| Point::new((w[0].x + w[1].x) / 2.0, (w[0].y + w[1].y) / 2.0))
        .find(|m| scene.entity_bounds.values().all(|b| !b.contains(*m)))
        .unwrap();

    down(&mut e, spot.x, spot.y);
    let r = up(&mut e, spot.x, spot.y);
    assert_eq!(
        r.events,
        vec![EditorEvent::RelationshipClick {
            index: 0,
            constraint: "fk_invoices_customer".into()
        }]
    );
}

#[test]
fn background_click_clears_selection() {
    let mut e = editor();
    select_note(&mut e);
    down(&mut e, 400.0, 300.0);
    up(&mut e, 400.0, 300.0);
    assert_eq!(e.state().selection, None);
}

// ─── Annotations ─────────────────────────────────────────────────────────

#[test]
fn dragging_a_rectangle_moves_it() {
    let mut e = editor();
    down(&mut e, 150.0, 450.0);
    assert_eq!(e.mode(), Mode::DraggingRectangle);
    mv(&mut e, 180.0, 470.0);
    up(&mut e, 180.0, 470.0);
    assert_eq!(note_bounds(&e), Bounds::new(130.0, 420.0, 200.0, 100.0));
    assert_eq!(e.state().selection, Some(note()));
    assert_eq!(e.store().history().len(), 1);
}

#[test]
fn resize_from_south_east() {
    let mut e = editor();
    select_note(&mut e);
    down(&mut e, 300.0, 500.0);
    assert_eq!(e.mode(), Mode::ResizingRectangle);
    mv(&mut e, 340.0, 530.0);
    up(&mut e, 340.0, 530.0);
    assert_eq!(note_bounds(&e), Bounds::new(100.0, 400.0, 240.0, 130.0));
}

#[test]
fn no_handle_collapses_below_minimum() {
    for handle in ResizeHandle::ALL {
        let mut e = editor();
        select_note(&mut e);
        let original = note_bounds(&e);
        let at = handle.position(&original);
        let centre = original.center();
        let to = Point::new(
            at.x + (centre.x - at.x) * 5.0,
            at.y + (centre.y - at.y) * 5.0,
        );

        down(&mut e, at.x, at.y);
        assert_eq!(e.mode(), Mode::ResizingRectangle, "{handle:?}");
        mv(&mut e, to.x, to.y);
        up(&mut e, to.x, to.y);

        let b = note_bounds(&e);
        assert!(b.width >= 20.0 && b.height >= 20.0, "{handle:?} -> {b:?}");
    }
}

#[test]
fn click_without_drag_creates_default_rectangle() {
    let mut e = editor();
    e.set_drawing_mode(Some(DrawingMode::Rectangle));
    down(&mut e, 700.0, 300.0);
    assert_eq!(e.mode(), Mode::CreatingRectangle);
    up(&mut e, 700.0, 300.0);

    let layout = &e.state().layout;
    assert_eq!(layout.rectangles.len(), 2);
    let created = layout.rectangles.last().unwrap();
    assert_eq!(created.bounds(), Bounds::new(700.0, 300.0, 100.0, 60.0));
    assert_eq!(e.state().selection, Some(created.id));
    assert_eq!(e.state().drawing_mode, None);
    let layer = layout
        .layers
        .iter()
        .find(|l| l.target == Some(created.id))
        .unwrap();
    assert_eq!(layer.name, "Rectangle 2");
    assert_eq!(e.store().history().len(), 1);

    assert!(e.undo());
    assert_eq!(e.state().layout.rectangles.len(), 1);
    assert_eq!(e.state().selection, None);
}

#[test]
fn dragged_rectangle_spans_the_gesture() {
    let mut e = editor();
    e.set_drawing_mode(Some(DrawingMode::Rectangle));
    down(&mut e, 700.0, 300.0);
    mv(&mut e, 650.0, 260.0);
    up(&mut e, 650.0, 260.0);
    let created = e.state().layout.rectangles.last().unwrap();
    assert_eq!(created.bounds(), Bounds::new(650.0, 260.0, 50.0, 40.0));
    assert_eq!(e.store().history().len(), 1);
}

#[test]
fn tiny_rectangle_is_grown_to_minimum() {
    let mut e = editor();
    e.set_drawing_mode(Some(DrawingMode::Rectangle));
    down(&mut e, 700.0, 300.0);
    mv(&mut e, 706.0, 302.0);
    up(&mut e, 706.0, 302.0);
    let created = e.state().layout.rectangles.last().unwrap();
    assert_eq!(created.bounds(), Bounds::new(700.0, 300.0, 20.0, 20.0));
}

#[test]
fn text_tool_places_prompted_text() {
    let (mut e, asked) = editor_with(&[Some("Sticky")]);
    e.set_drawing_mode(Some(DrawingMode::Text));
    down(&mut e, 800.0, 100.0);
    up(&mut e, 800.0, 100.0);
    e.handle(&InputEvent::Click {
        at: Point::new(800.0, 100.0),
    });

    assert_eq!(asked.borrow().len(), 1);
    assert_eq!(asked.borrow()[0], ("Enter text:".to_string(), String::new()));
    let text = e.state().layout.texts.last().unwrap();
    assert_eq!(text.content, "Sticky");
    assert_eq!((text.x, text.y), (800.0, 100.0));
    assert_eq!(e.state().selection, Some(text.id));
    assert_eq!(e.state().drawing_mode, None);
    assert_eq!(e.store().history().len(), 1);
}

#[test]
fn cancelled_or_blank_text_changes_nothing() {
    for answer in [None, Some("   ")] {
        let (mut e, _) = editor_with(&[answer]);
        let before = e.state().layout.clone();
        e.set_drawing_mode(Some(DrawingMode::Text));
        down(&mut e, 800.0, 100.0);
        up(&mut e, 800.0, 100.0);
        assert_eq!(e.state().layout, before);
        assert!(e.store().history().is_empty());
        assert_eq!(e.state().drawing_mode, None);
    }
}

#[test]
fn clicking_text_edits_it() {
    let (mut e, asked) = editor_with(&[Some("Invoices are final")]);
    down(&mut e, 610.0, 445.0);
    up(&mut e, 610.0, 445.0);

    assert_eq!(
        asked.borrow()[0],
        ("Edit text:".to_string(), "Invoices are immutable".to_string())
    );
    let id = ElementId::intern("text_hint");
    assert_eq!(e.state().layout.text(id).unwrap().content, "Invoices are final");
    let layer = e
        .state()
        .layout
        .layers
        .iter()
        .find(|l| l.target == Some(id))
        .unwrap();
    assert_eq!(layer.name, "Text: Invoices are final");
    assert_eq!(e.store().history().len(), 1);
}

#[test]
fn text_keeps_surrounding_whitespace() {
    let (mut e, _) = editor_with(&[Some("  padded ")]);
    e.set_drawing_mode(Some(DrawingMode::Text));
    down(&mut e, 800.0, 100.0);
    up(&mut e, 800.0, 100.0);
    assert_eq!(e.state().layout.texts.last().unwrap().content, "  padded ");

    let (mut e, _) = editor_with(&[Some("  padded ")]);
    down(&mut e, 610.0, 445.0);
    up(&mut e, 610.0, 445.0);
    let id = ElementId::intern("text_hint");
    assert_eq!(e.state().layout.text(id).unwrap().content, "  padded ");
    assert_eq!(e.store().history().len(), 1);
}

fn click_text(e: &mut DiagramEditor) {
    down(e, 610.0, 445.0);
    up(e, 610.0, 445.0);
    e.handle(&InputEvent::Click {
        at: Point::new(610.0, 445.0),
    });
}

#[test]
fn double_clicking_text_prompts_once() {
    let (mut e, asked) = editor_with(&[Some("Invoices are final"), Some("Invoices are void")]);
    click_text(&mut e);
    click_text(&mut e);
    e.handle(&InputEvent::DoubleClick {
        at: Point::new(610.0, 445.0),
    });

    assert_eq!(asked.borrow().len(), 1);
    let id = ElementId::intern("text_hint");
    assert_eq!(e.state().layout.text(id).unwrap().content, "Invoices are final");
    assert_eq!(e.store().history().len(), 1);
}

#[test]
fn later_click_on_same_text_edits_again() {
    let asked: Asked = Rc::default();
    let prompt = ScriptedPrompt {
        answers: [Some("first".to_string()), Some("second".to_string())].into(),
        asked: Rc::clone(&asked),
    };
    let now = Rc::new(Cell::new(1_700_000_000_000.0));
    let clock = Rc::clone(&now);
    let mut e = DiagramEditor::default()
        .with_clock(Box::new(move || clock.get()))
        .with_prompt(Box::new(prompt));
    let p = payload();
    e.load(p.diagram, p.layout.unwrap_or_default());

    click_text(&mut e);
    now.set(now.get() + 2_000.0);
    click_text(&mut e);

    assert_eq!(asked.borrow().len(), 2);
    let id = ElementId::intern("text_hint");
    assert_eq!(e.state().layout.text(id).unwrap().content, "second");
}

#[test]
fn delete_key_removes_selected_annotation() {
    let mut e = editor();
    select_note(&mut e);
    key(&mut e, "Delete", Modifiers::default());
    assert!(e.state().layout.rect(note()).is_none());
    assert!(e.state().layout.layers.iter().all(|l| l.target != Some(note())));
    assert_eq!(e.state().selection, None);

    key(&mut e, "z", CTRL);
    assert!(e.state().layout.rect(note()).is_some());
}

// ─── Hover, menus, cancellation ──────────────────────────────────────────

#[test]
fn hover_highlights_neighbourhood() {
    let mut e = editor();
    mv(&mut e, 150.0, 120.0);
    let h = &e.state().highlight;
    assert_eq!(
        h.entities.iter().cloned().collect::<Vec<_>>(),
        vec!["customers", "invoices"]
    );
    assert_eq!(h.relationships.iter().copied().collect::<Vec<_>>(), vec![0]);

    mv(&mut e, 400.0, 300.0);
    assert!(e.state().highlight.is_empty());
}

#[test]
fn context_menu_and_double_click_resolve_targets() {
    let mut e = editor();
    let r = e.handle(&InputEvent::ContextMenu {
        at: Point::new(150.0, 120.0),
    });
    assert_eq!(
        r.events,
        vec![EditorEvent::ContextMenuRequested {
            target: ContextTarget::Entity {
                name: "customers".into()
            },
            canonical: Point::new(150.0, 120.0),
            screen: Point::new(150.0, 120.0),
        }]
    );

    let r = e.handle(&InputEvent::DoubleClick {
        at: Point::new(550.0, 120.0),
    });
    assert_eq!(
        r.events,
        vec![EditorEvent::EntityDoubleClick {
            entity: "invoices".into()
        }]
    );
    let r = e.handle(&InputEvent::DoubleClick {
        at: Point::new(400.0, 300.0),
    });
    assert!(r.events.is_empty());
}

#[test]
fn escape_mid_drag_keeps_last_live_value() {
    let mut e = editor();
    down(&mut e, 150.0, 450.0);
    mv(&mut e, 200.0, 450.0);
    key(&mut e, "Escape", Modifiers::default());

    assert_eq!(e.mode(), Mode::Default);
    assert_eq!(e.state().selection, None);
    assert_eq!(note_bounds(&e).x, 150.0);
    assert_eq!(e.store().history().len(), 1);

    let r = up(&mut e, 220.0, 450.0);
    assert_eq!(r, Response::default());
    assert_eq!(note_bounds(&e).x, 150.0);
}

#[test]
fn pointer_cancel_returns_to_default() {
    let mut e = editor();
    e.set_drawing_mode(Some(DrawingMode::Rectangle));
    down(&mut e, 800.0, 100.0);
    mv(&mut e, 850.0, 150.0);
    assert_eq!(e.mode(), Mode::CreatingRectangle);
    e.handle(&InputEvent::PointerCancel);
    assert_eq!(e.mode(), Mode::Default);
    assert_eq!(e.state().drawing_mode, None);

    let count = e.state().layout.rectangles.len();
    down(&mut e, 800.0, 300.0);
    up(&mut e, 800.0, 300.0);
    assert_eq!(e.state().layout.rectangles.len(), count);
}

#[test]
fn pointer_cancel_keeps_dragged_position() {
    let mut e = editor();
    down(&mut e, 150.0, 120.0);
    mv(&mut e, 170.0, 120.0);
    e.handle(&InputEvent::PointerCancel);
    assert_eq!(e.mode(), Mode::Default);
    assert_eq!(e.state().layout.position("customers"), Some(Point::new(120.0, 100.0)));
}

#[test]
fn stray_events_are_no_ops() {
    let mut e = editor();
    let before = e.state().clone();
    assert_eq!(up(&mut e, 10.0, 10.0), Response::default());
    let r = e.handle(&InputEvent::PointerDown {
        at: Point::new(150.0, 120.0),
        button: Button::Secondary,
        modifiers: Modifiers::default(),
    });
    assert!(!r.consumed);
    assert_eq!(e.mode(), Mode::Default);
    assert_eq!(key(&mut e, "q", Modifiers::default()), Response::default());
    assert_eq!(e.state(), &before);
}
