//! WASM bridge for erdraw: exposes the diagram engine to the browser.
//!
//! Compiled via `wasm-pack build --target web`. The canvas owns its `<svg>`
//! element and repaints it eagerly; every handler reports what it repainted.

mod dom;
mod service;

pub use dom::{DomSurface, LocalStoragePreferences, WindowPrompt};
pub use service::StagedService;

use erdraw_core::{ElementId, Point, SidebarState, SurfaceOrigin, SurfaceSize};
use erdraw_editor::{
    Button, DiagramEditor, DiagramSession, DrawingMode, EditorConfig, EditorEvent, InputEvent,
    Mode, Modifiers, Repaint, Response,
};
use erdraw_render::{Painter, Theme};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::Element;

/// The main WASM-facing canvas controller.
///
/// All interaction from the page goes through this struct. Remote calls are
/// made by the page; their replies come back through the `receive_*` and
/// `*_saved` methods.
#[wasm_bindgen]
pub struct ErdCanvas {
    editor: DiagramEditor,
    session: DiagramSession<StagedService, LocalStoragePreferences>,
    surface: DomSurface,
    painter: Painter,
}

#[derive(Serialize)]
struct Outcome<'a> {
    consumed: bool,
    events: &'a [EditorEvent],
    repaint: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Status<'a> {
    mode: &'static str,
    loading: bool,
    error: Option<&'a str>,
    notification: Option<&'a erdraw_editor::Notification>,
    drawing_mode: Option<DrawingMode>,
    selection: Option<ElementId>,
    can_undo: bool,
    can_redo: bool,
}

#[derive(Serialize)]
struct HistoryItem<'a> {
    label: &'a str,
    timestamp: f64,
}

#[wasm_bindgen]
impl ErdCanvas {
    /// Create a canvas drawing into `root`, an `<svg>` element.
    #[wasm_bindgen(constructor)]
    pub fn new(root: Element) -> Result<ErdCanvas, JsValue> {
        dom::install_hooks();

        let config = EditorConfig::default();
        let painter = Painter::new(
            Theme::light(),
            config.metrics,
            config.interaction.handle_size,
        );
        let editor = DiagramEditor::new(config)
            .with_prompt(Box::new(WindowPrompt))
            .with_clock(Box::new(js_sys::Date::now));
        let surface = DomSurface::new(root).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let mut canvas = Self {
            editor,
            session: DiagramSession::new(StagedService::default(), LocalStoragePreferences::new()),
            surface,
            painter,
        };
        canvas.render();
        Ok(canvas)
    }

    /// Bounding rectangle of the `<svg>` in client pixels.
    pub fn set_surface(&mut self, left: f64, top: f64, width: f64, height: f64) {
        self.editor
            .set_surface(SurfaceOrigin { left, top }, SurfaceSize { width, height });
    }

    /// Full repaint, regardless of what changed.
    pub fn render(&mut self) {
        if let Err(err) = self.editor.paint(&mut self.surface, &self.painter) {
            log::error!("canvas: paint failed: {err}");
        }
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.painter.theme = if is_dark { Theme::dark() } else { Theme::light() };
        self.render();
    }

    pub fn export_svg(&mut self) -> Result<String, JsValue> {
        self.editor
            .export_svg(&self.painter)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ─── Pointer & keyboard ──────────────────────────────────────────────

    /// Handle pointer down. Returns `{"consumed","events","repaint"}`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.dispatch(InputEvent::PointerDown {
            at: Point::new(x, y),
            button: Button::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.dispatch(InputEvent::PointerMove {
            at: Point::new(x, y),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.dispatch(InputEvent::PointerUp {
            at: Point::new(x, y),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    /// Pointer capture lost or the window blurred mid-gesture.
    pub fn handle_pointer_cancel(&mut self) -> String {
        self.dispatch(InputEvent::PointerCancel)
    }

    pub fn handle_click(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::Click {
            at: Point::new(x, y),
        })
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::DoubleClick {
            at: Point::new(x, y),
        })
    }

    pub fn handle_context_menu(&mut self, x: f64, y: f64) -> String {
        self.dispatch(InputEvent::ContextMenu {
            at: Point::new(x, y),
        })
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> String {
        self.dispatch(InputEvent::Wheel {
            at: Point::new(x, y),
            delta_y,
        })
    }

    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        self.dispatch(InputEvent::Key {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// `"rectangle"`, `"text"`, or anything else to disarm.
    pub fn set_drawing_mode(&mut self, name: &str) {
        let mode = match name {
            "rectangle" => Some(DrawingMode::Rectangle),
            "text" => Some(DrawingMode::Text),
            _ => None,
        };
        self.editor.set_drawing_mode(mode);
        self.flush();
    }

    pub fn undo(&mut self) -> bool {
        let done = self.editor.undo();
        self.flush();
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.editor.redo();
        self.flush();
        done
    }

    pub fn zoom_to_fit(&mut self) {
        self.editor.zoom_to_fit();
        self.flush();
    }

    pub fn delete_annotation(&mut self, id: &str) -> bool {
        let done = self.editor.delete_annotation(ElementId::intern(id));
        self.flush();
        done
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn get_layers_json(&self) -> String {
        serde_json::to_string(&self.editor.state().layout.layers).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn bring_forward(&mut self, layer: &str) -> bool {
        let done = self.editor.bring_forward(ElementId::intern(layer));
        self.flush();
        done
    }

    pub fn send_backward(&mut self, layer: &str) -> bool {
        let done = self.editor.send_backward(ElementId::intern(layer));
        self.flush();
        done
    }

    pub fn bring_to_front(&mut self, layer: &str) -> bool {
        let done = self.editor.bring_to_front(ElementId::intern(layer));
        self.flush();
        done
    }

    pub fn send_to_back(&mut self, layer: &str) -> bool {
        let done = self.editor.send_to_back(ElementId::intern(layer));
        self.flush();
        done
    }

    pub fn set_layer_visible(&mut self, layer: &str, visible: bool) -> bool {
        let done = self.editor.set_layer_visible(ElementId::intern(layer), visible);
        self.flush();
        done
    }

    pub fn rename_layer(&mut self, layer: &str, name: &str) -> bool {
        let done = self.editor.rename_layer(ElementId::intern(layer), name);
        self.flush();
        done
    }

    /// Apply the layer panel's order, a JSON array of layer ids front to back.
    pub fn apply_layer_order(&mut self, json: &str) -> bool {
        let ids: Vec<ElementId> = match serde_json::from_str(json) {
            Ok(ids) => ids,
            Err(err) => {
                log::warn!("canvas: bad layer order: {err}");
                return false;
            }
        };
        let done = self.editor.apply_layer_order(&ids);
        self.flush();
        done
    }

    // ─── Layout document ─────────────────────────────────────────────────

    pub fn get_layout_json(&self) -> String {
        self.editor.layout_json()
    }

    /// Replace the layout. Returns `false` if the JSON does not parse.
    pub fn set_layout_json(&mut self, json: &str) -> bool {
        let result = self.editor.set_layout_json(json);
        self.flush();
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("canvas: rejected layout: {err}");
                false
            }
        }
    }

    // ─── Server replies ──────────────────────────────────────────────────

    /// Reply to `GET diagram`. Returns `true` if the diagram was loaded.
    pub fn receive_diagram(&mut self, status: u16, body: String) -> bool {
        self.session.service_mut().stage(status, body);
        let ok = self.session.load(&mut self.editor).is_ok();
        self.flush();
        ok
    }

    /// Reply to a DDL request for `table`. `None` on failure; the failure is
    /// surfaced as a notification.
    pub fn receive_table_ddl(&mut self, table: &str, status: u16, body: String) -> Option<String> {
        self.session.service_mut().stage(status, body);
        let ddl = self.session.table_ddl(&mut self.editor, table).ok();
        self.flush();
        ddl
    }

    /// Reply to `PUT layout`, sent with the body from `get_layout_json`.
    pub fn layout_saved(&mut self, status: u16, body: String) -> bool {
        self.session.service_mut().stage(status, body);
        let ok = self.session.save(&mut self.editor).is_ok();
        self.flush();
        ok
    }

    pub fn receive_reverse_engineered(&mut self, status: u16, body: String) -> bool {
        self.session.service_mut().stage(status, body);
        let ok = self.session.reverse_engineer(&mut self.editor).is_ok();
        self.flush();
        ok
    }

    pub fn set_sidebar(&mut self, visible: bool, width: f64) {
        self.session
            .set_sidebar(&mut self.editor, SidebarState { visible, width });
        self.flush();
    }

    // ─── Inspection ──────────────────────────────────────────────────────

    /// Loading flag, error, notification, armed tool, selection and undo
    /// availability as JSON.
    pub fn get_status_json(&self) -> String {
        let state = self.editor.state();
        let history = self.editor.store().history();
        let status = Status {
            mode: mode_name(self.editor.mode()),
            loading: state.loading,
            error: state.error.as_deref(),
            notification: state.notification.as_ref(),
            drawing_mode: state.drawing_mode,
            selection: state.selection,
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
        };
        serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string())
    }

    /// `{"cursor":n,"entries":[{"label","timestamp"}]}`, oldest first.
    pub fn get_history_json(&self) -> String {
        let history = self.editor.store().history();
        let entries: Vec<HistoryItem<'_>> = history
            .entries()
            .map(|e| HistoryItem {
                label: &e.label,
                timestamp: e.timestamp,
            })
            .collect();
        serde_json::json!({ "cursor": history.cursor(), "entries": entries }).to_string()
    }
}

impl ErdCanvas {
    fn dispatch(&mut self, event: InputEvent) -> String {
        let response = self.editor.handle(&event);
        let repaint = self.flush();
        outcome_json(&response, repaint)
    }

    /// Bring the `<svg>` up to date with whatever changed since the last call.
    fn flush(&mut self) -> Repaint {
        let repaint = self.editor.refresh();
        let result = match repaint {
            Repaint::Full => self.editor.paint(&mut self.surface, &self.painter).map(drop),
            Repaint::Viewport => self.editor.apply_viewport(&mut self.surface),
            Repaint::None => Ok(()),
        };
        if let Err(err) = result {
            log::error!("canvas: repaint failed: {err}");
        }
        repaint
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn repaint_name(repaint: Repaint) -> &'static str {
    match repaint {
        Repaint::None => "none",
        Repaint::Viewport => "viewport",
        Repaint::Full => "full",
    }
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Default => "default",
        Mode::Panning => "panning",
        Mode::DraggingEntity => "draggingEntity",
        Mode::DraggingRectangle => "draggingRectangle",
        Mode::DraggingText => "draggingText",
        Mode::ResizingRectangle => "resizingRectangle",
        Mode::CreatingRectangle => "creatingRectangle",
        Mode::CreatingText => "creatingText",
    }
}

fn outcome_json(response: &Response, repaint: Repaint) -> String {
    let outcome = Outcome {
        consumed: response.consumed,
        events: &response.events,
        repaint: repaint_name(repaint),
    };
    serde_json::to_string(&outcome)
        .unwrap_or_else(|_| r#"{"consumed":false,"events":[],"repaint":"none"}"#.to_string())
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a layout document. Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_layout(json: &str) -> String {
    match erdraw_core::LayoutDocument::from_json(json) {
        Ok(_) => r#"{"ok":true}"#.to_string(),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}
