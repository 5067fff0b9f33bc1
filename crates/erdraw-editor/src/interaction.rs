//! Pointer / wheel / keyboard interaction state machine.
//!
//! Modes form a star around [`Mode::Default`]: a pointer-down picks one
//! gesture, pointer-up (or cancel, or Escape) returns to default. At most one
//! gesture is active. A press only becomes a drag once the pointer has
//! travelled `drag_threshold` screen pixels; until then nothing moves, and a
//! release dispatches a click instead.

use crate::event::{ContextTarget, EditorEvent};
use crate::input::{Button, InputEvent, Modifiers};
use crate::session::Prompt;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::{DiagramStore, DrawingMode, StatePatch};
use erdraw_core::viewport::{centering_pan, distance, fit_scale, screen_to_canonical};
use erdraw_core::{
    Bounds, ElementId, Highlight, LayoutDocument, Point, RectAnnotation, SchemaGraph,
    SurfaceOrigin, SurfaceSize, TextAnnotation, Viewport,
};
use erdraw_render::{HitTarget, HitTolerance, ResizeHandle, Scene, hit_test};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Screen pixels a press must travel before it counts as a drag.
    pub drag_threshold: f64,
    /// Smallest width / height of a rectangle annotation.
    pub min_annotation_size: f64,
    /// Size of a rectangle created by a click without drag.
    pub default_rect_width: f64,
    pub default_rect_height: f64,
    /// Resize handle edge length, screen pixels.
    pub handle_size: f64,
    /// Relationship hit distance, screen pixels.
    pub relationship_tolerance: f64,
    /// Screen padding kept around content by zoom-to-fit.
    pub fit_padding: f64,
    /// A second click on the same text within this many milliseconds is the
    /// tail of a double-click, not a new edit.
    pub double_click_ms: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            min_annotation_size: 20.0,
            default_rect_width: 100.0,
            default_rect_height: 60.0,
            handle_size: 8.0,
            relationship_tolerance: 6.0,
            fit_padding: 40.0,
            double_click_ms: 500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Default,
    Panning,
    DraggingEntity,
    DraggingRectangle,
    DraggingText,
    ResizingRectangle,
    CreatingRectangle,
    CreatingText,
}

#[derive(Debug, Clone)]
enum DragState {
    Pan {
        start_pan: (f64, f64),
    },
    Entity {
        name: String,
        offset: Point,
    },
    Rectangle {
        id: ElementId,
        offset: Point,
    },
    Text {
        id: ElementId,
        offset: Point,
    },
    Resize {
        id: ElementId,
        handle: ResizeHandle,
        original: Bounds,
    },
    CreateRectangle {
        anchor: Point,
        /// Set once the drag threshold is crossed and the rectangle exists.
        id: Option<ElementId>,
    },
}

impl DragState {
    fn mode(&self) -> Mode {
        match self {
            DragState::Pan { .. } => Mode::Panning,
            DragState::Entity { .. } => Mode::DraggingEntity,
            DragState::Rectangle { .. } => Mode::DraggingRectangle,
            DragState::Text { .. } => Mode::DraggingText,
            DragState::Resize { .. } => Mode::ResizingRectangle,
            DragState::CreateRectangle { .. } => Mode::CreatingRectangle,
        }
    }

    fn history_label(&self) -> &'static str {
        match self {
            DragState::Pan { .. } => "pan",
            DragState::Entity { .. } => "move entity",
            DragState::Rectangle { .. } => "move rectangle",
            DragState::Text { .. } => "move text",
            DragState::Resize { .. } => "resize rectangle",
            DragState::CreateRectangle { .. } => "add rectangle",
        }
    }
}

/// Where a press started and what it landed on.
#[derive(Debug, Clone)]
struct Press {
    screen: Point,
    canonical: Point,
    target: HitTarget,
}

/// Everything a handler may read or mutate for one event.
pub struct InteractionContext<'a> {
    pub store: &'a mut DiagramStore,
    pub scene: &'a Scene,
    pub schema: &'a SchemaGraph,
    pub origin: SurfaceOrigin,
    pub size: SurfaceSize,
    pub prompt: &'a mut dyn Prompt,
}

impl InteractionContext<'_> {
    fn viewport(&self) -> Viewport {
        self.store.state().viewport
    }

    fn to_canonical(&self, screen: Point) -> Point {
        screen_to_canonical(screen, self.origin, &self.store.state().viewport)
    }

    fn hit(&self, canonical: Point, config: &InteractionConfig) -> HitTarget {
        let tol = HitTolerance::from_screen(
            config.handle_size,
            config.relationship_tolerance,
            self.viewport().scale,
        );
        hit_test(self.scene, canonical, &tol)
    }

    /// Clone the layout, apply `edit`, and write it back.
    fn edit_layout(&mut self, record: bool, label: &str, edit: impl FnOnce(&mut LayoutDocument)) {
        let mut layout = self.store.state().layout.clone();
        edit(&mut layout);
        self.store
            .set_state(StatePatch::new().layout(layout).label(label), record);
    }
}

/// Result of handling one input event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// The event did something; hosts should `preventDefault`.
    pub consumed: bool,
    pub events: Vec<EditorEvent>,
}

impl Response {
    fn consumed() -> Self {
        Self {
            consumed: true,
            events: Vec::new(),
        }
    }

    fn event(event: EditorEvent) -> Self {
        Self {
            consumed: true,
            events: vec![event],
        }
    }
}

#[derive(Debug, Default)]
pub struct InteractionMachine {
    pub config: InteractionConfig,
    drag: Option<DragState>,
    press: Option<Press>,
    drag_occurred: bool,
    /// Set on pointer-up; swallows the host's click that follows it.
    suppress_click: bool,
    /// Text last opened for editing, and when its prompt closed.
    last_text_edit: Option<(ElementId, f64)>,
}

impl InteractionMachine {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.drag.as_ref().map_or(Mode::Default, DragState::mode)
    }

    /// Whether the last press travelled past the drag threshold.
    pub fn drag_occurred(&self) -> bool {
        self.drag_occurred
    }

    pub fn handle(&mut self, ctx: &mut InteractionContext<'_>, event: &InputEvent) -> Response {
        match event {
            InputEvent::PointerDown { at, button, .. } => self.pointer_down(ctx, *at, *button),
            InputEvent::PointerMove { at, .. } => self.pointer_move(ctx, *at),
            InputEvent::PointerUp { .. } => self.pointer_up(ctx),
            InputEvent::PointerCancel => {
                let was_active = self.drag.is_some();
                self.finish(ctx);
                if was_active && ctx.store.state().drawing_mode.is_some() {
                    ctx.store
                        .set_state(StatePatch::new().drawing_mode(None), false);
                }
                Response {
                    consumed: was_active,
                    events: Vec::new(),
                }
            }
            InputEvent::Click { at } => self.click(ctx, *at),
            InputEvent::DoubleClick { at } => self.double_click(ctx, *at),
            InputEvent::ContextMenu { at } => self.context_menu(ctx, *at),
            InputEvent::Wheel { at, delta_y } => self.wheel(ctx, *at, *delta_y),
            InputEvent::Key { key, modifiers } => self.key(ctx, key, *modifiers),
        }
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down(&mut self, ctx: &mut InteractionContext<'_>, at: Point, button: Button) -> Response {
        if button == Button::Secondary {
            return Response::default();
        }
        if self.drag.is_some() {
            log::debug!("interaction: pointer-down with {:?} still active", self.mode());
            self.finish(ctx);
        }
        self.drag_occurred = false;
        self.suppress_click = false;

        let canonical = ctx.to_canonical(at);
        let press = |target| Press {
            screen: at,
            canonical,
            target,
        };

        if button == Button::Middle {
            let pan = self.pan_state(ctx);
            self.press = Some(press(HitTarget::Background));
            self.start(ctx, pan);
            return Response::consumed();
        }

        match ctx.store.state().drawing_mode {
            Some(DrawingMode::Rectangle) => {
                self.press = Some(press(HitTarget::Background));
                self.start(
                    ctx,
                    DragState::CreateRectangle {
                        anchor: canonical,
                        id: None,
                    },
                );
                return Response::consumed();
            }
            Some(DrawingMode::Text) => {
                self.create_text(ctx, canonical);
                self.suppress_click = true;
                return Response::consumed();
            }
            None => {}
        }

        let target = ctx.hit(canonical, &self.config);
        log::trace!("interaction: press on {target:?}");
        let state = match &target {
            HitTarget::ResizeHandle { id, handle } => {
                let Some(rect) = ctx.store.state().layout.rect(*id) else {
                    return Response::default();
                };
                Some(DragState::Resize {
                    id: *id,
                    handle: *handle,
                    original: rect.bounds(),
                })
            }
            HitTarget::Text(id) => ctx.store.state().layout.text(*id).map(|t| DragState::Text {
                id: *id,
                offset: Point::new(canonical.x - t.x, canonical.y - t.y),
            }),
            HitTarget::Rectangle(id) => {
                ctx.store.state().layout.rect(*id).map(|r| DragState::Rectangle {
                    id: *id,
                    offset: Point::new(canonical.x - r.x, canonical.y - r.y),
                })
            }
            HitTarget::Entity(name) => ctx.scene.entity_bounds.get(name).map(|b| DragState::Entity {
                name: name.clone(),
                offset: Point::new(canonical.x - b.x, canonical.y - b.y),
            }),
            HitTarget::Relationship(_) | HitTarget::Background => None,
        };

        if let HitTarget::Text(id) | HitTarget::Rectangle(id) = &target
            && ctx.store.state().selection != Some(*id)
        {
            ctx.store
                .set_state(StatePatch::new().selection(Some(*id)), false);
        }

        let state = match state {
            Some(state) => state,
            None => self.pan_state(ctx),
        };
        self.press = Some(press(target));
        self.start(ctx, state);
        Response::consumed()
    }

    fn pan_state(&self, ctx: &InteractionContext<'_>) -> DragState {
        let vp = ctx.viewport();
        DragState::Pan {
            start_pan: (vp.pan_x, vp.pan_y),
        }
    }

    fn start(&mut self, ctx: &mut InteractionContext<'_>, state: DragState) {
        if !matches!(state, DragState::Pan { .. }) {
            ctx.store.begin_gesture();
        }
        log::debug!("interaction: {:?} -> {:?}", self.mode(), state.mode());
        self.drag = Some(state);
    }

    fn pointer_move(&mut self, ctx: &mut InteractionContext<'_>, at: Point) -> Response {
        if self.press.is_none() || self.drag.is_none() {
            return self.hover(ctx, at);
        }
        let (Some(press), Some(drag)) = (self.press.as_ref(), self.drag.as_mut()) else {
            return Response::default();
        };
        if !self.drag_occurred {
            if distance(press.screen, at) < self.config.drag_threshold {
                return Response::default();
            }
            self.drag_occurred = true;
        }

        let canonical = ctx.to_canonical(at);
        let min = self.config.min_annotation_size;
        match drag {
            DragState::Pan { start_pan } => {
                let vp = Viewport {
                    pan_x: start_pan.0 + (at.x - press.screen.x),
                    pan_y: start_pan.1 + (at.y - press.screen.y),
                    ..ctx.viewport()
                };
                ctx.store.set_state(StatePatch::new().viewport(vp), false);
            }
            DragState::Entity { name, offset } => {
                let p = Point::new(canonical.x - offset.x, canonical.y - offset.y);
                let name = name.as_str();
                ctx.edit_layout(false, "move entity", |layout| layout.set_position(name, p));
            }
            DragState::Rectangle { id, offset } => {
                let (id, offset) = (*id, *offset);
                ctx.edit_layout(false, "move rectangle", |layout| {
                    if let Some(r) = layout.rect_mut(id) {
                        r.x = canonical.x - offset.x;
                        r.y = canonical.y - offset.y;
                    }
                });
            }
            DragState::Text { id, offset } => {
                let (id, offset) = (*id, *offset);
                ctx.edit_layout(false, "move text", |layout| {
                    if let Some(t) = layout.text_mut(id) {
                        t.x = canonical.x - offset.x;
                        t.y = canonical.y - offset.y;
                    }
                });
            }
            DragState::Resize {
                id,
                handle,
                original,
            } => {
                let b = resize_bounds(
                    original,
                    *handle,
                    canonical.x - press.canonical.x,
                    canonical.y - press.canonical.y,
                    min,
                );
                let id = *id;
                ctx.edit_layout(false, "resize rectangle", |layout| {
                    if let Some(r) = layout.rect_mut(id) {
                        r.set_bounds(b);
                    }
                });
            }
            DragState::CreateRectangle { anchor, id } => {
                let b = Bounds::from_corners(*anchor, canonical);
                match *id {
                    Some(existing) => ctx.edit_layout(false, "add rectangle", |layout| {
                        if let Some(r) = layout.rect_mut(existing) {
                            r.set_bounds(b);
                        }
                    }),
                    None => {
                        let fresh = ctx.store.state().layout.fresh_id("rect");
                        *id = Some(fresh);
                        ctx.edit_layout(false, "add rectangle", |layout| {
                            layout.add_rectangle(RectAnnotation::new(fresh, b));
                        });
                    }
                }
            }
        }
        Response::consumed()
    }

    fn hover(&mut self, ctx: &mut InteractionContext<'_>, at: Point) -> Response {
        let canonical = ctx.to_canonical(at);
        let highlight = match ctx.hit(canonical, &self.config) {
            HitTarget::Entity(name) => ctx.schema.entity_neighbourhood(&name),
            HitTarget::Relationship(index) => ctx.schema.relationship_neighbourhood(index),
            _ => Highlight::default(),
        };
        if highlight != ctx.store.state().highlight {
            ctx.store
                .set_state(StatePatch::new().highlight(highlight), false);
        }
        Response::default()
    }

    fn pointer_up(&mut self, ctx: &mut InteractionContext<'_>) -> Response {
        let Some(press) = self.press.take() else {
            return Response::default();
        };
        let drag = self.drag.take();
        self.suppress_click = true;
        let min = self.config.min_annotation_size;

        if let Some(DragState::CreateRectangle { anchor, id }) = &drag {
            let id = match (*id, self.drag_occurred) {
                (Some(id), true) => {
                    ctx.edit_layout(false, "add rectangle", |layout| {
                        if let Some(r) = layout.rect_mut(id) {
                            let mut b = r.bounds();
                            b.width = b.width.max(min);
                            b.height = b.height.max(min);
                            r.set_bounds(b);
                        }
                    });
                    id
                }
                _ => {
                    let fresh = ctx.store.state().layout.fresh_id("rect");
                    let b = Bounds::new(
                        anchor.x,
                        anchor.y,
                        self.config.default_rect_width,
                        self.config.default_rect_height,
                    );
                    ctx.edit_layout(false, "add rectangle", |layout| {
                        layout.add_rectangle(RectAnnotation::new(fresh, b));
                    });
                    fresh
                }
            };
            ctx.store.set_state(
                StatePatch::new().selection(Some(id)).drawing_mode(None),
                false,
            );
            ctx.store.commit_gesture("add rectangle");
            log::debug!("interaction: created rectangle {id}");
            return Response::consumed();
        }

        if let Some(drag) = &drag {
            ctx.store.commit_gesture(drag.history_label());
            log::debug!("interaction: {:?} -> Default", drag.mode());
        }
        if self.drag_occurred {
            return Response::consumed();
        }
        self.dispatch_click(ctx, &press.target)
    }

    /// End any active gesture, keeping its last live value.
    fn finish(&mut self, ctx: &mut InteractionContext<'_>) {
        if let Some(drag) = self.drag.take() {
            ctx.store.commit_gesture(drag.history_label());
            log::debug!("interaction: {:?} abandoned", drag.mode());
        }
        self.press = None;
    }

    // ─── Clicks ──────────────────────────────────────────────────────────

    fn dispatch_click(&mut self, ctx: &mut InteractionContext<'_>, target: &HitTarget) -> Response {
        let last_text_edit = self.last_text_edit.take();
        match target {
            HitTarget::Entity(name) => Response::event(EditorEvent::EntityClick {
                entity: name.clone(),
            }),
            HitTarget::Relationship(index) => {
                let constraint = ctx
                    .store
                    .state()
                    .data
                    .relationships
                    .get(*index)
                    .map(|r| r.constraint_name.clone())
                    .unwrap_or_default();
                Response::event(EditorEvent::RelationshipClick {
                    index: *index,
                    constraint,
                })
            }
            HitTarget::Text(id) => {
                let repeat = last_text_edit.is_some_and(|(last, at)| {
                    last == *id && ctx.store.now() - at < self.config.double_click_ms
                });
                if !repeat {
                    self.edit_text(ctx, *id);
                    self.last_text_edit = Some((*id, ctx.store.now()));
                }
                Response::consumed()
            }
            HitTarget::Rectangle(id) | HitTarget::ResizeHandle { id, .. } => {
                if ctx.store.state().selection != Some(*id) {
                    ctx.store
                        .set_state(StatePatch::new().selection(Some(*id)), false);
                }
                Response::consumed()
            }
            HitTarget::Background => {
                if ctx.store.state().selection.is_some() {
                    ctx.store.set_state(StatePatch::new().selection(None), false);
                }
                Response::consumed()
            }
        }
    }

    /// A host click. Swallowed once after a pointer-up, which already
    /// dispatched the click or committed a drag.
    fn click(&mut self, ctx: &mut InteractionContext<'_>, at: Point) -> Response {
        if std::mem::take(&mut self.suppress_click) {
            return Response::default();
        }
        let target = ctx.hit(ctx.to_canonical(at), &self.config);
        self.dispatch_click(ctx, &target)
    }

    fn double_click(&mut self, ctx: &mut InteractionContext<'_>, at: Point) -> Response {
        match ctx.hit(ctx.to_canonical(at), &self.config) {
            HitTarget::Entity(entity) => Response::event(EditorEvent::EntityDoubleClick { entity }),
            _ => Response::default(),
        }
    }

    fn context_menu(&mut self, ctx: &mut InteractionContext<'_>, at: Point) -> Response {
        let canonical = ctx.to_canonical(at);
        let target = ctx.hit(canonical, &self.config);
        Response::event(EditorEvent::ContextMenuRequested {
            target: ContextTarget::from(&target),
            canonical,
            screen: at,
        })
    }

    fn create_text(&mut self, ctx: &mut InteractionContext<'_>, at: Point) {
        log::debug!("interaction: Default -> {:?}", Mode::CreatingText);
        let content = ctx.prompt.prompt("Enter text:", "").unwrap_or_default();
        if content.trim().is_empty() {
            ctx.store
                .set_state(StatePatch::new().drawing_mode(None), false);
            return;
        }
        let id = ctx.store.state().layout.fresh_id("text");
        let mut layout = ctx.store.state().layout.clone();
        layout.add_text(TextAnnotation::new(id, at, &content));
        ctx.store.set_state(
            StatePatch::new()
                .layout(layout)
                .selection(Some(id))
                .drawing_mode(None)
                .label("add text"),
            true,
        );
    }

    fn edit_text(&mut self, ctx: &mut InteractionContext<'_>, id: ElementId) {
        let Some(current) = ctx.store.state().layout.text(id).map(|t| t.content.clone()) else {
            return;
        };
        let Some(next) = ctx.prompt.prompt("Edit text:", &current) else {
            return;
        };
        if next.trim().is_empty() || next == current {
            return;
        }
        ctx.edit_layout(true, "edit text", |layout| {
            layout.edit_text(id, &next);
        });
    }

    // ─── Wheel & keys ────────────────────────────────────────────────────

    fn wheel(&mut self, ctx: &mut InteractionContext<'_>, at: Point, delta_y: f64) -> Response {
        let vp = ctx.viewport();
        let zoomed = vp.zoom_about(at, ctx.origin, vp.wheel_scale(delta_y));
        if zoomed != vp {
            ctx.store.set_state(StatePatch::new().viewport(zoomed), false);
        }
        Response::consumed()
    }

    fn zoom_centre(&self, ctx: &mut InteractionContext<'_>, zoom_in: bool) {
        let vp = ctx.viewport();
        let centre = Point::new(
            ctx.origin.left + ctx.size.width / 2.0,
            ctx.origin.top + ctx.size.height / 2.0,
        );
        let scale = vp.wheel_scale(if zoom_in { -1.0 } else { 1.0 });
        let zoomed = vp.zoom_about(centre, ctx.origin, scale);
        ctx.store.set_state(StatePatch::new().viewport(zoomed), false);
    }

    pub fn zoom_to_fit(&self, ctx: &mut InteractionContext<'_>) {
        let Some(content) = ctx.scene.content_bounds() else {
            return;
        };
        let scale = fit_scale(&content, ctx.size, self.config.fit_padding);
        let (pan_x, pan_y) = centering_pan(&content, ctx.size, scale);
        ctx.store.set_state(
            StatePatch::new().viewport(Viewport {
                pan_x,
                pan_y,
                scale,
            }),
            false,
        );
    }

    fn key(&mut self, ctx: &mut InteractionContext<'_>, key: &str, modifiers: Modifiers) -> Response {
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return Response::default();
        };
        log::trace!("interaction: shortcut {action:?}");
        match action {
            ShortcutAction::Undo => {
                self.finish(ctx);
                ctx.store.undo();
            }
            ShortcutAction::Redo => {
                self.finish(ctx);
                ctx.store.redo();
            }
            ShortcutAction::Deselect => {
                self.finish(ctx);
                ctx.store.set_state(
                    StatePatch::new().selection(None).drawing_mode(None),
                    false,
                );
            }
            ShortcutAction::Delete => {
                let Some(id) = ctx.store.state().selection else {
                    return Response::default();
                };
                if ctx.store.state().layout.annotation_kind(id).is_none() {
                    return Response::default();
                }
                let mut layout = ctx.store.state().layout.clone();
                layout.remove_annotation(id);
                ctx.store.set_state(
                    StatePatch::new()
                        .layout(layout)
                        .selection(None)
                        .label("delete annotation"),
                    true,
                );
            }
            ShortcutAction::ToolRect => {
                ctx.store.set_state(
                    StatePatch::new().drawing_mode(Some(DrawingMode::Rectangle)),
                    false,
                );
            }
            ShortcutAction::ToolText => {
                ctx.store.set_state(
                    StatePatch::new().drawing_mode(Some(DrawingMode::Text)),
                    false,
                );
            }
            ShortcutAction::ZoomIn => self.zoom_centre(ctx, true),
            ShortcutAction::ZoomOut => self.zoom_centre(ctx, false),
            ShortcutAction::ZoomToFit => self.zoom_to_fit(ctx),
        }
        Response::consumed()
    }
}

/// Apply a handle drag of `(dx, dy)` to `original`. Edges the handle does not
/// move stay put; width and height never drop below `min`.
pub fn resize_bounds(original: &Bounds, handle: ResizeHandle, dx: f64, dy: f64, min: f64) -> Bounds {
    let (moves_left, moves_right, moves_top, moves_bottom) = handle.edges();
    let mut left = original.x;
    let mut right = original.right();
    let mut top = original.y;
    let mut bottom = original.bottom();

    if moves_left {
        left = (left + dx).min(right - min);
    }
    if moves_right {
        right = (right + dx).max(left + min);
    }
    if moves_top {
        top = (top + dy).min(bottom - min);
    }
    if moves_bottom {
        bottom = (bottom + dy).max(top + min);
    }
    Bounds::new(
        left,
        top,
        (right - left).max(min),
        (bottom - top).max(min),
    )
}
