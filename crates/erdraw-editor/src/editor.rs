//! One diagram canvas: state store, compositor and interaction machine wired
//! together behind a single dispatch entry point.

use crate::history::HistoryConfig;
use crate::input::InputEvent;
use crate::interaction::{InteractionConfig, InteractionContext, InteractionMachine, Mode, Response};
use crate::session::{NoPrompt, Prompt};
use crate::store::{Clock, DiagramState, DiagramStore, DrawingMode, StateKey, StatePatch};
use erdraw_core::{
    ClusterGrid, DiagramData, ElementId, Highlight, LayerStack, LayoutDocument, LayoutError,
    LayoutMetrics, RoutingConfig, SchemaGraph, SurfaceOrigin, SurfaceSize,
};
use erdraw_render::{Compositor, Painter, Scene, SceneInput, Surface, SurfaceError};

#[derive(Debug, Clone, Default)]
pub struct EditorConfig {
    pub interaction: InteractionConfig,
    pub history: HistoryConfig,
    pub metrics: LayoutMetrics,
    pub grid: ClusterGrid,
    pub routing: RoutingConfig,
}

/// What the host has to redo after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Repaint {
    #[default]
    None,
    /// Only the viewport transform changed.
    Viewport,
    Full,
}

pub struct DiagramEditor {
    store: DiagramStore,
    compositor: Compositor,
    machine: InteractionMachine,
    scene: Scene,
    schema: SchemaGraph,
    schema_revision: Option<u64>,
    pending: Repaint,
    origin: SurfaceOrigin,
    size: SurfaceSize,
    prompt: Box<dyn Prompt>,
}

impl Default for DiagramEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl DiagramEditor {
    pub fn new(config: EditorConfig) -> Self {
        let mut store = DiagramStore::new(config.history);
        store.set_state(StatePatch::new().layout(LayoutDocument::new()), false);
        let mut editor = Self {
            store,
            compositor: Compositor::new(config.metrics, config.grid, config.routing),
            machine: InteractionMachine::new(config.interaction),
            scene: Scene::default(),
            schema: SchemaGraph::default(),
            schema_revision: None,
            pending: Repaint::None,
            origin: SurfaceOrigin::default(),
            size: SurfaceSize::default(),
            prompt: Box::new(NoPrompt),
        };
        editor.sync();
        editor
    }

    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.store = self.store.with_clock(clock);
        self
    }

    pub fn state(&self) -> &DiagramState {
        self.store.state()
    }

    pub fn store(&self) -> &DiagramStore {
        &self.store
    }

    /// Direct access for subscriptions and patches from the host.
    pub fn store_mut(&mut self) -> &mut DiagramStore {
        &mut self.store
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn interaction(&self) -> &InteractionMachine {
        &self.machine
    }

    /// The scene as of the latest state.
    pub fn scene(&mut self) -> &Scene {
        self.sync();
        &self.scene
    }

    pub fn set_surface(&mut self, origin: SurfaceOrigin, size: SurfaceSize) {
        self.origin = origin;
        self.size = size;
    }

    pub fn surface_origin(&self) -> SurfaceOrigin {
        self.origin
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Replace the whole diagram. Clustered positions and history start over.
    pub fn load(&mut self, data: DiagramData, mut layout: LayoutDocument) {
        layout.normalize();
        self.compositor.reset_positions();
        self.store.set_state(
            StatePatch::new()
                .data(data)
                .layout(layout)
                .selection(None)
                .highlight(Highlight::default())
                .drawing_mode(None),
            false,
        );
        self.store.clear_history();
        log::debug!(
            "editor: loaded {} entities, {} relationships",
            self.state().data.entities.len(),
            self.state().data.relationships.len()
        );
        self.sync();
    }

    /// Take fresh structural data from reverse engineering. Stored entity
    /// positions are dropped so every entity is re-clustered; annotations
    /// and layers stay.
    pub fn apply_reverse_engineered(&mut self, data: DiagramData) {
        let mut layout = self.state().layout.clone();
        layout.clear_positions();
        self.load(data, layout);
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: &InputEvent) -> Response {
        self.sync();
        let mut ctx = InteractionContext {
            store: &mut self.store,
            scene: &self.scene,
            schema: &self.schema,
            origin: self.origin,
            size: self.size,
            prompt: &mut *self.prompt,
        };
        let response = self.machine.handle(&mut ctx, event);
        self.sync();
        response
    }

    /// Repaint owed to the host since the last call.
    pub fn refresh(&mut self) -> Repaint {
        self.sync();
        std::mem::take(&mut self.pending)
    }

    fn sync(&mut self) {
        let dirty = self.store.take_dirty();
        let revision = self.store.data_revision();
        let stale_schema = self.schema_revision != Some(revision);
        if dirty.is_empty() && !stale_schema {
            return;
        }
        if stale_schema {
            self.schema = SchemaGraph::build(&self.store.state().data);
            self.schema_revision = Some(revision);
        }
        let content = stale_schema || dirty.iter().any(|k| *k != StateKey::Viewport);
        if content {
            let state = self.store.state();
            self.scene = self.compositor.compose(&SceneInput {
                data: &state.data,
                layout: &state.layout,
                selection: state.selection,
                highlight: &state.highlight,
            });
        }
        let repaint = if content {
            Repaint::Full
        } else if dirty.contains(&StateKey::Viewport) {
            Repaint::Viewport
        } else {
            Repaint::None
        };
        self.pending = self.pending.max(repaint);
    }

    // ─── Painting ────────────────────────────────────────────────────────

    pub fn paint<S: Surface>(
        &mut self,
        surface: &mut S,
        painter: &Painter,
    ) -> Result<S::Element, SurfaceError> {
        self.sync();
        self.pending = Repaint::None;
        painter.paint(surface, &self.scene, &self.store.state().viewport)
    }

    /// Re-apply only the viewport transform to an already painted surface.
    pub fn apply_viewport<S: Surface>(&mut self, surface: &mut S) -> Result<(), SurfaceError> {
        erdraw_render::apply_viewport(surface, &self.store.state().viewport)
    }

    pub fn export_svg(&mut self, painter: &Painter) -> Result<String, SurfaceError> {
        self.sync();
        erdraw_render::export_svg(&self.scene, painter)
    }

    // ─── Commands ────────────────────────────────────────────────────────

    pub fn set_drawing_mode(&mut self, mode: Option<DrawingMode>) {
        self.store
            .set_state(StatePatch::new().drawing_mode(mode), false);
    }

    pub fn undo(&mut self) -> bool {
        let done = self.store.undo();
        self.sync();
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.store.redo();
        self.sync();
        done
    }

    pub fn zoom_to_fit(&mut self) {
        self.sync();
        let mut ctx = InteractionContext {
            store: &mut self.store,
            scene: &self.scene,
            schema: &self.schema,
            origin: self.origin,
            size: self.size,
            prompt: &mut *self.prompt,
        };
        self.machine.zoom_to_fit(&mut ctx);
        self.sync();
    }

    pub fn delete_annotation(&mut self, id: ElementId) -> bool {
        let selection = self.state().selection.filter(|s| *s != id);
        let mut layout = self.state().layout.clone();
        if !layout.remove_annotation(id) {
            return false;
        }
        self.store.set_state(
            StatePatch::new()
                .layout(layout)
                .selection(selection)
                .label("delete annotation"),
            true,
        );
        self.sync();
        true
    }

    /// Run a layer-stack edit as one history entry. No entry if `op` reports
    /// no change.
    fn edit_layers(&mut self, label: &str, op: impl FnOnce(&mut LayerStack<'_>) -> bool) -> bool {
        let mut layout = self.state().layout.clone();
        if !op(&mut LayerStack::new(&mut layout.layers)) {
            return false;
        }
        self.store
            .set_state(StatePatch::new().layout(layout).label(label), true);
        self.sync();
        true
    }

    pub fn bring_forward(&mut self, layer: ElementId) -> bool {
        self.edit_layers("bring forward", |s| s.bring_forward(layer))
    }

    pub fn send_backward(&mut self, layer: ElementId) -> bool {
        self.edit_layers("send backward", |s| s.send_backward(layer))
    }

    pub fn bring_to_front(&mut self, layer: ElementId) -> bool {
        self.edit_layers("bring to front", |s| s.bring_to_front(layer))
    }

    pub fn send_to_back(&mut self, layer: ElementId) -> bool {
        self.edit_layers("send to back", |s| s.send_to_back(layer))
    }

    pub fn set_layer_visible(&mut self, layer: ElementId, visible: bool) -> bool {
        self.edit_layers("toggle layer", |s| s.set_visible(layer, visible))
    }

    pub fn rename_layer(&mut self, layer: ElementId, name: &str) -> bool {
        self.edit_layers("rename layer", |s| s.rename(layer, name))
    }

    /// The layer panel's reordered list, front to back.
    pub fn apply_layer_order(&mut self, front_to_back: &[ElementId]) -> bool {
        let before = self.state().layout.layers.clone();
        self.edit_layers("reorder layers", |s| {
            s.apply_order(front_to_back);
            true
        }) && before != self.state().layout.layers
    }

    // ─── Layout document ─────────────────────────────────────────────────

    pub fn layout_json(&self) -> String {
        self.state().layout.to_json()
    }

    /// Replace the layout from its persisted JSON form, as one history entry.
    pub fn set_layout_json(&mut self, json: &str) -> Result<(), LayoutError> {
        let layout = LayoutDocument::from_json(json)?;
        self.compositor.reset_positions();
        let selection = self
            .state()
            .selection
            .filter(|id| layout.annotation_kind(*id).is_some());
        self.store.set_state(
            StatePatch::new()
                .layout(layout)
                .selection(selection)
                .label("replace layout"),
            true,
        );
        self.sync();
        Ok(())
    }
}
