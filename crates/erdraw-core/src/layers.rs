//! Layer ordering.
//!
//! `Layer::order` is the single source of truth for paint order. Ascending
//! order paints back to front: the layer with the highest `order` is drawn
//! last and sits on top. Hit testing walks the same sequence in reverse.

use crate::id::ElementId;
use crate::model::{AnnotationKind, Layer};

/// Layers sorted back-to-front. Ties keep list order.
pub fn paint_order(layers: &[Layer]) -> Vec<&Layer> {
    let mut sorted: Vec<&Layer> = layers.iter().collect();
    sorted.sort_by_key(|l| l.order);
    sorted
}

/// Mutating view over a diagram's layer list.
pub struct LayerStack<'a> {
    layers: &'a mut Vec<Layer>,
}

impl<'a> LayerStack<'a> {
    pub fn new(layers: &'a mut Vec<Layer>) -> Self {
        Self { layers }
    }

    fn top_order(&self) -> i32 {
        self.layers.iter().map(|l| l.order).max().unwrap_or(-1)
    }

    fn bottom_order(&self) -> i32 {
        self.layers.iter().map(|l| l.order).min().unwrap_or(0)
    }

    /// Renumber when an `order` read from a persisted layout sits at the edge
    /// of the `i32` range, so one step past the top or bottom stays distinct.
    pub fn make_room(&mut self) {
        if self.top_order() == i32::MAX || self.bottom_order() == i32::MIN {
            self.renumber();
        }
    }

    /// Order for a new layer below every existing one.
    pub fn below_all(&mut self) -> i32 {
        self.make_room();
        if self.layers.is_empty() {
            0
        } else {
            self.bottom_order().saturating_sub(1)
        }
    }

    /// Add the layer for a freshly created annotation on top of the stack.
    pub fn push_for(&mut self, target: ElementId, kind: AnnotationKind, name: String) -> ElementId {
        self.make_room();
        let order = self.top_order().saturating_add(1);
        let layer = Layer::for_annotation(target, kind, name, order);
        let id = layer.id;
        self.layers.push(layer);
        id
    }

    pub fn remove_for(&mut self, target: ElementId) {
        self.layers.retain(|l| l.target != Some(target));
        self.renumber();
    }

    /// Rewrite `order` as 0..n following the current paint order.
    pub fn renumber(&mut self) {
        let mut ids: Vec<(i32, usize)> = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.order, i))
            .collect();
        ids.sort();
        for (rank, (_, idx)) in ids.into_iter().enumerate() {
            self.layers[idx].order = rank as i32;
        }
    }

    /// Apply an order reported by the layer panel, listed front to back.
    /// Ids not in the list keep their relative order below the listed ones.
    pub fn apply_order(&mut self, front_to_back: &[ElementId]) {
        self.renumber();
        let listed = front_to_back.len() as i32;
        for layer in self.layers.iter_mut() {
            if let Some(pos) = front_to_back.iter().position(|id| *id == layer.id) {
                layer.order = 10_000 + (listed - pos as i32);
            }
        }
        self.renumber();
    }

    /// Swap with the next layer up. Returns false at the top.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        self.step(id, true)
    }

    /// Swap with the next layer down. Returns false at the bottom.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        self.step(id, false)
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.make_room();
        let top = self.top_order();
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) if layer.order != top => {
                layer.order = top.saturating_add(1);
                self.renumber();
                true
            }
            _ => false,
        }
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.make_room();
        let bottom = self.bottom_order();
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) if layer.order != bottom => {
                layer.order = bottom.saturating_sub(1);
                self.renumber();
                true
            }
            _ => false,
        }
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) if layer.visible != visible => {
                layer.visible = visible;
                true
            }
            _ => false,
        }
    }

    pub fn rename(&mut self, id: ElementId, name: &str) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.name = name.to_string();
                true
            }
            None => false,
        }
    }

    fn step(&mut self, id: ElementId, up: bool) -> bool {
        self.renumber();
        let Some(idx) = self.layers.iter().position(|l| l.id == id) else {
            return false;
        };
        let order = self.layers[idx].order;
        let neighbour = if up { order + 1 } else { order - 1 };
        let Some(other) = self.layers.iter().position(|l| l.order == neighbour) else {
            return false;
        };
        self.layers[other].order = order;
        self.layers[idx].order = neighbour;
        true
    }
}
