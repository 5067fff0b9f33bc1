//! The persisted layout document.
//!
//! ```json
//! {
//!   "entities": { "users": { "position": { "x": 50, "y": 50 } } },
//!   "rectangles": [ { "id": "rect_0", "x": 0, "y": 0, "width": 100, "height": 60, ... } ],
//!   "texts": [ { "id": "text_1", "x": 10, "y": 10, "content": "note", ... } ],
//!   "layers": [ { "id": "diagram", "name": "Diagram", "type": "diagram", "order": 0, "visible": true } ],
//!   "leftSidebar": { "visible": true, "width": 280 }
//! }
//! ```
//!
//! Entity positions are read leniently: a missing, malformed or non-finite
//! position is "no position" and the entity falls back to grid clustering.
//! A malformed rectangle, text or layer entry is dropped with a warning; the
//! rest of the document still loads.

use crate::id::ElementId;
use crate::layers::LayerStack;
use crate::model::*;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid layout document: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityLayout {
    #[serde(
        default,
        deserialize_with = "lenient_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<Point>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybePoint {
    Point(Point),
    #[allow(dead_code)]
    Malformed(IgnoredAny),
}

fn lenient_position<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Point>, D::Error> {
    let raw = Option::<MaybePoint>::deserialize(d)?;
    Ok(match raw {
        Some(MaybePoint::Point(p)) if p.is_finite() => Some(p),
        Some(_) => {
            log::debug!("ignoring malformed entity position");
            None
        }
        None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeEntry<T> {
    Entry(T),
    #[allow(dead_code)]
    Malformed(IgnoredAny),
}

fn lenient_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<Vec<MaybeEntry<T>>>::deserialize(d)?.unwrap_or_default();
    let total = raw.len();
    let entries: Vec<T> = raw
        .into_iter()
        .filter_map(|e| match e {
            MaybeEntry::Entry(entry) => Some(entry),
            MaybeEntry::Malformed(_) => None,
        })
        .collect();
    if entries.len() < total {
        log::warn!(
            "layout: dropped {} malformed {} entries",
            total - entries.len(),
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("layout")
        );
    }
    Ok(entries)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SidebarState {
    #[serde(default = "default_sidebar_visible")]
    pub visible: bool,
    #[serde(default = "default_sidebar_width")]
    pub width: f64,
}

fn default_sidebar_visible() -> bool {
    true
}

fn default_sidebar_width() -> f64 {
    280.0
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            visible: default_sidebar_visible(),
            width: default_sidebar_width(),
        }
    }
}

/// Positions, annotations, layers and chrome state of one diagram.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDocument {
    #[serde(default)]
    pub entities: BTreeMap<String, EntityLayout>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub rectangles: Vec<RectAnnotation>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub texts: Vec<TextAnnotation>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub left_sidebar: SidebarState,
}

impl LayoutDocument {
    /// An empty document holding only the implicit diagram layer.
    pub fn new() -> Self {
        let mut doc = Self::default();
        doc.normalize();
        doc
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let mut doc: LayoutDocument = serde_json::from_str(json)?;
        doc.normalize();
        Ok(doc)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Guarantee the implicit diagram layer exists.
    pub fn normalize(&mut self) {
        let has_diagram = self.layers.iter().any(|l| l.kind == LayerKind::Diagram);
        if !has_diagram {
            let mut layer = Layer::diagram();
            layer.order = LayerStack::new(&mut self.layers).below_all();
            self.layers.push(layer);
        }
    }

    // ─── Entity positions ────────────────────────────────────────────────

    pub fn position(&self, entity: &str) -> Option<Point> {
        self.entities.get(entity).and_then(|e| e.position)
    }

    pub fn set_position(&mut self, entity: &str, p: Point) {
        self.entities.entry(entity.to_string()).or_default().position = Some(p);
    }

    /// Forget every stored entity position (annotations are kept).
    pub fn clear_positions(&mut self) {
        self.entities.clear();
    }

    // ─── Annotations ─────────────────────────────────────────────────────

    pub fn rect(&self, id: ElementId) -> Option<&RectAnnotation> {
        self.rectangles.iter().find(|r| r.id == id)
    }

    pub fn rect_mut(&mut self, id: ElementId) -> Option<&mut RectAnnotation> {
        self.rectangles.iter_mut().find(|r| r.id == id)
    }

    pub fn text(&self, id: ElementId) -> Option<&TextAnnotation> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn text_mut(&mut self, id: ElementId) -> Option<&mut TextAnnotation> {
        self.texts.iter_mut().find(|t| t.id == id)
    }

    pub fn annotation_kind(&self, id: ElementId) -> Option<AnnotationKind> {
        if self.rect(id).is_some() {
            Some(AnnotationKind::Rectangle)
        } else if self.text(id).is_some() {
            Some(AnnotationKind::Text)
        } else {
            None
        }
    }

    /// True if `id` names an annotation or a layer.
    pub fn is_taken(&self, id: ElementId) -> bool {
        self.annotation_kind(id).is_some() || self.layers.iter().any(|l| l.id == id)
    }

    pub fn fresh_id(&self, prefix: &str) -> ElementId {
        ElementId::fresh(prefix, |id| {
            self.is_taken(id) || self.layers.iter().any(|l| l.id.as_str() == format!("layer_{id}"))
        })
    }

    /// Append a rectangle and its layer on top of the stack.
    pub fn add_rectangle(&mut self, rect: RectAnnotation) -> ElementId {
        let id = rect.id;
        let name = format!("Rectangle {}", self.rectangles.len() + 1);
        self.rectangles.push(rect);
        LayerStack::new(&mut self.layers).push_for(id, AnnotationKind::Rectangle, name);
        id
    }

    /// Append a text annotation and its layer on top of the stack.
    pub fn add_text(&mut self, text: TextAnnotation) -> ElementId {
        let id = text.id;
        let name = format!("Text: {}", preview(&text.content));
        self.texts.push(text);
        LayerStack::new(&mut self.layers).push_for(id, AnnotationKind::Text, name);
        id
    }

    /// Replace a text annotation's content and rename its layer to match.
    pub fn edit_text(&mut self, id: ElementId, content: &str) -> bool {
        let Some(text) = self.text_mut(id) else {
            return false;
        };
        text.content = content.to_string();
        let name = format!("Text: {}", preview(content));
        if let Some(layer) = self.layers.iter_mut().find(|l| l.target == Some(id)) {
            layer.name = name;
        }
        true
    }

    /// Delete an annotation together with its layer.
    pub fn remove_annotation(&mut self, id: ElementId) -> bool {
        let before = self.rectangles.len() + self.texts.len();
        self.rectangles.retain(|r| r.id != id);
        self.texts.retain(|t| t.id != id);
        let removed = self.rectangles.len() + self.texts.len() != before;
        if removed {
            LayerStack::new(&mut self.layers).remove_for(id);
        }
        removed
    }

    /// Bounds of every annotation, for zoom-to-fit.
    pub fn annotation_bounds(&self, char_width_ratio: f64) -> Vec<Bounds> {
        self.rectangles
            .iter()
            .map(|r| r.bounds())
            .chain(self.texts.iter().map(|t| t.bounds(char_width_ratio)))
            .collect()
    }
}

fn preview(content: &str) -> String {
    let first = content.lines().next().unwrap_or_default();
    if first.chars().count() > 20 {
        let cut: String = first.chars().take(20).collect();
        format!("{cut}…")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::paint_order;
    use pretty_assertions::assert_eq;

    #[test]
    fn malformed_positions_read_as_missing() {
        let json = r#"{
            "entities": {
                "users": { "position": { "x": 10, "y": 20 } },
                "orders": { "position": { "x": "left", "y": 20 } },
                "items": { "position": null },
                "tags": {},
                "notes": { "position": [1, 2, 3] }
            }
        }"#;
        let doc = LayoutDocument::from_json(json).unwrap();
        assert_eq!(doc.position("users"), Some(Point::new(10.0, 20.0)));
        assert_eq!(doc.position("orders"), None);
        assert_eq!(doc.position("items"), None);
        assert_eq!(doc.position("tags"), None);
        assert_eq!(doc.position("notes"), None);
        assert_eq!(doc.position("unknown"), None);
    }

    #[test]
    fn normalize_inserts_diagram_layer_below_others() {
        let json = r#"{
            "rectangles": [{ "id": "r1", "x": 0, "y": 0, "width": 10, "height": 10 }],
            "layers": [{ "id": "layer_r1", "name": "R", "type": "rectangle", "order": 3, "target": "r1" }]
        }"#;
        let doc = LayoutDocument::from_json(json).unwrap();
        let diagram = doc
            .layers
            .iter()
            .find(|l| l.kind == LayerKind::Diagram)
            .unwrap();
        assert_eq!(diagram.order, 2);
        assert_eq!(doc.left_sidebar, SidebarState::default());
    }

    #[test]
    fn add_and_remove_annotation_keeps_layers_in_sync() {
        let mut doc = LayoutDocument::new();
        let id = doc.fresh_id("rect");
        doc.add_rectangle(RectAnnotation::new(id, Bounds::new(0.0, 0.0, 100.0, 60.0)));
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.layers.iter().filter(|l| l.target == Some(id)).count(), 1);

        assert!(doc.remove_annotation(id));
        assert_eq!(doc.layers.len(), 1);
        assert!(!doc.remove_annotation(id));
    }

    #[test]
    fn text_layer_named_from_content() {
        let mut doc = LayoutDocument::new();
        let id = doc.fresh_id("text");
        doc.add_text(TextAnnotation::new(
            id,
            Point::new(5.0, 5.0),
            "a fairly long annotation that goes on\nsecond line",
        ));
        let layer = doc.layers.iter().find(|l| l.target == Some(id)).unwrap();
        assert_eq!(layer.name, "Text: a fairly long annota…");
        assert_eq!(layer.kind, LayerKind::Text);
    }

    #[test]
    fn editing_text_renames_its_layer() {
        let mut doc = LayoutDocument::new();
        let id = doc.fresh_id("text");
        doc.add_text(TextAnnotation::new(id, Point::new(0.0, 0.0), "draft"));
        assert!(doc.edit_text(id, "final wording"));
        assert_eq!(doc.text(id).unwrap().content, "final wording");
        let layer = doc.layers.iter().find(|l| l.target == Some(id)).unwrap();
        assert_eq!(layer.name, "Text: final wording");
        assert!(!doc.edit_text(ElementId::intern("no_such_text"), "x"));
    }

    #[test]
    fn json_roundtrip_uses_camel_case() {
        let mut doc = LayoutDocument::new();
        doc.set_position("users", Point::new(50.0, 50.0));
        doc.left_sidebar.width = 320.0;
        let json = doc.to_json();
        assert!(json.contains("\"leftSidebar\""));
        let back = LayoutDocument::from_json(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn malformed_annotations_are_dropped_not_fatal() {
        let json = r#"{
            "entities": { "users": { "position": { "x": 10, "y": 20 } } },
            "rectangles": [
                { "id": "rect_bad", "x": "bad", "y": 0, "width": 10, "height": 10 },
                { "id": "rect_ok", "x": 0, "y": 0, "width": 10, "height": 10 }
            ],
            "texts": [{ "id": "text_bad", "x": 1 }, 42],
            "layers": [{ "id": "layer_rect_ok", "name": "R", "type": "rectangle", "order": "top" }]
        }"#;
        let doc = LayoutDocument::from_json(json).unwrap();
        assert_eq!(doc.position("users"), Some(Point::new(10.0, 20.0)));
        let ids: Vec<&str> = doc.rectangles.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rect_ok"]);
        assert!(doc.texts.is_empty());
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.layers[0].kind, LayerKind::Diagram);
    }

    #[test]
    fn extreme_layer_orders_load_without_overflow() {
        let low = r#"{"layers":[{"id":"layer_x","name":"x","type":"rectangle","order":-2147483648}]}"#;
        let doc = LayoutDocument::from_json(low).unwrap();
        let names: Vec<&str> = paint_order(&doc.layers).iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Diagram", "x"]);

        let high = r#"{"layers":[{"id":"layer_y","name":"y","type":"rectangle","order":2147483647}]}"#;
        let mut doc = LayoutDocument::from_json(high).unwrap();
        let id = doc.fresh_id("rect");
        doc.add_rectangle(RectAnnotation::new(id, Bounds::new(0.0, 0.0, 10.0, 10.0)));
        let names: Vec<&str> = paint_order(&doc.layers).iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Diagram", "y", "Rectangle 1"]);
    }
}
