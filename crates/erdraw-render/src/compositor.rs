//! Scene compositor: layer order → back-to-front scene items.

use crate::scene::{EntityRow, Scene, SceneItem};
use erdraw_core::layout::{
    ClusterGrid, LayoutMetrics, PositionCache, entity_bounds, resolve_positions,
};
use erdraw_core::routing::{RoutingConfig, route_relationships};
use erdraw_core::{
    Bounds, DiagramData, ElementId, Highlight, KeyRole, LayerKind, LayoutDocument, paint_order,
};
use std::collections::{HashMap, HashSet};

/// Width of one character relative to the font size, for text annotations.
pub const TEXT_CHAR_RATIO: f64 = 0.6;

/// What the compositor reads from the diagram state for one pass.
pub struct SceneInput<'a> {
    pub data: &'a DiagramData,
    pub layout: &'a LayoutDocument,
    pub selection: Option<ElementId>,
    pub highlight: &'a Highlight,
}

/// Turns structural data, layout and layer order into a [`Scene`].
///
/// Holds the fallback-position cache and the entity bounding boxes of the
/// most recent pass.
#[derive(Debug, Default)]
pub struct Compositor {
    pub metrics: LayoutMetrics,
    pub grid: ClusterGrid,
    pub routing: RoutingConfig,
    positions: PositionCache,
    bounds: HashMap<String, Bounds>,
}

impl Compositor {
    pub fn new(metrics: LayoutMetrics, grid: ClusterGrid, routing: RoutingConfig) -> Self {
        Self {
            metrics,
            grid,
            routing,
            positions: PositionCache::new(),
            bounds: HashMap::new(),
        }
    }

    /// Entity boxes from the last [`compose`](Self::compose).
    pub fn entity_bounds(&self) -> &HashMap<String, Bounds> {
        &self.bounds
    }

    pub fn position_cache(&self) -> &PositionCache {
        &self.positions
    }

    /// Forget clustered positions. Called on a full external resync.
    pub fn reset_positions(&mut self) {
        self.positions.clear();
        self.bounds.clear();
    }

    pub fn compose(&mut self, input: &SceneInput<'_>) -> Scene {
        let data = input.data;
        let positions =
            resolve_positions(&data.entities, input.layout, &mut self.positions, &self.grid);
        let boxes = entity_bounds(&data.entities, &positions, &self.metrics);
        let edges = route_relationships(data, &boxes, &self.metrics, &self.routing);

        let mut items = Vec::new();
        let mut painted: HashSet<ElementId> = HashSet::new();
        let mut claimed: HashSet<ElementId> = HashSet::new();

        for layer in paint_order(&input.layout.layers) {
            if let Some(target) = layer.target {
                claimed.insert(target);
            }
            if !layer.visible {
                continue;
            }
            match layer.kind {
                LayerKind::Diagram => {
                    for edge in &edges {
                        let rel = &data.relationships[edge.index];
                        items.push(SceneItem::Relationship {
                            index: edge.index,
                            constraint: rel.constraint_name.clone(),
                            points: edge.points.to_vec(),
                            highlighted: input.highlight.relationships.contains(&edge.index),
                        });
                    }
                    for entity in &data.entities {
                        let Some(bounds) = boxes.get(&entity.name) else {
                            continue;
                        };
                        items.push(SceneItem::Entity {
                            name: entity.name.clone(),
                            bounds: *bounds,
                            rows: entity
                                .columns
                                .iter()
                                .map(|c| EntityRow {
                                    label: c.label(),
                                    primary: c.key == KeyRole::Primary,
                                })
                                .collect(),
                            highlighted: input.highlight.entities.contains(&entity.name),
                        });
                    }
                }
                LayerKind::Rectangle | LayerKind::Text => {
                    let Some(target) = layer.target else {
                        log::trace!("layer {} has no target", layer.id);
                        continue;
                    };
                    if let Some(item) = annotation_item(input, target) {
                        painted.insert(target);
                        items.push(item);
                    }
                }
            }
        }

        let orphans: Vec<ElementId> = input
            .layout
            .rectangles
            .iter()
            .map(|r| r.id)
            .chain(input.layout.texts.iter().map(|t| t.id))
            .filter(|id| !claimed.contains(id) && !painted.contains(id))
            .collect();
        for id in orphans {
            log::trace!("painting annotation {id} without a layer");
            if let Some(item) = annotation_item(input, id) {
                items.push(item);
            }
        }

        self.bounds = boxes.clone();
        Scene {
            items,
            entity_bounds: boxes,
        }
    }
}

fn annotation_item(input: &SceneInput<'_>, id: ElementId) -> Option<SceneItem> {
    let selected = input.selection == Some(id);
    if let Some(rect) = input.layout.rect(id) {
        return Some(SceneItem::Rectangle {
            annotation: rect.clone(),
            selected,
        });
    }
    input.layout.text(id).map(|text| SceneItem::Text {
        bounds: text.bounds(TEXT_CHAR_RATIO),
        annotation: text.clone(),
        selected,
    })
}
