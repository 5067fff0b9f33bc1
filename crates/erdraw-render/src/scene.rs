//! Positioned, ordered scene description produced by the compositor.

use erdraw_core::{Bounds, ElementId, Point, RectAnnotation, TextAnnotation};
use std::collections::HashMap;

/// One of the eight resize handles of a selected rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NorthWest,
        ResizeHandle::North,
        ResizeHandle::NorthEast,
        ResizeHandle::East,
        ResizeHandle::SouthEast,
        ResizeHandle::South,
        ResizeHandle::SouthWest,
        ResizeHandle::West,
    ];

    /// Centre of the handle on `b`.
    pub fn position(self, b: &Bounds) -> Point {
        let cx = b.x + b.width / 2.0;
        let cy = b.y + b.height / 2.0;
        match self {
            ResizeHandle::NorthWest => Point::new(b.x, b.y),
            ResizeHandle::North => Point::new(cx, b.y),
            ResizeHandle::NorthEast => Point::new(b.right(), b.y),
            ResizeHandle::East => Point::new(b.right(), cy),
            ResizeHandle::SouthEast => Point::new(b.right(), b.bottom()),
            ResizeHandle::South => Point::new(cx, b.bottom()),
            ResizeHandle::SouthWest => Point::new(b.x, b.bottom()),
            ResizeHandle::West => Point::new(b.x, cy),
        }
    }

    /// Handle id used in the surface (`data-handle`) and in bridge JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            ResizeHandle::NorthWest => "nw",
            ResizeHandle::North => "n",
            ResizeHandle::NorthEast => "ne",
            ResizeHandle::East => "e",
            ResizeHandle::SouthEast => "se",
            ResizeHandle::South => "s",
            ResizeHandle::SouthWest => "sw",
            ResizeHandle::West => "w",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.as_str() == s)
    }

    /// Whether dragging this handle moves the left / right / top / bottom edge.
    pub fn edges(self) -> (bool, bool, bool, bool) {
        use ResizeHandle::*;
        let left = matches!(self, NorthWest | West | SouthWest);
        let right = matches!(self, NorthEast | East | SouthEast);
        let top = matches!(self, NorthWest | North | NorthEast);
        let bottom = matches!(self, SouthWest | South | SouthEast);
        (left, right, top, bottom)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub label: String,
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneItem {
    Relationship {
        index: usize,
        constraint: String,
        points: Vec<Point>,
        highlighted: bool,
    },
    Entity {
        name: String,
        bounds: Bounds,
        rows: Vec<EntityRow>,
        highlighted: bool,
    },
    Rectangle {
        annotation: RectAnnotation,
        selected: bool,
    },
    Text {
        annotation: TextAnnotation,
        bounds: Bounds,
        selected: bool,
    },
}

impl SceneItem {
    /// Canonical extent of the item.
    pub fn bounds(&self) -> Bounds {
        match self {
            SceneItem::Relationship { points, .. } => {
                let boxes: Vec<Bounds> =
                    points.iter().map(|p| Bounds::new(p.x, p.y, 0.0, 0.0)).collect();
                Bounds::enclosing(&boxes).unwrap_or_default()
            }
            SceneItem::Entity { bounds, .. } | SceneItem::Text { bounds, .. } => *bounds,
            SceneItem::Rectangle { annotation, .. } => annotation.bounds(),
        }
    }

    pub fn annotation_id(&self) -> Option<ElementId> {
        match self {
            SceneItem::Rectangle { annotation, .. } => Some(annotation.id),
            SceneItem::Text { annotation, .. } => Some(annotation.id),
            _ => None,
        }
    }
}

/// Items in paint order (back to front) plus the entity boxes used to build them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub items: Vec<SceneItem>,
    pub entity_bounds: HashMap<String, Bounds>,
}

impl Scene {
    /// Union of every painted item, for zoom-to-fit and export.
    pub fn content_bounds(&self) -> Option<Bounds> {
        let boxes: Vec<Bounds> = self.items.iter().map(SceneItem::bounds).collect();
        Bounds::enclosing(&boxes)
    }

    pub fn rectangle(&self, id: ElementId) -> Option<&RectAnnotation> {
        self.items.iter().find_map(|item| match item {
            SceneItem::Rectangle { annotation, .. } if annotation.id == id => Some(annotation),
            _ => None,
        })
    }

    pub fn relationship_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter_map(|item| match item {
                SceneItem::Relationship { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                SceneItem::Entity { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
