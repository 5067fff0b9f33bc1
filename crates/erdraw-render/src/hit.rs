//! Hit testing: canonical point → what is under the pointer.
//!
//! Targets are checked by kind in a fixed priority (resize handle, text,
//! rectangle, entity, relationship) and within a kind from the topmost
//! painted item down.

use crate::scene::{ResizeHandle, Scene, SceneItem};
use erdraw_core::{Bounds, ElementId, Point};
use kurbo::{Line, ParamCurveNearest};

#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    ResizeHandle { id: ElementId, handle: ResizeHandle },
    Text(ElementId),
    Rectangle(ElementId),
    Entity(String),
    Relationship(usize),
    Background,
}

impl HitTarget {
    pub fn annotation(&self) -> Option<ElementId> {
        match self {
            HitTarget::ResizeHandle { id, .. } | HitTarget::Text(id) | HitTarget::Rectangle(id) => {
                Some(*id)
            }
            _ => None,
        }
    }
}

/// Hit-test tolerances in canonical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    /// Edge length of a resize handle.
    pub handle: f64,
    /// Maximum distance from a relationship path.
    pub relationship: f64,
}

impl HitTolerance {
    /// Tolerances given in screen pixels, converted for `scale`.
    pub fn from_screen(handle_px: f64, relationship_px: f64, scale: f64) -> Self {
        Self {
            handle: handle_px / scale,
            relationship: relationship_px / scale,
        }
    }
}

pub fn hit_test(scene: &Scene, p: Point, tol: &HitTolerance) -> HitTarget {
    let items = || scene.items.iter().rev();

    for item in items() {
        if let SceneItem::Rectangle {
            annotation,
            selected: true,
        } = item
        {
            let b = annotation.bounds();
            for handle in ResizeHandle::ALL {
                let c = handle.position(&b);
                let knob = Bounds::new(
                    c.x - tol.handle / 2.0,
                    c.y - tol.handle / 2.0,
                    tol.handle,
                    tol.handle,
                );
                if knob.contains(p) {
                    return HitTarget::ResizeHandle {
                        id: annotation.id,
                        handle,
                    };
                }
            }
        }
    }

    for item in items() {
        if let SceneItem::Text {
            annotation, bounds, ..
        } = item
            && bounds.contains(p)
        {
            return HitTarget::Text(annotation.id);
        }
    }

    for item in items() {
        if let SceneItem::Rectangle { annotation, .. } = item
            && annotation.bounds().contains(p)
        {
            return HitTarget::Rectangle(annotation.id);
        }
    }

    for item in items() {
        if let SceneItem::Entity { name, bounds, .. } = item
            && bounds.contains(p)
        {
            return HitTarget::Entity(name.clone());
        }
    }

    for item in items() {
        if let SceneItem::Relationship { index, points, .. } = item
            && distance_to_polyline(points, p) <= tol.relationship
        {
            return HitTarget::Relationship(*index);
        }
    }

    HitTarget::Background
}

/// Shortest distance from `p` to any segment of `points`.
pub fn distance_to_polyline(points: &[Point], p: Point) -> f64 {
    let target = kurbo::Point::new(p.x, p.y);
    points
        .windows(2)
        .map(|w| {
            let seg = Line::new((w[0].x, w[0].y), (w[1].x, w[1].y));
            seg.nearest(target, 1e-6).distance_sq.sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}
