//! Semantic events raised by the canvas for the host page.

use erdraw_core::{ElementId, Point};
use erdraw_render::HitTarget;
use serde::Serialize;

/// What a context menu was requested on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContextTarget {
    Entity { name: String },
    Annotation { id: ElementId },
    Relationship { index: usize },
    Background,
}

impl From<&HitTarget> for ContextTarget {
    fn from(hit: &HitTarget) -> Self {
        match hit {
            HitTarget::Entity(name) => ContextTarget::Entity { name: name.clone() },
            HitTarget::Relationship(index) => ContextTarget::Relationship { index: *index },
            HitTarget::ResizeHandle { id, .. } | HitTarget::Text(id) | HitTarget::Rectangle(id) => {
                ContextTarget::Annotation { id: *id }
            }
            HitTarget::Background => ContextTarget::Background,
        }
    }
}

/// Serialized as `{"type":"entity-click", ...}` for the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EditorEvent {
    EntityClick {
        entity: String,
    },
    #[serde(rename = "entity-dblclick")]
    EntityDoubleClick {
        entity: String,
    },
    RelationshipClick {
        index: usize,
        constraint: String,
    },
    ContextMenuRequested {
        target: ContextTarget,
        canonical: Point,
        screen: Point,
    },
}
