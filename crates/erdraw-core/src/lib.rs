pub mod document;
pub mod id;
pub mod layers;
pub mod layout;
pub mod model;
pub mod routing;
pub mod schema;
pub mod viewport;

pub use document::{EntityLayout, LayoutDocument, LayoutError, SidebarState};
pub use id::ElementId;
pub use layers::{LayerStack, paint_order};
pub use layout::{
    ClusterGrid, LayoutMetrics, PositionCache, entity_bounds, entity_size, resolve_positions,
};
pub use model::*;
pub use routing::{RoutedEdge, RoutingConfig, Side, is_orthogonal, route_relationships};
pub use schema::{Highlight, SchemaGraph};
pub use viewport::{SurfaceOrigin, SurfaceSize, Transform, Viewport};
