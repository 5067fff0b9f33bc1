//! Entity box geometry and deterministic fallback placement.

use crate::document::LayoutDocument;
use crate::model::{Bounds, Entity, Point};
use std::collections::HashMap;

/// Font-independent text metrics used to size entity boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    pub char_width: f64,
    pub min_entity_width: f64,
    pub header_height: f64,
    pub row_height: f64,
    pub padding: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            min_entity_width: 180.0,
            header_height: 32.0,
            row_height: 22.0,
            padding: 12.0,
        }
    }
}

impl LayoutMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }

    /// Vertical centre of column row `index` inside an entity box at `top`.
    pub fn row_center(&self, top: f64, index: usize) -> f64 {
        top + self.header_height + index as f64 * self.row_height + self.row_height / 2.0
    }
}

/// Width and height of an entity box. Depends only on the entity.
pub fn entity_size(entity: &Entity, metrics: &LayoutMetrics) -> (f64, f64) {
    let longest = entity
        .columns
        .iter()
        .map(|c| metrics.text_width(&c.label()))
        .fold(metrics.text_width(&entity.name), f64::max);
    let width = (longest + metrics.padding * 2.0).max(metrics.min_entity_width);
    let height =
        metrics.header_height + entity.columns.len() as f64 * metrics.row_height + metrics.padding;
    (width, height)
}

/// Fallback grid for entities without a stored position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterGrid {
    pub cell_width: f64,
    pub cell_height: f64,
    pub margin: f64,
}

impl Default for ClusterGrid {
    fn default() -> Self {
        Self {
            cell_width: 250.0,
            cell_height: 200.0,
            margin: 50.0,
        }
    }
}

impl ClusterGrid {
    pub fn grid_width(count: usize) -> usize {
        ((count as f64).sqrt().ceil() as usize).max(1)
    }

    /// Position of slot `index` in a grid sized for `count` entities.
    pub fn slot(&self, index: usize, count: usize) -> Point {
        let width = Self::grid_width(count);
        let col = index % width;
        let row = index / width;
        Point::new(
            col as f64 * self.cell_width + self.margin,
            row as f64 * self.cell_height + self.margin,
        )
    }
}

/// Clustered positions remembered across renders, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    positions: HashMap<String, Point>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Forget every clustered slot. The next resolve re-clusters.
    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// Resolve the position of every entity, index-aligned with `entities`.
///
/// A stored position wins; otherwise the cached slot; otherwise a grid slot
/// computed from the entity's index in the full list, which is then cached.
pub fn resolve_positions(
    entities: &[Entity],
    layout: &LayoutDocument,
    cache: &mut PositionCache,
    grid: &ClusterGrid,
) -> Vec<Point> {
    let count = entities.len();
    entities
        .iter()
        .enumerate()
        .map(|(index, entity)| {
            if let Some(p) = layout.position(&entity.name) {
                return p;
            }
            *cache
                .positions
                .entry(entity.name.clone())
                .or_insert_with(|| {
                    let p = grid.slot(index, count);
                    log::debug!("clustered {} at ({}, {})", entity.name, p.x, p.y);
                    p
                })
        })
        .collect()
}

/// Bounding boxes of every entity, keyed by name.
pub fn entity_bounds(
    entities: &[Entity],
    positions: &[Point],
    metrics: &LayoutMetrics,
) -> HashMap<String, Bounds> {
    entities
        .iter()
        .zip(positions)
        .map(|(entity, p)| {
            let (w, h) = entity_size(entity, metrics);
            (entity.name.clone(), Bounds::new(p.x, p.y, w, h))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;
    use pretty_assertions::assert_eq;

    #[test]
    fn size_grows_with_longest_label() {
        let m = LayoutMetrics::default();
        let small = Entity::new("t").with_column(Column::new("id", "int"));
        assert_eq!(entity_size(&small, &m), (180.0, 32.0 + 22.0 + 12.0));

        let wide = Entity::new("t").with_column(Column::new(
            "a_really_long_column_name",
            "varchar(255)",
        ));
        let (w, _) = entity_size(&wide, &m);
        // "a_really_long_column_name: varchar(255)" is 39 chars.
        assert_eq!(w, 39.0 * 8.0 + 24.0);
    }

    #[test]
    fn grid_width_is_ceil_sqrt() {
        assert_eq!(ClusterGrid::grid_width(0), 1);
        assert_eq!(ClusterGrid::grid_width(1), 1);
        assert_eq!(ClusterGrid::grid_width(3), 2);
        assert_eq!(ClusterGrid::grid_width(4), 2);
        assert_eq!(ClusterGrid::grid_width(5), 3);
    }

    #[test]
    fn stored_positions_win_over_grid() {
        let entities = vec![Entity::new("a"), Entity::new("b")];
        let mut layout = LayoutDocument::new();
        layout.set_position("a", Point::new(7.0, 9.0));
        let mut cache = PositionCache::new();
        let ps = resolve_positions(&entities, &layout, &mut cache, &ClusterGrid::default());
        assert_eq!(ps, vec![Point::new(7.0, 9.0), Point::new(300.0, 50.0)]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_slots_survive_list_changes() {
        let grid = ClusterGrid::default();
        let layout = LayoutDocument::new();
        let mut cache = PositionCache::new();
        let first = vec![Entity::new("a"), Entity::new("b")];
        resolve_positions(&first, &layout, &mut cache, &grid);

        let second = vec![Entity::new("z"), Entity::new("a"), Entity::new("b")];
        let ps = resolve_positions(&second, &layout, &mut cache, &grid);
        assert_eq!(ps[1], Point::new(50.0, 50.0));
        assert_eq!(ps[2], Point::new(300.0, 50.0));

        cache.clear();
        let ps = resolve_positions(&second, &layout, &mut cache, &grid);
        assert_eq!(ps[0], Point::new(50.0, 50.0));
    }
}
