//! Orthogonal edge routing between entity boxes.
//!
//! Every routed edge is a polyline of horizontal and vertical segments.
//! Boxes separated horizontally connect side to side at the rows of the
//! joined columns; boxes stacked vertically connect bottom to top with
//! anchors spread along the shared side; overlapping boxes loop around the
//! right side.

use crate::layout::LayoutMetrics;
use crate::model::{Bounds, DiagramData, Point};
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingConfig {
    /// Horizontal run out of a box before an edge may turn.
    pub stub: f64,
    /// Distance of a self-loop from the right side of its box.
    pub self_loop_offset: f64,
    /// Spacing between anchors sharing one side of a box.
    pub anchor_spacing: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            stub: 20.0,
            self_loop_offset: 30.0,
            anchor_spacing: 12.0,
        }
    }
}

/// A routed relationship. `index` points into `DiagramData::relationships`.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub index: usize,
    pub points: SmallVec<[Point; 6]>,
    pub from_side: Side,
    pub to_side: Side,
}

#[derive(Debug, Clone, Copy)]
enum Plan {
    Horizontal { rightward: bool },
    Vertical { downward: bool },
    AroundRight,
    SelfLoop,
}

struct Endpoints<'a> {
    index: usize,
    from: &'a str,
    to: &'a str,
    a: Bounds,
    b: Bounds,
    plan: Plan,
}

/// Route every relationship whose endpoints both have a box in `boxes`.
/// Relationships naming an unknown entity are skipped.
pub fn route_relationships(
    data: &DiagramData,
    boxes: &HashMap<String, Bounds>,
    metrics: &LayoutMetrics,
    config: &RoutingConfig,
) -> Vec<RoutedEdge> {
    let mut planned = Vec::with_capacity(data.relationships.len());
    for (index, rel) in data.relationships.iter().enumerate() {
        let (Some(a), Some(b)) = (boxes.get(&rel.from), boxes.get(&rel.to)) else {
            log::warn!(
                "dropping relationship {} ({} -> {}): unknown entity",
                rel.constraint_name,
                rel.from,
                rel.to
            );
            continue;
        };
        planned.push(Endpoints {
            index,
            from: &rel.from,
            to: &rel.to,
            a: *a,
            b: *b,
            plan: plan(rel.from == rel.to, a, b),
        });
    }

    let spread = spread_vertical_anchors(&planned, config.anchor_spacing);

    planned
        .iter()
        .map(|e| {
            let rel = &data.relationships[e.index];
            let ys = row_y(data, e.from, &rel.from_column, &e.a, metrics);
            let ye = row_y(data, e.to, &rel.to_column, &e.b, metrics);
            let offsets = spread.get(&e.index).copied().unwrap_or((0.0, 0.0));
            build(e, ys, ye, offsets, config)
        })
        .collect()
}

fn plan(self_ref: bool, a: &Bounds, b: &Bounds) -> Plan {
    if self_ref {
        return Plan::SelfLoop;
    }
    if b.x > a.right() || b.right() < a.x {
        Plan::Horizontal {
            rightward: b.center().x >= a.center().x,
        }
    } else if b.y > a.bottom() || b.bottom() < a.y {
        Plan::Vertical {
            downward: b.center().y >= a.center().y,
        }
    } else {
        Plan::AroundRight
    }
}

/// Row of `column` inside `entity`'s box, or the box centre when unknown.
fn row_y(data: &DiagramData, entity: &str, column: &str, b: &Bounds, m: &LayoutMetrics) -> f64 {
    data.entity(entity)
        .and_then(|e| e.column_index(column))
        .map(|i| m.row_center(b.y, i))
        .filter(|y| *y < b.bottom())
        .unwrap_or_else(|| b.center().y)
}

fn lane_offset(lane: usize, total: usize, spacing: f64) -> f64 {
    if total <= 1 {
        0.0
    } else {
        (lane as f64 - (total - 1) as f64 / 2.0) * spacing
    }
}

/// Horizontal offsets `(from, to)` for vertical edges sharing a side, ordered
/// by the x of the box at the other end so edges do not cross at the anchor.
fn spread_vertical_anchors(planned: &[Endpoints<'_>], spacing: f64) -> HashMap<usize, (f64, f64)> {
    let mut sides: HashMap<(&str, Side), Vec<(usize, bool, f64)>> = HashMap::new();
    for e in planned {
        if let Plan::Vertical { downward } = e.plan {
            let (from_side, to_side) = if downward {
                (Side::Bottom, Side::Top)
            } else {
                (Side::Top, Side::Bottom)
            };
            sides
                .entry((e.from, from_side))
                .or_default()
                .push((e.index, true, e.b.center().x));
            sides
                .entry((e.to, to_side))
                .or_default()
                .push((e.index, false, e.a.center().x));
        }
    }

    let mut offsets: HashMap<usize, (f64, f64)> = HashMap::new();
    for lanes in sides.values_mut() {
        lanes.sort_by(|l, r| l.2.total_cmp(&r.2).then(l.0.cmp(&r.0)));
        let total = lanes.len();
        for (lane, (index, is_from, _)) in lanes.iter().enumerate() {
            let dx = lane_offset(lane, total, spacing);
            let slot = offsets.entry(*index).or_insert((0.0, 0.0));
            if *is_from {
                slot.0 = dx;
            } else {
                slot.1 = dx;
            }
        }
    }
    offsets
}

fn build(
    e: &Endpoints<'_>,
    ys: f64,
    ye: f64,
    (dx_from, dx_to): (f64, f64),
    config: &RoutingConfig,
) -> RoutedEdge {
    let (a, b) = (&e.a, &e.b);
    let (points, from_side, to_side): (SmallVec<[Point; 6]>, Side, Side) = match e.plan {
        Plan::Horizontal { rightward } => {
            let (sx, ex, mid) = if rightward {
                (a.right(), b.x, (a.right() + b.x) / 2.0)
            } else {
                (a.x, b.right(), (a.x + b.right()) / 2.0)
            };
            let sides = if rightward {
                (Side::Right, Side::Left)
            } else {
                (Side::Left, Side::Right)
            };
            let pts = [
                Point::new(sx, ys),
                Point::new(mid, ys),
                Point::new(mid, ye),
                Point::new(ex, ye),
            ];
            (pts.into_iter().collect(), sides.0, sides.1)
        }
        Plan::Vertical { downward } => {
            let sx = a.center().x + dx_from;
            let ex = b.center().x + dx_to;
            let (sy, ey, mid) = if downward {
                (a.bottom(), b.y, (a.bottom() + b.y) / 2.0)
            } else {
                (a.y, b.bottom(), (a.y + b.bottom()) / 2.0)
            };
            let sides = if downward {
                (Side::Bottom, Side::Top)
            } else {
                (Side::Top, Side::Bottom)
            };
            let pts = [
                Point::new(sx, sy),
                Point::new(sx, mid),
                Point::new(ex, mid),
                Point::new(ex, ey),
            ];
            (pts.into_iter().collect(), sides.0, sides.1)
        }
        Plan::AroundRight => {
            let x = a.right().max(b.right()) + config.stub;
            let pts = [
                Point::new(a.right(), ys),
                Point::new(x, ys),
                Point::new(x, ye),
                Point::new(b.right(), ye),
            ];
            (pts.into_iter().collect(), Side::Right, Side::Right)
        }
        Plan::SelfLoop => {
            let x = a.right();
            let ye = if (ye - ys).abs() < f64::EPSILON {
                ys + config.anchor_spacing
            } else {
                ye
            };
            let pts = [
                Point::new(x, ys),
                Point::new(x + config.self_loop_offset, ys),
                Point::new(x + config.self_loop_offset, ye),
                Point::new(x, ye),
            ];
            (pts.into_iter().collect(), Side::Right, Side::Right)
        }
    };
    RoutedEdge {
        index: e.index,
        points: simplify(points),
        from_side,
        to_side,
    }
}

/// Drop repeated points and interior points on a straight run.
fn simplify(points: SmallVec<[Point; 6]>) -> SmallVec<[Point; 6]> {
    let mut out: SmallVec<[Point; 6]> = SmallVec::new();
    for p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            let straight = (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y);
            if straight {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

/// True if every segment of `points` is horizontal or vertical.
pub fn is_orthogonal(points: &[Point]) -> bool {
    points.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, Entity, Relationship};
    use pretty_assertions::assert_eq;

    fn boxes(list: &[(&str, Bounds)]) -> HashMap<String, Bounds> {
        list.iter().map(|(n, b)| (n.to_string(), *b)).collect()
    }

    #[test]
    fn side_by_side_uses_column_rows() {
        let data = DiagramData {
            entities: vec![
                Entity::new("orders")
                    .with_column(Column::new("id", "int"))
                    .with_column(Column::new("user_id", "int")),
                Entity::new("users").with_column(Column::new("id", "int")),
            ],
            relationships: vec![Relationship::new("orders", "user_id", "users", "id")],
        };
        let m = LayoutMetrics::default();
        let b = boxes(&[
            ("orders", Bounds::new(0.0, 0.0, 180.0, 100.0)),
            ("users", Bounds::new(300.0, 40.0, 180.0, 80.0)),
        ]);
        let edges = route_relationships(&data, &b, &m, &RoutingConfig::default());
        assert_eq!(edges.len(), 1);
        let e = &edges[0];
        assert_eq!(e.from_side, Side::Right);
        assert_eq!(e.to_side, Side::Left);
        // user_id is row 1: 32 + 22 + 11; users.id is row 0 of a box at y=40.
        assert_eq!(
            e.points.to_vec(),
            vec![
                Point::new(180.0, 65.0),
                Point::new(240.0, 65.0),
                Point::new(240.0, 83.0),
                Point::new(300.0, 83.0),
            ]
        );
        assert!(is_orthogonal(&e.points));
    }

    #[test]
    fn aligned_rows_collapse_to_a_straight_line() {
        let data = DiagramData {
            entities: vec![],
            relationships: vec![Relationship::new("a", "x", "b", "y")],
        };
        let b = boxes(&[
            ("a", Bounds::new(400.0, 0.0, 100.0, 100.0)),
            ("b", Bounds::new(0.0, 0.0, 100.0, 100.0)),
        ]);
        let edges =
            route_relationships(&data, &b, &LayoutMetrics::default(), &RoutingConfig::default());
        assert_eq!(
            edges[0].points.to_vec(),
            vec![Point::new(400.0, 50.0), Point::new(100.0, 50.0)]
        );
        assert_eq!(edges[0].from_side, Side::Left);
    }

    #[test]
    fn stacked_boxes_spread_anchors() {
        let data = DiagramData {
            entities: vec![],
            relationships: vec![
                Relationship::new("left", "p", "parent", "id"),
                Relationship::new("right", "p", "parent", "id"),
            ],
        };
        let b = boxes(&[
            ("parent", Bounds::new(100.0, 0.0, 200.0, 100.0)),
            ("left", Bounds::new(0.0, 300.0, 200.0, 100.0)),
            ("right", Bounds::new(200.0, 300.0, 200.0, 100.0)),
        ]);
        let edges =
            route_relationships(&data, &b, &LayoutMetrics::default(), &RoutingConfig::default());
        assert_eq!(edges.len(), 2);
        let end_x: Vec<f64> = edges.iter().map(|e| e.points.last().unwrap().x).collect();
        // Both land on parent's bottom side, left one left of centre.
        assert_eq!(end_x, vec![194.0, 206.0]);
        for e in &edges {
            assert_eq!(e.from_side, Side::Top);
            assert_eq!(e.to_side, Side::Bottom);
            assert!(is_orthogonal(&e.points));
        }
    }

    #[test]
    fn self_reference_loops_on_the_right() {
        let data = DiagramData {
            entities: vec![],
            relationships: vec![Relationship::new("emp", "manager_id", "emp", "id")],
        };
        let b = boxes(&[("emp", Bounds::new(0.0, 0.0, 200.0, 100.0))]);
        let edges =
            route_relationships(&data, &b, &LayoutMetrics::default(), &RoutingConfig::default());
        assert_eq!(
            edges[0].points.to_vec(),
            vec![
                Point::new(200.0, 50.0),
                Point::new(230.0, 50.0),
                Point::new(230.0, 62.0),
                Point::new(200.0, 62.0),
            ]
        );
    }

    #[test]
    fn unknown_endpoint_is_dropped() {
        let data = DiagramData {
            entities: vec![],
            relationships: vec![
                Relationship::new("a", "x", "ghost", "id"),
                Relationship::new("a", "x", "b", "id"),
            ],
        };
        let b = boxes(&[
            ("a", Bounds::new(0.0, 0.0, 100.0, 100.0)),
            ("b", Bounds::new(200.0, 0.0, 100.0, 100.0)),
        ]);
        let edges =
            route_relationships(&data, &b, &LayoutMetrics::default(), &RoutingConfig::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].index, 1);
    }
}
