//! Core data model for entity-relationship diagrams.
//!
//! Entities and relationships are structural input: the engine never edits
//! them, only where they are drawn. Annotations (rectangles and free text)
//! and layers are owned by the diagram and edited interactively. Every
//! explicitly created annotation is referenced by exactly one layer through
//! `Layer::target`.

use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point in canonical diagram coordinates (or screen pixels, by context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned box in canonical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized box spanning two arbitrary corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if this box overlaps another (AABB overlap).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Union of every box in the iterator, `None` when empty.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a Bounds>) -> Option<Bounds> {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(a) => Some(a.union(b)),
        })
    }
}

// ─── Structural input ────────────────────────────────────────────────────

/// Index participation of a column, as reported by schema introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyRole {
    #[serde(rename = "PRI")]
    Primary,
    #[serde(rename = "UNI")]
    Unique,
    #[serde(rename = "MUL")]
    Multiple,
    #[default]
    #[serde(other, rename = "")]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub key: KeyRole,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub extra: Option<String>,
}

impl Column {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            key: KeyRole::None,
            nullable: false,
            default: None,
            extra: None,
        }
    }

    /// The single-line label drawn for this column row.
    pub fn label(&self) -> String {
        match self.key {
            KeyRole::Primary => format!("PK {}: {}", self.name, self.data_type),
            _ => format!("{}: {}", self.name, self.data_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// A database table (or view) as drawn on the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub foreign_keys: SmallVec<[ForeignKey; 2]>,
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            foreign_keys: SmallVec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// A foreign-key edge between two entities, referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub from: String,
    #[serde(default)]
    pub from_column: String,
    pub to: String,
    #[serde(default)]
    pub to_column: String,
    #[serde(default)]
    pub constraint_name: String,
}

impl Relationship {
    pub fn new(from: &str, from_column: &str, to: &str, to_column: &str) -> Self {
        Self {
            from: from.to_string(),
            from_column: from_column.to_string(),
            to: to.to_string(),
            to_column: to_column.to_string(),
            constraint_name: format!("fk_{from}_{from_column}"),
        }
    }

    pub fn touches(&self, entity: &str) -> bool {
        self.from == entity || self.to == entity
    }
}

/// The structural half of a diagram: what the server reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramData {
    #[serde(default, alias = "tables")]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl DiagramData {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

// ─── Annotations ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectAnnotation {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_rect_color")]
    pub color: String,
    #[serde(default = "default_rect_stroke")]
    pub stroke: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

impl RectAnnotation {
    pub fn new(id: ElementId, bounds: Bounds) -> Self {
        Self {
            id,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            color: default_rect_color(),
            stroke: default_rect_stroke(),
            stroke_width: default_stroke_width(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_bounds(&mut self, b: Bounds) {
        self.x = b.x;
        self.y = b.y;
        self.width = b.width;
        self.height = b.height;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    pub content: String,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

impl TextAnnotation {
    pub fn new(id: ElementId, at: Point, content: &str) -> Self {
        Self {
            id,
            x: at.x,
            y: at.y,
            content: content.to_string(),
            color: default_text_color(),
            font_size: default_font_size(),
        }
    }

    /// Approximate extent: `(x, y)` is the baseline origin of the first line.
    pub fn bounds(&self, char_width_ratio: f64) -> Bounds {
        let lines = self.content.lines().count().max(1) as f64;
        let longest = self
            .content
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as f64;
        Bounds::new(
            self.x,
            self.y - self.font_size,
            (longest * self.font_size * char_width_ratio).max(self.font_size),
            lines * self.font_size * 1.2,
        )
    }
}

fn default_rect_color() -> String {
    "rgba(255, 235, 59, 0.25)".to_string()
}

fn default_rect_stroke() -> String {
    "#F9A825".to_string()
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_text_color() -> String {
    "#333333".to_string()
}

fn default_font_size() -> f64 {
    14.0
}

/// The annotation kinds addressable by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Rectangle,
    Text,
}

// ─── Layers ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Diagram,
    Rectangle,
    Text,
}

impl From<AnnotationKind> for LayerKind {
    fn from(kind: AnnotationKind) -> Self {
        match kind {
            AnnotationKind::Rectangle => LayerKind::Rectangle,
            AnnotationKind::Text => LayerKind::Text,
        }
    }
}

/// A named, orderable unit of paint order.
///
/// `order` is authoritative: higher values paint later (nearer the front).
/// `target` links annotation layers to the annotation they paint; the
/// diagram layer has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: ElementId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
}

fn default_visible() -> bool {
    true
}

pub const DIAGRAM_LAYER_ID: &str = "diagram";

impl Layer {
    pub fn diagram() -> Self {
        Self {
            id: ElementId::intern(DIAGRAM_LAYER_ID),
            name: "Diagram".to_string(),
            kind: LayerKind::Diagram,
            order: 0,
            visible: true,
            target: None,
        }
    }

    pub fn for_annotation(id: ElementId, kind: AnnotationKind, name: String, order: i32) -> Self {
        Self {
            id: ElementId::intern(&format!("layer_{}", id.as_str())),
            name,
            kind: kind.into(),
            order,
            visible: true,
            target: Some(id),
        }
    }
}
