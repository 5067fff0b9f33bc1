//! Scene → surface elements.
//!
//! Every pass replaces the viewport group under the surface root and paints
//! the scene items into it in order, so later items sit on top. The viewport
//! transform lives on that group alone and can be re-applied without a
//! repaint.

use crate::scene::{ResizeHandle, Scene, SceneItem};
use crate::surface::{Surface, SurfaceError};
use erdraw_core::{Bounds, LayoutMetrics, Point, RectAnnotation, TextAnnotation, Viewport};
use kurbo::BezPath;

pub const VIEWPORT_GROUP_ID: &str = "erd-viewport";

/// Theme-dependent colors for the painter.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: &'static str,
    pub entity_fill: &'static str,
    pub entity_stroke: &'static str,
    pub header_fill: &'static str,
    pub header_text: &'static str,
    pub row_text: &'static str,
    pub edge_stroke: &'static str,
    pub highlight: &'static str,
    pub handle_fill: &'static str,
    pub selection: &'static str,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            background: "#F5F5F7",
            entity_fill: "#FFFFFF",
            entity_stroke: "#C7C7CC",
            header_fill: "#3A7BD5",
            header_text: "#FFFFFF",
            row_text: "#1D1D1F",
            edge_stroke: "#86868B",
            highlight: "#FF9500",
            handle_fill: "#FFFFFF",
            selection: "#007AFF",
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#1C1C1E",
            entity_fill: "#2C2C2E",
            entity_stroke: "#48484A",
            header_fill: "#0A84FF",
            header_text: "#FFFFFF",
            row_text: "#E5E5EA",
            edge_stroke: "#98989D",
            highlight: "#FF9F0A",
            handle_fill: "#1C1C1E",
            selection: "#0A84FF",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

/// Paints [`Scene`]s onto any [`Surface`].
#[derive(Debug, Clone)]
pub struct Painter {
    pub theme: Theme,
    pub metrics: LayoutMetrics,
    /// Resize handle edge length in screen pixels.
    pub handle_size: f64,
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(Theme::light(), LayoutMetrics::default(), 8.0)
    }
}

impl Painter {
    pub fn new(theme: Theme, metrics: LayoutMetrics, handle_size: f64) -> Self {
        Self {
            theme,
            metrics,
            handle_size,
        }
    }

    /// Replace whatever was painted before with `scene`, then apply `viewport`.
    pub fn paint<S: Surface>(
        &self,
        surface: &mut S,
        scene: &Scene,
        viewport: &Viewport,
    ) -> Result<S::Element, SurfaceError> {
        if let Some(old) = surface.find_by_id(VIEWPORT_GROUP_ID) {
            surface.remove(&old)?;
        }
        let root = surface.root();
        let group = surface.create("g")?;
        surface.set_attribute(&group, "id", VIEWPORT_GROUP_ID)?;
        surface.append(&root, &group)?;

        let handle = self.handle_size / viewport.scale;
        for item in &scene.items {
            match item {
                SceneItem::Relationship {
                    index,
                    constraint,
                    points,
                    highlighted,
                } => self.paint_relationship(
                    surface,
                    &group,
                    *index,
                    constraint,
                    points,
                    *highlighted,
                )?,
                SceneItem::Entity {
                    name,
                    bounds,
                    rows,
                    highlighted,
                } => {
                    let el = self.paint_entity(surface, &group, name, bounds, rows)?;
                    if *highlighted {
                        surface.add_class(&el, "highlighted")?;
                    }
                }
                SceneItem::Rectangle {
                    annotation,
                    selected,
                } => self.paint_rectangle(surface, &group, annotation, *selected, handle)?,
                SceneItem::Text {
                    annotation,
                    bounds,
                    selected,
                } => self.paint_text(surface, &group, annotation, bounds, *selected)?,
            }
        }

        apply_viewport(surface, viewport)?;
        Ok(group)
    }

    fn paint_relationship<S: Surface>(
        &self,
        surface: &mut S,
        parent: &S::Element,
        index: usize,
        constraint: &str,
        points: &[Point],
        highlighted: bool,
    ) -> Result<(), SurfaceError> {
        let path = surface.create("path")?;
        surface.add_class(&path, "relationship")?;
        if highlighted {
            surface.add_class(&path, "highlighted")?;
        }
        surface.set_attribute(&path, "d", &polyline(points).to_svg())?;
        surface.set_attribute(&path, "fill", "none")?;
        let stroke = if highlighted {
            self.theme.highlight
        } else {
            self.theme.edge_stroke
        };
        surface.set_attribute(&path, "stroke", stroke)?;
        surface.set_attribute(&path, "stroke-width", if highlighted { "2" } else { "1.5" })?;
        surface.set_attribute(&path, "data-relationship", &index.to_string())?;
        surface.set_attribute(&path, "data-constraint", constraint)?;
        surface.append(parent, &path)
    }

    fn paint_entity<S: Surface>(
        &self,
        surface: &mut S,
        parent: &S::Element,
        name: &str,
        b: &Bounds,
        rows: &[crate::scene::EntityRow],
    ) -> Result<S::Element, SurfaceError> {
        let m = &self.metrics;
        let g = surface.create("g")?;
        surface.add_class(&g, "entity")?;
        surface.set_attribute(&g, "data-entity", name)?;

        let body = surface.create("rect")?;
        set_box(surface, &body, b)?;
        surface.set_attribute(&body, "rx", "4")?;
        surface.set_attribute(&body, "fill", self.theme.entity_fill)?;
        surface.set_attribute(&body, "stroke", self.theme.entity_stroke)?;
        surface.append(&g, &body)?;

        let header = surface.create("rect")?;
        set_box(surface, &header, &Bounds::new(b.x, b.y, b.width, m.header_height))?;
        surface.set_attribute(&header, "fill", self.theme.header_fill)?;
        surface.add_class(&header, "entity-header")?;
        surface.append(&g, &header)?;

        let title = surface.create("text")?;
        surface.set_attribute(&title, "x", &(b.x + m.padding).to_string())?;
        surface.set_attribute(&title, "y", &(b.y + m.header_height * 0.65).to_string())?;
        surface.set_attribute(&title, "fill", self.theme.header_text)?;
        surface.set_attribute(&title, "font-weight", "bold")?;
        surface.set_text(&title, name)?;
        surface.append(&g, &title)?;

        for (i, row) in rows.iter().enumerate() {
            let text = surface.create("text")?;
            surface.add_class(&text, "column")?;
            if row.primary {
                surface.add_class(&text, "primary-key")?;
            }
            surface.set_attribute(&text, "x", &(b.x + m.padding).to_string())?;
            let y = m.row_center(b.y, i) + m.row_height * 0.25;
            surface.set_attribute(&text, "y", &y.to_string())?;
            surface.set_attribute(&text, "fill", self.theme.row_text)?;
            surface.set_text(&text, &row.label)?;
            surface.append(&g, &text)?;
        }

        surface.append(parent, &g)?;
        Ok(g)
    }

    fn paint_rectangle<S: Surface>(
        &self,
        surface: &mut S,
        parent: &S::Element,
        rect: &RectAnnotation,
        selected: bool,
        handle: f64,
    ) -> Result<(), SurfaceError> {
        let el = surface.create("rect")?;
        surface.add_class(&el, "annotation-rect")?;
        surface.set_attribute(&el, "data-annotation", rect.id.as_str())?;
        set_box(surface, &el, &rect.bounds())?;
        surface.set_attribute(&el, "fill", &rect.color)?;
        surface.set_attribute(&el, "stroke", &rect.stroke)?;
        surface.set_attribute(&el, "stroke-width", &rect.stroke_width.to_string())?;
        surface.append(parent, &el)?;
        if !selected {
            return Ok(());
        }
        surface.add_class(&el, "selected")?;
        for h in ResizeHandle::ALL {
            let c = h.position(&rect.bounds());
            let knob = surface.create("rect")?;
            surface.add_class(&knob, "resize-handle")?;
            surface.set_attribute(&knob, "data-handle", h.as_str())?;
            surface.set_attribute(&knob, "data-annotation", rect.id.as_str())?;
            set_box(
                surface,
                &knob,
                &Bounds::new(c.x - handle / 2.0, c.y - handle / 2.0, handle, handle),
            )?;
            surface.set_attribute(&knob, "fill", self.theme.handle_fill)?;
            surface.set_attribute(&knob, "stroke", self.theme.selection)?;
            surface.append(parent, &knob)?;
        }
        Ok(())
    }

    fn paint_text<S: Surface>(
        &self,
        surface: &mut S,
        parent: &S::Element,
        text: &TextAnnotation,
        bounds: &Bounds,
        selected: bool,
    ) -> Result<(), SurfaceError> {
        if selected {
            let outline = surface.create("rect")?;
            surface.add_class(&outline, "selection-outline")?;
            set_box(surface, &outline, bounds)?;
            surface.set_attribute(&outline, "fill", "none")?;
            surface.set_attribute(&outline, "stroke", self.theme.selection)?;
            surface.set_attribute(&outline, "stroke-dasharray", "4 2")?;
            surface.append(parent, &outline)?;
        }

        let el = surface.create("text")?;
        surface.add_class(&el, "annotation-text")?;
        if selected {
            surface.add_class(&el, "selected")?;
        }
        surface.set_attribute(&el, "data-annotation", text.id.as_str())?;
        surface.set_attribute(&el, "x", &text.x.to_string())?;
        surface.set_attribute(&el, "y", &text.y.to_string())?;
        surface.set_attribute(&el, "fill", &text.color)?;
        surface.set_attribute(&el, "font-size", &text.font_size.to_string())?;

        let lines: Vec<&str> = text.content.lines().collect();
        if lines.len() <= 1 {
            surface.set_text(&el, &text.content)?;
        } else {
            for (i, line) in lines.iter().enumerate() {
                let span = surface.create("tspan")?;
                surface.set_attribute(&span, "x", &text.x.to_string())?;
                surface.set_attribute(&span, "dy", if i == 0 { "0" } else { "1.2em" })?;
                surface.set_text(&span, line)?;
                surface.append(&el, &span)?;
            }
        }
        surface.append(parent, &el)
    }
}

/// Set the transform of the viewport group. Cheap enough for every pan tick.
pub fn apply_viewport<S: Surface>(surface: &mut S, viewport: &Viewport) -> Result<(), SurfaceError> {
    let group = surface
        .find_by_id(VIEWPORT_GROUP_ID)
        .ok_or_else(|| SurfaceError::UnknownElement(VIEWPORT_GROUP_ID.to_string()))?;
    surface.set_attribute(&group, "transform", &viewport.to_svg_transform())
}

fn set_box<S: Surface>(surface: &mut S, el: &S::Element, b: &Bounds) -> Result<(), SurfaceError> {
    surface.set_attribute(el, "x", &b.x.to_string())?;
    surface.set_attribute(el, "y", &b.y.to_string())?;
    surface.set_attribute(el, "width", &b.width.to_string())?;
    surface.set_attribute(el, "height", &b.height.to_string())
}

fn polyline(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    for (i, p) in points.iter().enumerate() {
        let k = kurbo::Point::new(p.x, p.y);
        if i == 0 {
            path.move_to(k);
        } else {
            path.line_to(k);
        }
    }
    path
}
