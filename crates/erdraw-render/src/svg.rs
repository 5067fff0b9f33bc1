//! Standalone SVG export of a composed scene.

use crate::paint::Painter;
use crate::scene::{Scene, SceneItem};
use crate::surface::{RetainedSurface, Surface, SurfaceError};
use erdraw_core::{Bounds, Viewport};

const EXPORT_PADDING: f64 = 16.0;

/// Paint `scene` at identity transform into a self-contained SVG document
/// whose view box hugs the content. Selection handles are not exported.
pub fn export_svg(scene: &Scene, painter: &Painter) -> Result<String, SurfaceError> {
    let mut clean = scene.clone();
    for item in &mut clean.items {
        match item {
            SceneItem::Rectangle { selected, .. } | SceneItem::Text { selected, .. } => {
                *selected = false
            }
            _ => {}
        }
    }

    let mut surface = RetainedSurface::new();
    painter.paint(&mut surface, &clean, &Viewport::default())?;

    let content = clean
        .content_bounds()
        .unwrap_or(Bounds::new(0.0, 0.0, 800.0, 600.0));
    let x = content.x - EXPORT_PADDING;
    let y = content.y - EXPORT_PADDING;
    let width = content.width + EXPORT_PADDING * 2.0;
    let height = content.height + EXPORT_PADDING * 2.0;

    let root = surface.root();
    surface.set_attribute(&root, "width", &width.to_string())?;
    surface.set_attribute(&root, "height", &height.to_string())?;
    surface.set_attribute(&root, "viewBox", &format!("{x} {y} {width} {height}"))?;
    surface.set_attribute(
        &root,
        "style",
        &format!("background: {}", painter.theme.background),
    )?;
    Ok(surface.to_svg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use erdraw_core::{ElementId, RectAnnotation};

    #[test]
    fn view_box_hugs_content_and_drops_handles() {
        let scene = Scene {
            items: vec![SceneItem::Rectangle {
                annotation: RectAnnotation::new(
                    ElementId::intern("export_rect"),
                    Bounds::new(10.0, 20.0, 100.0, 60.0),
                ),
                selected: true,
            }],
            ..Scene::default()
        };
        let svg = export_svg(&scene, &Painter::default()).unwrap();
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(svg.contains("viewBox=\"-6 4 132 92\""), "{svg}");
        assert!(!svg.contains("resize-handle"));
        assert!(svg.contains("data-annotation=\"export_rect\""));
    }

    #[test]
    fn empty_scene_uses_default_canvas() {
        let svg = export_svg(&Scene::default(), &Painter::default()).unwrap();
        assert!(svg.contains("width=\"832\""));
    }
}
