//! Viewport transform: screen pixels ↔ canonical diagram coordinates.
//!
//! A viewport is a pan offset (screen pixels) and a scale factor. The
//! canonical → screen mapping is `screen = origin + pan + canonical * scale`.
//! Every function takes the viewport explicitly; [`Transform`] only caches the
//! most recent one for callers that have nothing better at hand.

use crate::model::{Bounds, Point};
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;

/// Pan and zoom of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub pan_x: f64,
    pub pan_y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn clamp_scale(scale: f64) -> f64 {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }

    /// Scale after one wheel notch: shrink for positive `delta_y`, grow otherwise.
    pub fn wheel_scale(&self, delta_y: f64) -> f64 {
        let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
        Self::clamp_scale(self.scale * factor)
    }

    /// Re-scale so the canonical point under `screen` stays under `screen`.
    pub fn zoom_about(&self, screen: Point, origin: SurfaceOrigin, new_scale: f64) -> Viewport {
        let anchor = screen_to_canonical(screen, origin, self);
        let scale = Self::clamp_scale(new_scale);
        Viewport {
            pan_x: screen.x - origin.left - anchor.x * scale,
            pan_y: screen.y - origin.top - anchor.y * scale,
            scale,
        }
    }

    /// The SVG transform attribute value for the diagram root group.
    pub fn to_svg_transform(&self) -> String {
        format!(
            "translate({},{}) scale({})",
            self.pan_x, self.pan_y, self.scale
        )
    }
}

/// Top-left corner of the drawing surface in screen (client) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceOrigin {
    pub left: f64,
    pub top: f64,
}

/// Size of the visible drawing surface in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

pub fn screen_to_canonical(p: Point, origin: SurfaceOrigin, viewport: &Viewport) -> Point {
    Point::new(
        (p.x - origin.left - viewport.pan_x) / viewport.scale,
        (p.y - origin.top - viewport.pan_y) / viewport.scale,
    )
}

pub fn canonical_to_screen(p: Point, origin: SurfaceOrigin, viewport: &Viewport) -> Point {
    Point::new(
        p.x * viewport.scale + viewport.pan_x + origin.left,
        p.y * viewport.scale + viewport.pan_y + origin.top,
    )
}

pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Largest scale at which `content` fits inside `size` minus `padding` on
/// every side. Zero-extent content fits at 1.
pub fn fit_scale(content: &Bounds, size: SurfaceSize, padding: f64) -> f64 {
    if content.width <= 0.0 || content.height <= 0.0 {
        return 1.0;
    }
    let avail_w = (size.width - padding * 2.0).max(1.0);
    let avail_h = (size.height - padding * 2.0).max(1.0);
    Viewport::clamp_scale((avail_w / content.width).min(avail_h / content.height))
}

/// Pan that centres `content` on a surface of `size` at `scale`.
pub fn centering_pan(content: &Bounds, size: SurfaceSize, scale: f64) -> (f64, f64) {
    let pan_x = (size.width - content.width * scale) / 2.0 - content.x * scale;
    let pan_y = (size.height - content.height * scale) / 2.0 - content.y * scale;
    (pan_x, pan_y)
}

/// Convenience wrapper holding the surface origin and the last known
/// viewport. Every method accepts an override.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transform {
    pub origin: SurfaceOrigin,
    pub current: Viewport,
}

impl Transform {
    pub fn new(origin: SurfaceOrigin, current: Viewport) -> Self {
        Self { origin, current }
    }

    pub fn screen_to_canonical(&self, p: Point, viewport: Option<&Viewport>) -> Point {
        screen_to_canonical(p, self.origin, viewport.unwrap_or(&self.current))
    }

    pub fn canonical_to_screen(&self, p: Point, viewport: Option<&Viewport>) -> Point {
        canonical_to_screen(p, self.origin, viewport.unwrap_or(&self.current))
    }
}
