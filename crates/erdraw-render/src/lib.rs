pub mod compositor;
pub mod hit;
pub mod paint;
pub mod scene;
pub mod surface;
pub mod svg;

pub use compositor::{Compositor, SceneInput, TEXT_CHAR_RATIO};
pub use hit::{HitTarget, HitTolerance, hit_test};
pub use paint::{Painter, Theme, VIEWPORT_GROUP_ID, apply_viewport};
pub use scene::{EntityRow, ResizeHandle, Scene, SceneItem};
pub use surface::{NodeHandle, RetainedSurface, Surface, SurfaceError};
pub use svg::export_svg;
