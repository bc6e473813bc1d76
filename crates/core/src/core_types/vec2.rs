//! Vector type alias for 2D positions and directions.

use nalgebra::Vector2;

/// 2D vector type for positions and ray directions.
///
/// This is a simple alias for `nalgebra::Vector2<f64>`, used throughout
/// the geometry and track generator for points in a universe frame and for
/// unit direction vectors along tracks.
pub type Vec2 = Vector2<f64>;

/// Unit direction for an azimuthal angle in radians.
#[inline]
pub fn direction(phi: f64) -> Vec2 {
    Vec2::new(phi.cos(), phi.sin())
}
