//! Quadric surfaces in the plane
//!
//! A surface is the zero set of an implicit function `f(x, y)`. The halfspace of a
//! point is [`Halfspace::Positive`] when `f ≥ 0` and [`Halfspace::Negative`] otherwise,
//! so a point lying exactly on a surface always belongs to the positive side. Every
//! cell test and every segment endpoint goes through this single tie-break.

use crate::core_types::vec2::Vec2;
use serde::{Deserialize, Serialize};

/// Distances at or below this value are treated as "already on the surface"
pub(crate) const DISTANCE_EPSILON: f64 = 1e-9;

/// Direction components below this magnitude are treated as parallel
const PARALLEL_EPSILON: f64 = 1e-14;

/// Boundary condition applied where a surface bounds the problem domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoundaryType {
    /// Outgoing flux leaves the system, incoming flux is zero
    Vacuum,
    /// Outgoing flux re-enters along the mirrored direction
    Reflective,
    /// Outgoing flux re-enters at the opposite side with the same direction
    Periodic,
    /// Internal surface, no boundary condition
    #[default]
    Interface,
}

/// Side of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Halfspace {
    /// `f(x, y) < 0`
    Negative,
    /// `f(x, y) ≥ 0`
    Positive,
}

impl Halfspace {
    /// Halfspace from a ±1 sign as used in input decks
    pub fn from_sign(sign: i32) -> Option<Self> {
        match sign {
            -1 => Some(Self::Negative),
            1 => Some(Self::Positive),
            _ => None,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Self::Negative => -1,
            Self::Positive => 1,
        }
    }
}

/// Shape of a surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// `x - x0 = 0`
    XPlane { x0: f64 },
    /// `y - y0 = 0`
    YPlane { y0: f64 },
    /// `a·x + b·y - c = 0`
    Plane { a: f64, b: f64, c: f64 },
    /// `(x - x0)² + (y - y0)² - r² = 0`
    Circle { x0: f64, y0: f64, radius: f64 },
}

/// A named surface with its boundary condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    name: String,
    kind: SurfaceKind,
    boundary: BoundaryType,
}

impl Surface {
    pub fn new(kind: SurfaceKind) -> Self {
        Self {
            name: String::new(),
            kind,
            boundary: BoundaryType::Interface,
        }
    }

    pub fn x_plane(x0: f64) -> Self {
        Self::new(SurfaceKind::XPlane { x0 })
    }

    pub fn y_plane(y0: f64) -> Self {
        Self::new(SurfaceKind::YPlane { y0 })
    }

    pub fn plane(a: f64, b: f64, c: f64) -> Self {
        Self::new(SurfaceKind::Plane { a, b, c })
    }

    pub fn circle(x0: f64, y0: f64, radius: f64) -> Self {
        Self::new(SurfaceKind::Circle { x0, y0, radius })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryType) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SurfaceKind {
        &self.kind
    }

    pub fn boundary(&self) -> BoundaryType {
        self.boundary
    }

    /// Check that the coefficients describe a curve
    pub(crate) fn validate(&self) -> Result<(), String> {
        let finite = |values: &[f64]| values.iter().all(|v| v.is_finite());
        match self.kind {
            SurfaceKind::XPlane { x0 } if !x0.is_finite() => Err(format!("x0 = {x0}")),
            SurfaceKind::YPlane { y0 } if !y0.is_finite() => Err(format!("y0 = {y0}")),
            SurfaceKind::Plane { a, b, c } => {
                if !finite(&[a, b, c]) {
                    Err(format!("coefficients ({a}, {b}, {c}) are not finite"))
                } else if a.hypot(b) < PARALLEL_EPSILON {
                    Err("a and b are both zero".to_string())
                } else {
                    Ok(())
                }
            }
            SurfaceKind::Circle { x0, y0, radius } => {
                if !finite(&[x0, y0, radius]) {
                    Err(format!("center ({x0}, {y0}) or radius {radius} is not finite"))
                } else if radius <= 0.0 {
                    Err(format!("radius {radius} must be positive"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Value of the implicit function at `point`
    #[inline]
    pub fn evaluate(&self, point: &Vec2) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x0 } => point.x - x0,
            SurfaceKind::YPlane { y0 } => point.y - y0,
            SurfaceKind::Plane { a, b, c } => a * point.x + b * point.y - c,
            SurfaceKind::Circle { x0, y0, radius } => {
                let dx = point.x - x0;
                let dy = point.y - y0;
                dx * dx + dy * dy - radius * radius
            }
        }
    }

    /// Halfspace containing `point` (points on the surface are positive)
    #[inline]
    pub fn halfspace_of(&self, point: &Vec2) -> Halfspace {
        if self.evaluate(point) >= 0.0 {
            Halfspace::Positive
        } else {
            Halfspace::Negative
        }
    }

    /// Parametric distances at which the ray `point + t·direction` meets the surface
    ///
    /// `direction` must be a unit vector. Returns up to two roots in increasing order,
    /// including negative ones; a tangent ray yields a double root.
    pub fn intersections(&self, point: &Vec2, direction: &Vec2) -> Intersections {
        let line = |a: f64, b: f64, c: f64| {
            let denom = a * direction.x + b * direction.y;
            if denom.abs() < PARALLEL_EPSILON {
                Intersections::none()
            } else {
                Intersections::one((c - a * point.x - b * point.y) / denom)
            }
        };

        match self.kind {
            SurfaceKind::XPlane { x0 } => line(1.0, 0.0, x0),
            SurfaceKind::YPlane { y0 } => line(0.0, 1.0, y0),
            SurfaceKind::Plane { a, b, c } => line(a, b, c),
            SurfaceKind::Circle { x0, y0, radius } => {
                circle_intersections(Vec2::new(x0, y0), radius, point, direction)
            }
        }
    }

    /// Smallest distance strictly ahead of `point` to the surface along `direction`
    pub fn distance_along(&self, point: &Vec2, direction: &Vec2) -> Option<f64> {
        self.intersections(point, direction).first_ahead()
    }
}

/// Roots of a ray/surface intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersections {
    roots: [f64; 2],
    count: usize,
}

impl Intersections {
    pub(crate) const fn none() -> Self {
        Self {
            roots: [0.0; 2],
            count: 0,
        }
    }

    pub(crate) const fn one(t: f64) -> Self {
        Self {
            roots: [t, 0.0],
            count: 1,
        }
    }

    pub(crate) fn two(t1: f64, t2: f64) -> Self {
        Self {
            roots: [t1.min(t2), t1.max(t2)],
            count: 2,
        }
    }

    pub fn roots(&self) -> &[f64] {
        &self.roots[..self.count]
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First root beyond [`DISTANCE_EPSILON`]
    pub fn first_ahead(&self) -> Option<f64> {
        self.roots().iter().copied().find(|&t| t > DISTANCE_EPSILON)
    }
}

/// Ray/circle roots for a unit direction
pub(crate) fn circle_intersections(
    center: Vec2,
    radius: f64,
    point: &Vec2,
    direction: &Vec2,
) -> Intersections {
    let rel = point - center;
    let b = direction.dot(&rel);
    let c = rel.norm_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return Intersections::none();
    }
    let root = discriminant.sqrt();
    Intersections::two(-b - root, -b + root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_halfspace_tie_break_on_surface() {
        let plane = Surface::x_plane(1.0);
        assert_eq!(plane.halfspace_of(&Vec2::new(1.0, 5.0)), Halfspace::Positive);
        assert_eq!(plane.halfspace_of(&Vec2::new(0.999, 5.0)), Halfspace::Negative);

        let circle = Surface::circle(0.0, 0.0, 2.0);
        assert_eq!(circle.halfspace_of(&Vec2::new(2.0, 0.0)), Halfspace::Positive);
        assert_eq!(circle.halfspace_of(&Vec2::new(0.0, 0.0)), Halfspace::Negative);
    }

    #[test]
    fn test_plane_distance() {
        let plane = Surface::plane(1.0, 1.0, 2.0);
        let d = plane
            .distance_along(&Vec2::new(0.0, 0.0), &Vec2::new(1.0, 0.0))
            .unwrap();
        assert_relative_eq!(d, 2.0);

        // Parallel ray never meets the plane
        let yplane = Surface::y_plane(3.0);
        assert!(yplane
            .distance_along(&Vec2::new(0.0, 0.0), &Vec2::new(1.0, 0.0))
            .is_none());
        // Plane behind the ray
        assert!(Surface::x_plane(-1.0)
            .distance_along(&Vec2::new(0.0, 0.0), &Vec2::new(1.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_circle_roots_from_outside_and_inside() {
        let circle = Surface::circle(0.0, 0.0, 1.0);
        let dir = Vec2::new(1.0, 0.0);

        let hits = circle.intersections(&Vec2::new(-3.0, 0.0), &dir);
        assert_eq!(hits.roots().len(), 2);
        assert_relative_eq!(hits.roots()[0], 2.0);
        assert_relative_eq!(hits.roots()[1], 4.0);

        let d = circle.distance_along(&Vec2::new(0.5, 0.0), &dir).unwrap();
        assert_relative_eq!(d, 0.5);
    }

    #[test]
    fn test_tangent_ray_yields_double_root() {
        let circle = Surface::circle(0.0, 0.0, 1.0);
        let hits = circle.intersections(&Vec2::new(-2.0, 1.0), &Vec2::new(1.0, 0.0));
        assert_eq!(hits.roots().len(), 2);
        assert_relative_eq!(hits.roots()[0], hits.roots()[1], epsilon = 1e-12);
        assert_relative_eq!(hits.roots()[0], 2.0, epsilon = 1e-12);

        let miss = circle.intersections(&Vec2::new(-2.0, 1.1), &Vec2::new(1.0, 0.0));
        assert!(miss.is_empty());
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        assert!(Surface::circle(0.0, 0.0, 0.0).validate().is_err());
        assert!(Surface::plane(0.0, 0.0, 1.0).validate().is_err());
        assert!(Surface::x_plane(f64::NAN).validate().is_err());
        assert!(Surface::y_plane(2.0).validate().is_ok());
    }

    #[test]
    fn test_halfspace_from_sign() {
        assert_eq!(Halfspace::from_sign(-1), Some(Halfspace::Negative));
        assert_eq!(Halfspace::from_sign(1).map(Halfspace::sign), Some(1));
        assert_eq!(Halfspace::from_sign(0), None);
    }
}
