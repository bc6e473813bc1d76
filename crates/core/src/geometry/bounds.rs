//! Axis-aligned bounding box of the problem domain

use super::surface::BoundaryType;
use crate::core_types::ids::SurfaceId;
use crate::core_types::vec2::Vec2;
use serde::{Deserialize, Serialize};

/// One of the four sides of the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoxSide {
    Left,
    Right,
    Bottom,
    Top,
}

impl BoxSide {
    pub const ALL: [BoxSide; 4] = [Self::Left, Self::Right, Self::Bottom, Self::Top];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Top => Self::Bottom,
        }
    }
}

/// Surface closing one side of the domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundarySide {
    pub surface: SurfaceId,
    pub boundary: BoundaryType,
}

/// Bounding box of the root universe with the boundary condition of each side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
    sides: [BoundarySide; 4],
}

impl BoundingBox {
    pub(crate) fn new(min: Vec2, max: Vec2, sides: [BoundarySide; 4]) -> Self {
        Self { min, max, sides }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Closed containment test
    pub fn contains(&self, point: &Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn side(&self, side: BoxSide) -> BoundarySide {
        self.sides[side.index()]
    }

    pub fn boundary(&self, side: BoxSide) -> BoundaryType {
        self.sides[side.index()].boundary
    }

    /// Distance ahead from an interior point to the box along `direction`
    /// together with the side that is hit
    pub fn exit(&self, point: &Vec2, direction: &Vec2) -> Option<(f64, BoxSide)> {
        let x_hit = if direction.x > 0.0 {
            Some(((self.max.x - point.x) / direction.x, BoxSide::Right))
        } else if direction.x < 0.0 {
            Some(((self.min.x - point.x) / direction.x, BoxSide::Left))
        } else {
            None
        };
        let y_hit = if direction.y > 0.0 {
            Some(((self.max.y - point.y) / direction.y, BoxSide::Top))
        } else if direction.y < 0.0 {
            Some(((self.min.y - point.y) / direction.y, BoxSide::Bottom))
        } else {
            None
        };
        match (x_hit, y_hit) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> BoundingBox {
        let side = BoundarySide {
            surface: SurfaceId::new(0),
            boundary: BoundaryType::Vacuum,
        };
        BoundingBox::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0), [side; 4])
    }

    #[test]
    fn test_opposite_sides() {
        for side in BoxSide::ALL {
            assert_eq!(side.opposite().opposite(), side);
            assert_ne!(side.opposite(), side);
        }
    }

    #[test]
    fn test_exit_picks_nearest_side() {
        let bbox = unit_box();
        let dir = Vec2::new(1.0, 1.0).normalize();
        let (t, side) = bbox.exit(&Vec2::new(0.5, -0.5), &dir).unwrap();
        assert_eq!(side, BoxSide::Right);
        assert_relative_eq!(t, 0.5 * 2.0_f64.sqrt(), epsilon = 1e-12);

        let (t, side) = bbox.exit(&Vec2::new(0.0, 0.0), &Vec2::new(0.0, -1.0)).unwrap();
        assert_eq!(side, BoxSide::Bottom);
        assert_relative_eq!(t, 1.0);
    }

    #[test]
    fn test_extent() {
        let bbox = unit_box();
        assert_relative_eq!(bbox.area(), 4.0);
        assert!(bbox.contains(&Vec2::new(1.0, -1.0)));
        assert!(!bbox.contains(&Vec2::new(1.0001, 0.0)));
    }
}
