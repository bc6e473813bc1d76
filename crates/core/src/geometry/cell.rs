//! Cells: intersections of halfspaces filled with a material, universe or lattice

use super::surface::{circle_intersections, Halfspace, Surface, SurfaceKind, DISTANCE_EPSILON};
use crate::core_types::ids::{LatticeId, MaterialId, SurfaceId, UniverseId};
use crate::core_types::vec2::Vec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Content of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fill {
    /// Homogeneous material, the cell is a leaf of the CSG tree
    Material(MaterialId),
    /// Nested universe sharing the cell's frame
    Universe(UniverseId),
    /// Lattice centered on the cell's frame origin
    Lattice(LatticeId),
}

/// Region bounded by a set of `(surface, halfspace)` constraints
///
/// A cell without surfaces is unbounded and relies on the lattice cell or
/// universe it sits in for confinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    name: String,
    surfaces: Vec<(SurfaceId, Halfspace)>,
    fill: Option<Fill>,
    rings: usize,
    sectors: usize,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            surfaces: Vec::new(),
            fill: None,
            rings: 1,
            sectors: 1,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a halfspace constraint
    pub fn with_surface(mut self, surface: SurfaceId, halfspace: Halfspace) -> Self {
        self.surfaces.push((surface, halfspace));
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = Some(fill);
        self
    }

    /// Split a material cell into equal-area annular rings
    ///
    /// Requires a circle constraint on the negative side; a circle on the positive
    /// side with the same center becomes the inner radius.
    pub fn with_rings(mut self, rings: usize) -> Self {
        self.rings = rings;
        self
    }

    /// Split a material cell into equal-angle sectors around the ring center
    /// (or the local origin when the cell has no bounding circle)
    pub fn with_sectors(mut self, sectors: usize) -> Self {
        self.sectors = sectors;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surfaces(&self) -> &[(SurfaceId, Halfspace)] {
        &self.surfaces
    }

    pub fn fill(&self) -> Option<Fill> {
        self.fill
    }

    pub(crate) fn set_fill(&mut self, fill: Fill) {
        self.fill = Some(fill);
    }

    pub fn rings(&self) -> usize {
        self.rings
    }

    pub fn sectors(&self) -> usize {
        self.sectors
    }

    /// Number of flat source regions the cell contributes when material-filled
    pub fn num_subregions(&self) -> usize {
        self.rings * self.sectors
    }

    /// Test every halfspace constraint at `point` (cell-local frame)
    ///
    /// `surfaces` is the geometry's surface arena.
    #[inline]
    pub fn contains(&self, point: &Vec2, surfaces: &[Surface]) -> bool {
        self.surfaces
            .iter()
            .all(|&(id, side)| surfaces[id.index()].halfspace_of(point) == side)
    }

    /// Resolve the ring/sector layout against the surface arena
    ///
    /// Returns `Ok(None)` for an undivided cell.
    pub(crate) fn subdivision(&self, surfaces: &[Surface]) -> Result<Option<Subdivision>, String> {
        if self.rings == 0 || self.sectors == 0 {
            return Err(format!(
                "rings ({}) and sectors ({}) must be at least 1",
                self.rings, self.sectors
            ));
        }
        if self.rings == 1 && self.sectors == 1 {
            return Ok(None);
        }

        // Innermost bounding circle on the inside, outermost hole on the outside
        let outer = circles(&self.surfaces, surfaces, Halfspace::Negative)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let inner = circles(&self.surfaces, surfaces, Halfspace::Positive)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        if self.rings == 1 {
            let center = outer.map_or_else(Vec2::zeros, |(c, _)| c);
            return Ok(Some(Subdivision::new(center, 0.0, 0.0, 1, self.sectors)));
        }

        let (center, outer_radius) =
            outer.ok_or_else(|| "rings need a bounding circle on its negative side".to_string())?;
        let inner_radius = match inner {
            Some((c, r)) if (c - center).norm() < DISTANCE_EPSILON && r < outer_radius => r,
            Some(_) => {
                return Err("inner and outer ring circles must be concentric and nested".to_string())
            }
            None => 0.0,
        };

        Ok(Some(Subdivision::new(
            center,
            inner_radius,
            outer_radius,
            self.rings,
            self.sectors,
        )))
    }
}

/// Circle constraints of a cell on the `wanted` side as `(center, radius)`
fn circles<'a>(
    constraints: &'a [(SurfaceId, Halfspace)],
    surfaces: &'a [Surface],
    wanted: Halfspace,
) -> impl Iterator<Item = (Vec2, f64)> + 'a {
    constraints
        .iter()
        .filter(move |&&(_, side)| side == wanted)
        .filter_map(move |&(id, _)| match *surfaces[id.index()].kind() {
            SurfaceKind::Circle { x0, y0, radius } => Some((Vec2::new(x0, y0), radius)),
            _ => None,
        })
}

/// Resolved ring/sector partition of a material cell
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Subdivision {
    center: Vec2,
    sectors: usize,
    /// Interior ring boundaries, innermost first
    radii: Vec<f64>,
    /// Unit vectors along the sector dividing rays
    rays: Vec<Vec2>,
}

impl Subdivision {
    fn new(center: Vec2, inner: f64, outer: f64, rings: usize, sectors: usize) -> Self {
        // Equal areas: r_k² = r0² + (R² - r0²)·k / rings
        let r0_sq = inner * inner;
        let span = outer * outer - r0_sq;
        let radii = (1..rings)
            .map(|k| (r0_sq + span * k as f64 / rings as f64).sqrt())
            .collect();
        let rays = if sectors > 1 {
            (0..sectors)
                .map(|j| crate::core_types::vec2::direction(TAU * j as f64 / sectors as f64))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            center,
            sectors,
            radii,
            rays,
        }
    }

    pub(crate) fn sectors(&self) -> usize {
        self.sectors
    }

    /// `(ring, sector)` of a point in the cell-local frame
    pub(crate) fn index_of(&self, point: &Vec2) -> (usize, usize) {
        let rel = point - self.center;
        let r_sq = rel.norm_squared();
        let ring = self.radii.iter().filter(|&&r| r_sq >= r * r).count();

        let sector = if self.sectors > 1 {
            let angle = rel.y.atan2(rel.x).rem_euclid(TAU);
            ((angle / (TAU / self.sectors as f64)) as usize).min(self.sectors - 1)
        } else {
            0
        };
        (ring, sector)
    }

    /// Distance ahead to the nearest ring circle or sector ray
    pub(crate) fn distance_along(&self, point: &Vec2, direction: &Vec2) -> Option<f64> {
        let ring_hit = self
            .radii
            .iter()
            .filter_map(|&r| circle_intersections(self.center, r, point, direction).first_ahead());

        let cross = |a: &Vec2, b: &Vec2| a.x * b.y - a.y * b.x;
        let to_center = self.center - point;
        let ray_hit = self.rays.iter().filter_map(|u| {
            let denom = cross(direction, u);
            if denom.abs() < 1e-14 {
                return None;
            }
            let t = cross(&to_center, u) / denom;
            let s = cross(&to_center, direction) / denom;
            (t > DISTANCE_EPSILON && s >= 0.0).then_some(t)
        });

        ring_hit.chain(ray_hit).min_by(f64::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn arena() -> Vec<Surface> {
        vec![
            Surface::circle(0.0, 0.0, 2.0),
            Surface::circle(0.0, 0.0, 1.0),
            Surface::x_plane(0.0),
        ]
    }

    #[test]
    fn test_contains_checks_every_constraint() {
        let surfaces = arena();
        let cell = Cell::new()
            .with_surface(SurfaceId::new(0), Halfspace::Negative)
            .with_surface(SurfaceId::new(2), Halfspace::Positive);
        assert!(cell.contains(&Vec2::new(1.0, 0.0), &surfaces));
        assert!(!cell.contains(&Vec2::new(-1.0, 0.0), &surfaces));
        assert!(!cell.contains(&Vec2::new(3.0, 0.0), &surfaces));
        // On the plane: positive side wins
        assert!(cell.contains(&Vec2::new(0.0, 0.5), &surfaces));
    }

    #[test]
    fn test_unbounded_cell_contains_everything() {
        assert!(Cell::new().contains(&Vec2::new(1e6, -1e6), &arena()));
    }

    #[test]
    fn test_equal_area_rings() {
        let surfaces = arena();
        let cell = Cell::new()
            .with_surface(SurfaceId::new(0), Halfspace::Negative)
            .with_rings(2);
        let sub = cell.subdivision(&surfaces).unwrap().unwrap();
        // r1² = 4 / 2
        assert_relative_eq!(sub.radii[0], 2.0_f64.sqrt());
        assert_eq!(sub.index_of(&Vec2::new(1.0, 0.0)), (0, 0));
        assert_eq!(sub.index_of(&Vec2::new(1.5, 0.0)), (1, 0));
    }

    #[test]
    fn test_annulus_rings_use_inner_radius() {
        let surfaces = arena();
        let cell = Cell::new()
            .with_surface(SurfaceId::new(0), Halfspace::Negative)
            .with_surface(SurfaceId::new(1), Halfspace::Positive)
            .with_rings(3);
        let sub = cell.subdivision(&surfaces).unwrap().unwrap();
        // r_k² = 1 + 3k/3
        assert_relative_eq!(sub.radii[0], 2.0_f64.sqrt());
        assert_relative_eq!(sub.radii[1], 3.0_f64.sqrt());
    }

    #[test]
    fn test_rings_require_circle() {
        let surfaces = arena();
        let cell = Cell::new()
            .with_surface(SurfaceId::new(2), Halfspace::Positive)
            .with_rings(2);
        assert!(cell.subdivision(&surfaces).is_err());
        assert!(Cell::new().with_sectors(0).subdivision(&surfaces).is_err());
    }

    #[test]
    fn test_sector_index_and_distance() {
        let surfaces = arena();
        let cell = Cell::new()
            .with_surface(SurfaceId::new(0), Halfspace::Negative)
            .with_sectors(4);
        let sub = cell.subdivision(&surfaces).unwrap().unwrap();
        assert_eq!(sub.index_of(&Vec2::new(1.0, 0.5)), (0, 0));
        assert_eq!(sub.index_of(&Vec2::new(-1.0, 0.5)), (0, 1));
        assert_eq!(sub.index_of(&Vec2::new(-1.0, -0.5)), (0, 2));
        assert_eq!(sub.index_of(&Vec2::new(1.0, -0.5)), (0, 3));

        // From (1, -0.5) heading +y the ray along +x is 0.5 ahead
        let d = sub
            .distance_along(&Vec2::new(1.0, -0.5), &Vec2::new(0.0, 1.0))
            .unwrap();
        assert_relative_eq!(d, 0.5, epsilon = 1e-12);
        // Heading away from the center along +x never meets a sector ray
        assert!(sub
            .distance_along(&Vec2::new(1.0, 0.5), &Vec2::new(1.0, 0.0))
            .is_none());
    }
}
