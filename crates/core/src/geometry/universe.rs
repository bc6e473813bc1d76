//! Universes and rectangular lattices

use crate::core_types::ids::{CellId, UniverseId};
use crate::core_types::vec2::Vec2;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Points this close outside a lattice edge still map to the edge cell
const EDGE_TOLERANCE: f64 = 1e-9;

/// Collection of cells partitioning a local frame
///
/// Universes are shared by id: the same universe may fill many cells and many
/// lattice positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    name: String,
    cells: Vec<CellId>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_cell(mut self, cell: CellId) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn with_cells(mut self, cells: impl IntoIterator<Item = CellId>) -> Self {
        self.cells.extend(cells);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }
}

/// Regular `nx × ny` grid of universes
///
/// The lattice is centered on the origin of the frame it is placed in, shifted by
/// an optional offset. Each lattice position places its universe in a frame whose
/// origin is the center of that lattice cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    name: String,
    nx: usize,
    ny: usize,
    width_x: f64,
    width_y: f64,
    offset: Vec2,
    /// Row-major from the bottom row: index `j * nx + i`
    universes: Vec<UniverseId>,
}

impl Lattice {
    /// Build a lattice from rows listed top to bottom
    ///
    /// # Arguments
    ///
    /// * `width_x`, `width_y` - Size of one lattice cell
    /// * `rows` - Universe ids, first row is the top of the lattice
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidLattice`] when the rows are empty or ragged, or
    /// when a width is not positive.
    pub fn new(
        width_x: f64,
        width_y: f64,
        rows: Vec<Vec<UniverseId>>,
    ) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidLattice {
            lattice: None,
            reason,
        };

        if !(width_x.is_finite() && width_x > 0.0 && width_y.is_finite() && width_y > 0.0) {
            return Err(invalid(format!(
                "cell widths ({width_x}, {width_y}) must be positive"
            )));
        }
        let ny = rows.len();
        let nx = rows.first().map_or(0, Vec::len);
        if nx == 0 || ny == 0 {
            return Err(invalid("lattice has no cells".to_string()));
        }
        if let Some(row) = rows.iter().position(|r| r.len() != nx) {
            return Err(invalid(format!(
                "row {row} has {} entries, expected {nx}",
                rows[row].len()
            )));
        }

        let universes = rows.into_iter().rev().flatten().collect();
        Ok(Self {
            name: String::new(),
            nx,
            ny,
            width_x,
            width_y,
            offset: Vec2::zeros(),
            universes,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shift the lattice center away from the frame origin
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn width_x(&self) -> f64 {
        self.width_x
    }

    pub fn width_y(&self) -> f64 {
        self.width_y
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Number of lattice positions
    pub fn len(&self) -> usize {
        self.universes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.universes.is_empty()
    }

    /// All universe entries, bottom row first
    pub fn universes(&self) -> &[UniverseId] {
        &self.universes
    }

    /// Lower-left corner in the enclosing frame
    pub fn min_corner(&self) -> Vec2 {
        self.offset
            - Vec2::new(
                self.nx as f64 * self.width_x / 2.0,
                self.ny as f64 * self.width_y / 2.0,
            )
    }

    /// Flat index of position `(i, j)`, `j` counted from the bottom row
    #[inline]
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Universe at position `(i, j)`
    pub fn universe_at(&self, i: usize, j: usize) -> UniverseId {
        self.universes[self.flat_index(i, j)]
    }

    /// Lattice position containing `point`
    ///
    /// Points within a small tolerance outside the outer edge map to the edge cell;
    /// points further out return `None`.
    pub fn cell_index(&self, point: &Vec2) -> Option<(usize, usize)> {
        let rel = point - self.min_corner();
        let i = axis_index(rel.x, self.width_x, self.nx)?;
        let j = axis_index(rel.y, self.width_y, self.ny)?;
        Some((i, j))
    }

    /// Center of position `(i, j)` in the enclosing frame
    pub fn cell_center(&self, i: usize, j: usize) -> Vec2 {
        self.min_corner()
            + Vec2::new(
                (i as f64 + 0.5) * self.width_x,
                (j as f64 + 0.5) * self.width_y,
            )
    }

    /// Distance ahead from `point` to the walls of position `(i, j)`
    pub(crate) fn distance_to_walls(
        &self,
        i: usize,
        j: usize,
        point: &Vec2,
        direction: &Vec2,
    ) -> Option<f64> {
        let center = self.cell_center(i, j);
        let half = Vec2::new(self.width_x / 2.0, self.width_y / 2.0);
        let wall = |p: f64, d: f64, c: f64, h: f64| {
            if d > 0.0 {
                Some((c + h - p) / d)
            } else if d < 0.0 {
                Some((c - h - p) / d)
            } else {
                None
            }
        };
        [
            wall(point.x, direction.x, center.x, half.x),
            wall(point.y, direction.y, center.y, half.y),
        ]
        .into_iter()
        .flatten()
        .filter(|&t| t > super::surface::DISTANCE_EPSILON)
        .min_by(f64::total_cmp)
    }
}

fn axis_index(rel: f64, width: f64, count: usize) -> Option<usize> {
    let extent = width * count as f64;
    if rel < -EDGE_TOLERANCE || rel > extent + EDGE_TOLERANCE || !rel.is_finite() {
        return None;
    }
    Some(((rel / width).floor().max(0.0) as usize).min(count - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ids(raw: &[u32]) -> Vec<UniverseId> {
        raw.iter().copied().map(UniverseId::new).collect()
    }

    #[test]
    fn test_rows_are_listed_top_to_bottom() {
        let lattice = Lattice::new(1.0, 1.0, vec![ids(&[1, 2]), ids(&[3, 4])]).unwrap();
        assert_eq!(lattice.universe_at(0, 0), UniverseId::new(3));
        assert_eq!(lattice.universe_at(1, 1), UniverseId::new(2));
    }

    #[test]
    fn test_lattice_centered_on_origin() {
        let lattice = Lattice::new(4.0 / 9.0, 4.0 / 9.0, vec![ids(&[0; 9]); 9]).unwrap();
        assert_relative_eq!(lattice.min_corner().x, -2.0, epsilon = 1e-12);
        assert_eq!(lattice.cell_index(&Vec2::new(0.0, 0.0)), Some((4, 4)));
        assert_eq!(lattice.cell_index(&Vec2::new(-1.99, 1.99)), Some((0, 8)));
        let center = lattice.cell_center(4, 4);
        assert_relative_eq!(center.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_edge_tolerance_clamps() {
        let lattice = Lattice::new(1.0, 1.0, vec![ids(&[0, 0])]).unwrap();
        assert_eq!(lattice.cell_index(&Vec2::new(1.0, 0.5)), Some((1, 0)));
        assert_eq!(lattice.cell_index(&Vec2::new(1.0 + 1e-10, 0.0)), Some((1, 0)));
        assert_eq!(lattice.cell_index(&Vec2::new(1.1, 0.0)), None);
    }

    #[test]
    fn test_offset_shifts_lattice() {
        let lattice = Lattice::new(1.0, 1.0, vec![ids(&[0, 0])])
            .unwrap()
            .with_offset(Vec2::new(10.0, 0.0));
        assert_eq!(lattice.cell_index(&Vec2::new(10.5, 0.0)), Some((1, 0)));
        assert_eq!(lattice.cell_index(&Vec2::new(0.0, 0.0)), None);
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = Lattice::new(1.0, 1.0, vec![ids(&[0, 0]), ids(&[0])]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidLattice { .. }));
        assert!(Lattice::new(0.0, 1.0, vec![ids(&[0])]).is_err());
        assert!(Lattice::new(1.0, 1.0, Vec::new()).is_err());
    }

    #[test]
    fn test_distance_to_walls() {
        let lattice = Lattice::new(2.0, 2.0, vec![ids(&[0, 0]), ids(&[0, 0])]).unwrap();
        // Position (0, 0) spans [-2, 0] x [-2, 0]
        let d = lattice
            .distance_to_walls(0, 0, &Vec2::new(-1.0, -1.5), &Vec2::new(1.0, 0.0))
            .unwrap();
        assert_relative_eq!(d, 1.0);
        let diag = Vec2::new(1.0, 1.0).normalize();
        let d = lattice
            .distance_to_walls(0, 0, &Vec2::new(-1.0, -1.5), &diag)
            .unwrap();
        assert_relative_eq!(d, 2.0_f64.sqrt(), epsilon = 1e-12);
    }
}
