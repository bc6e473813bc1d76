//! Point location and distance-to-boundary queries on a finalized geometry

use super::cell::Fill;
use super::Geometry;
use crate::core_types::ids::{CellId, FsrId, LatticeId, MaterialId, UniverseId};
use crate::core_types::vec2::Vec2;

/// One level of the CSG path from the root universe down to a leaf cell
#[derive(Debug, Clone, PartialEq)]
pub enum PathLevel {
    /// Cell selected in a universe, `point` is in the universe frame
    Universe {
        universe: UniverseId,
        cell: CellId,
        point: Vec2,
    },
    /// Lattice position selected in a cell, `point` is in the lattice frame
    Lattice {
        lattice: LatticeId,
        i: usize,
        j: usize,
        point: Vec2,
    },
}

/// Result of locating a point: the full CSG path and the flat source region
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    path: Vec<PathLevel>,
    fsr: FsrId,
    cell: CellId,
    material: MaterialId,
    ring: usize,
    sector: usize,
    local: Vec2,
}

impl Location {
    pub fn path(&self) -> &[PathLevel] {
        &self.path
    }

    pub fn fsr(&self) -> FsrId {
        self.fsr
    }

    /// Leaf material cell
    pub fn cell(&self) -> CellId {
        self.cell
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn ring(&self) -> usize {
        self.ring
    }

    pub fn sector(&self) -> usize {
        self.sector
    }

    /// Point in the frame of the leaf cell
    pub fn local_point(&self) -> Vec2 {
        self.local
    }
}

impl Geometry {
    /// Walk the CSG tree top-down to the material cell containing `point`
    ///
    /// # Arguments
    ///
    /// * `point` - Position in the root frame
    ///
    /// # Returns
    ///
    /// The location, or `None` if the point lies in no cell or the geometry has not
    /// been finalized. Points on a surface belong to its positive halfspace.
    pub fn find_cell_containing(&self, point: &Vec2) -> Option<Location> {
        let flat = self.flat.as_ref()?;
        let mut universe = flat.root;
        let mut frame = *point;
        let mut base = 0;
        let mut path = Vec::with_capacity(4);

        loop {
            let cells = self.universes[universe.index()].cells();
            let pos = cells
                .iter()
                .position(|c| self.cells[c.index()].contains(&frame, &self.surfaces))?;
            let cell_id = cells[pos];
            let cell = &self.cells[cell_id.index()];
            path.push(PathLevel::Universe {
                universe,
                cell: cell_id,
                point: frame,
            });
            let offset = base + flat.cell_offsets[universe.index()][pos];

            match cell.fill()? {
                Fill::Material(material) => {
                    let (ring, sector) = flat.subdivisions[cell_id.index()]
                        .as_ref()
                        .map_or((0, 0), |s| s.index_of(&frame));
                    return Some(Location {
                        path,
                        fsr: FsrId::from_index(offset + ring * cell.sectors() + sector),
                        cell: cell_id,
                        material,
                        ring,
                        sector,
                        local: frame,
                    });
                }
                Fill::Universe(inner) => {
                    base = offset;
                    universe = inner;
                }
                Fill::Lattice(lattice_id) => {
                    let lattice = &self.lattices[lattice_id.index()];
                    let (i, j) = lattice.cell_index(&frame)?;
                    path.push(PathLevel::Lattice {
                        lattice: lattice_id,
                        i,
                        j,
                        point: frame,
                    });
                    base = offset + flat.lattice_offsets[lattice_id.index()][lattice.flat_index(i, j)];
                    frame -= lattice.cell_center(i, j);
                    universe = lattice.universe_at(i, j);
                }
            }
        }
    }

    /// Flat source region containing `point`, `None` when outside every cell
    pub fn find_fsr(&self, point: &Vec2) -> Option<FsrId> {
        self.find_cell_containing(point).map(|loc| loc.fsr)
    }

    /// Distance from a located point to the next region boundary along `direction`
    ///
    /// Considers every surface of every universe on the path, the walls of every
    /// lattice position on the path and the ring/sector boundaries of the leaf cell.
    /// Only crossings strictly ahead of the point count.
    pub fn distance_to_boundary(&self, location: &Location, direction: &Vec2) -> Option<f64> {
        let flat = self.flat.as_ref()?;
        let mut nearest: Option<f64> = None;
        let mut consider = |d: Option<f64>| {
            if let Some(d) = d {
                nearest = Some(nearest.map_or(d, |n| n.min(d)));
            }
        };

        for level in &location.path {
            match level {
                PathLevel::Universe {
                    universe, point, ..
                } => {
                    for surface in &flat.universe_surfaces[universe.index()] {
                        consider(self.surfaces[surface.index()].distance_along(point, direction));
                    }
                }
                PathLevel::Lattice {
                    lattice, i, j, point,
                } => {
                    consider(self.lattices[lattice.index()].distance_to_walls(*i, *j, point, direction));
                }
            }
        }

        if let Some(sub) = &flat.subdivisions[location.cell.index()] {
            consider(sub.distance_along(&location.local, direction));
        }
        nearest
    }
}
