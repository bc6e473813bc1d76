//! Validation and FSR flattening performed by [`Geometry::finalize`]
//!
//! FSR counts are computed bottom-up and memoized per universe and per lattice. Each
//! universe stores the FSR offset of every cell it lists and each lattice stores the
//! offset of every position, so the FSR id of a point is the sum of the offsets along
//! its CSG path plus the ring/sector index of the leaf cell.

use super::bounds::{BoundarySide, BoundingBox, BoxSide};
use super::cell::{Fill, Subdivision};
use super::surface::{BoundaryType, Halfspace, SurfaceKind};
use super::{FsrInfo, Geometry};
use crate::core_types::ids::{CellId, LatticeId, MaterialId, SurfaceId, UniverseId};
use crate::core_types::vec2::Vec2;
use crate::error::ConfigurationError;
use tracing::warn;

/// Derived lookup tables of a finalized geometry
#[derive(Debug, Clone)]
pub(crate) struct Flattened {
    pub(crate) root: UniverseId,
    pub(crate) num_groups: usize,
    pub(crate) bounds: BoundingBox,
    /// Per universe, FSR offset of each listed cell
    pub(crate) cell_offsets: Vec<Vec<usize>>,
    /// Per lattice, FSR offset of each position (bottom-up flat index)
    pub(crate) lattice_offsets: Vec<Vec<usize>>,
    /// Per cell, ring/sector layout of subdivided material cells
    pub(crate) subdivisions: Vec<Option<Subdivision>>,
    /// Per universe, every surface any of its cells references
    pub(crate) universe_surfaces: Vec<Vec<SurfaceId>>,
    pub(crate) fsrs: Vec<FsrInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done(usize),
}

struct Flattener<'g> {
    geometry: &'g Geometry,
    universe_state: Vec<Visit>,
    lattice_count: Vec<Option<usize>>,
    cell_offsets: Vec<Vec<usize>>,
    lattice_offsets: Vec<Vec<usize>>,
}

pub(crate) fn flatten(geometry: &Geometry) -> Result<Flattened, ConfigurationError> {
    let root = geometry.root.ok_or(ConfigurationError::NoRootUniverse)?;
    if root.index() >= geometry.universes.len() {
        return Err(ConfigurationError::UnknownUniverse { universe: root });
    }

    let num_groups = check_materials(geometry)?;
    let subdivisions = check_cells(geometry)?;
    check_lattices(geometry)?;

    let mut flattener = Flattener {
        geometry,
        universe_state: vec![Visit::Pending; geometry.universes.len()],
        lattice_count: vec![None; geometry.lattices.len()],
        cell_offsets: vec![Vec::new(); geometry.universes.len()],
        lattice_offsets: vec![Vec::new(); geometry.lattices.len()],
    };
    let num_fsrs = flattener.count_universe(root)?;

    let mut fsrs = Vec::with_capacity(num_fsrs);
    flattener.enumerate_universe(root, &mut fsrs);
    debug_assert_eq!(fsrs.len(), num_fsrs);

    let universe_surfaces = geometry
        .universes
        .iter()
        .map(|universe| {
            let mut ids: Vec<SurfaceId> = universe
                .cells()
                .iter()
                .flat_map(|c| geometry.cells[c.index()].surfaces().iter().map(|&(s, _)| s))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        })
        .collect();

    let bounds = root_bounds(geometry, root)?;

    Ok(Flattened {
        root,
        num_groups,
        bounds,
        cell_offsets: flattener.cell_offsets,
        lattice_offsets: flattener.lattice_offsets,
        subdivisions,
        universe_surfaces,
        fsrs,
    })
}

fn check_materials(geometry: &Geometry) -> Result<usize, ConfigurationError> {
    let first = geometry
        .materials
        .first()
        .ok_or_else(|| ConfigurationError::InvalidMaterial {
            name: String::new(),
            reason: "geometry has no materials".to_string(),
        })?;
    let expected = first.num_groups();
    for (idx, material) in geometry.materials.iter().enumerate() {
        if material.num_groups() != expected {
            return Err(ConfigurationError::GroupMismatch {
                material: MaterialId::from_index(idx),
                expected,
                found: material.num_groups(),
            });
        }
    }
    Ok(expected)
}

fn check_cells(geometry: &Geometry) -> Result<Vec<Option<Subdivision>>, ConfigurationError> {
    geometry
        .cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let id = CellId::from_index(idx);
            match cell.fill().ok_or(ConfigurationError::UnfilledCell { cell: id })? {
                Fill::Material(material) => {
                    if material.index() >= geometry.materials.len() {
                        return Err(ConfigurationError::UnknownMaterial { cell: id, material });
                    }
                }
                Fill::Universe(universe) => {
                    if universe.index() >= geometry.universes.len() {
                        return Err(ConfigurationError::UnknownUniverse { universe });
                    }
                }
                Fill::Lattice(lattice) => {
                    if lattice.index() >= geometry.lattices.len() {
                        return Err(ConfigurationError::UnknownLattice { lattice });
                    }
                }
            }

            let subdivision = cell
                .subdivision(&geometry.surfaces)
                .map_err(|reason| ConfigurationError::InvalidSubdivision { cell: id, reason })?;
            if subdivision.is_some() && !matches!(cell.fill(), Some(Fill::Material(_))) {
                return Err(ConfigurationError::InvalidSubdivision {
                    cell: id,
                    reason: "only material cells can be split into rings or sectors".to_string(),
                });
            }
            Ok(subdivision)
        })
        .collect()
}

fn check_lattices(geometry: &Geometry) -> Result<(), ConfigurationError> {
    for lattice in &geometry.lattices {
        if let Some(&universe) = lattice
            .universes()
            .iter()
            .find(|u| u.index() >= geometry.universes.len())
        {
            return Err(ConfigurationError::UnknownUniverse { universe });
        }
    }
    Ok(())
}

impl Flattener<'_> {
    /// FSR count of a universe, filling its cell offsets on first visit
    fn count_universe(&mut self, universe: UniverseId) -> Result<usize, ConfigurationError> {
        match self.universe_state[universe.index()] {
            Visit::Done(count) => return Ok(count),
            Visit::InProgress => return Err(ConfigurationError::CyclicFill { universe }),
            Visit::Pending => {}
        }
        self.universe_state[universe.index()] = Visit::InProgress;

        let geometry = self.geometry;
        let cells = geometry.universes[universe.index()].cells();
        let mut offsets = Vec::with_capacity(cells.len());
        let mut total = 0;
        for cell_id in cells {
            offsets.push(total);
            let cell = &geometry.cells[cell_id.index()];
            total += match cell.fill() {
                Some(Fill::Material(_)) | None => cell.num_subregions(),
                Some(Fill::Universe(inner)) => self.count_universe(inner)?,
                Some(Fill::Lattice(lattice)) => self.count_lattice(lattice)?,
            };
        }

        self.cell_offsets[universe.index()] = offsets;
        self.universe_state[universe.index()] = Visit::Done(total);
        Ok(total)
    }

    fn count_lattice(&mut self, lattice: LatticeId) -> Result<usize, ConfigurationError> {
        if let Some(count) = self.lattice_count[lattice.index()] {
            return Ok(count);
        }
        let entries = self.geometry.lattices[lattice.index()].universes();
        let mut offsets = Vec::with_capacity(entries.len());
        let mut total = 0;
        for &universe in entries {
            offsets.push(total);
            total += self.count_universe(universe)?;
        }
        self.lattice_offsets[lattice.index()] = offsets;
        self.lattice_count[lattice.index()] = Some(total);
        Ok(total)
    }

    /// Append the FSRs below `universe` in id order
    fn enumerate_universe(&self, universe: UniverseId, out: &mut Vec<FsrInfo>) {
        let geometry = self.geometry;
        for &cell_id in geometry.universes[universe.index()].cells() {
            let cell = &geometry.cells[cell_id.index()];
            match cell.fill() {
                Some(Fill::Material(material)) => {
                    for ring in 0..cell.rings() {
                        for sector in 0..cell.sectors() {
                            out.push(FsrInfo {
                                cell: cell_id,
                                material,
                                ring,
                                sector,
                            });
                        }
                    }
                }
                Some(Fill::Universe(inner)) => self.enumerate_universe(inner, out),
                Some(Fill::Lattice(lattice)) => {
                    for &inner in geometry.lattices[lattice.index()].universes() {
                        self.enumerate_universe(inner, out);
                    }
                }
                None => {}
            }
        }
    }
}

/// Axis-aligned limit implied by one plane constraint
fn plane_limit(kind: &SurfaceKind, side: Halfspace) -> Option<(BoxSide, f64)> {
    let (axis_is_x, coeff, c) = match *kind {
        SurfaceKind::XPlane { x0 } => (true, 1.0, x0),
        SurfaceKind::YPlane { y0 } => (false, 1.0, y0),
        SurfaceKind::Plane { a, b, c } if b == 0.0 => (true, a, c),
        SurfaceKind::Plane { a, b, c } if a == 0.0 => (false, b, c),
        _ => return None,
    };
    // coeff·v - c ≥ 0 on the positive side
    let lower = (side == Halfspace::Positive) == (coeff > 0.0);
    let value = c / coeff;
    Some(match (axis_is_x, lower) {
        (true, true) => (BoxSide::Left, value),
        (true, false) => (BoxSide::Right, value),
        (false, true) => (BoxSide::Bottom, value),
        (false, false) => (BoxSide::Top, value),
    })
}

/// Outermost limit found so far on one side of a box
#[derive(Debug, Clone, Copy)]
struct Limit {
    value: f64,
    surface: SurfaceId,
    plane: bool,
}

impl Limit {
    /// Whether `self` lies further inside than `other` on `side`
    fn inside_of(&self, other: &Limit, side: BoxSide) -> bool {
        match side {
            BoxSide::Left | BoxSide::Bottom => self.value > other.value,
            BoxSide::Right | BoxSide::Top => self.value < other.value,
        }
    }
}

/// Box of one cell from its axis-aligned planes and enclosing circles
fn cell_limits(geometry: &Geometry, cell: CellId) -> [Option<Limit>; 4] {
    let mut limits: [Option<Limit>; 4] = [None; 4];
    let mut tighten = |side: BoxSide, limit: Limit| {
        let slot = &mut limits[side.index()];
        if slot.map_or(true, |current| limit.inside_of(&current, side)) {
            *slot = Some(limit);
        }
    };

    for &(surface, halfspace) in geometry.cells[cell.index()].surfaces() {
        let kind = geometry.surfaces[surface.index()].kind();
        if let Some((side, value)) = plane_limit(kind, halfspace) {
            tighten(
                side,
                Limit {
                    value,
                    surface,
                    plane: true,
                },
            );
        } else if let (SurfaceKind::Circle { x0, y0, radius }, Halfspace::Negative) =
            (*kind, halfspace)
        {
            for (side, value) in [
                (BoxSide::Left, x0 - radius),
                (BoxSide::Right, x0 + radius),
                (BoxSide::Bottom, y0 - radius),
                (BoxSide::Top, y0 + radius),
            ] {
                tighten(
                    side,
                    Limit {
                        value,
                        surface,
                        plane: false,
                    },
                );
            }
        }
    }
    limits
}

/// Bounding box of the root universe
///
/// The union of the cell boxes must be closed by a plane on every side; that plane
/// supplies the boundary condition of the side.
fn root_bounds(geometry: &Geometry, root: UniverseId) -> Result<BoundingBox, ConfigurationError> {
    let unbounded = ConfigurationError::UnboundedRoot { universe: root };

    let mut sides: [Option<Limit>; 4] = [None; 4];
    for &cell_id in geometry.universes[root.index()].cells() {
        let limits = cell_limits(geometry, cell_id);
        for side in BoxSide::ALL {
            let limit = limits[side.index()].ok_or_else(|| unbounded.clone())?;
            let slot = &mut sides[side.index()];
            let replace = match slot {
                None => true,
                Some(current) => {
                    current.inside_of(&limit, side)
                        || (current.value == limit.value && limit.plane && !current.plane)
                }
            };
            if replace {
                *slot = Some(limit);
            }
        }
    }

    let mut resolved = [BoundarySide {
        surface: SurfaceId::default(),
        boundary: BoundaryType::Vacuum,
    }; 4];
    let mut coords = [0.0; 4];
    for side in BoxSide::ALL {
        let Limit {
            value: coord,
            surface,
            plane,
        } = sides[side.index()].ok_or_else(|| unbounded.clone())?;
        if !plane {
            return Err(unbounded);
        }
        let mut boundary = geometry.surfaces[surface.index()].boundary();
        if boundary == BoundaryType::Interface {
            warn!(
                "{} closes the {:?} side of the domain without a boundary condition, using vacuum",
                surface, side
            );
            boundary = BoundaryType::Vacuum;
        }
        resolved[side.index()] = BoundarySide { surface, boundary };
        coords[side.index()] = coord;
    }

    for side in [BoxSide::Left, BoxSide::Bottom] {
        let a = resolved[side.index()];
        let b = resolved[side.opposite().index()];
        match (a.boundary, b.boundary) {
            (BoundaryType::Periodic, BoundaryType::Periodic) => {}
            (BoundaryType::Periodic, _) => {
                return Err(ConfigurationError::UnpairedPeriodic { surface: a.surface })
            }
            (_, BoundaryType::Periodic) => {
                return Err(ConfigurationError::UnpairedPeriodic { surface: b.surface })
            }
            _ => {}
        }
    }

    let min = Vec2::new(coords[BoxSide::Left.index()], coords[BoxSide::Bottom.index()]);
    let max = Vec2::new(coords[BoxSide::Right.index()], coords[BoxSide::Top.index()]);
    if !(max.x > min.x && max.y > min.y) {
        return Err(unbounded);
    }
    Ok(BoundingBox::new(min, max, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_limit_orientation() {
        assert_eq!(
            plane_limit(&SurfaceKind::XPlane { x0: -2.0 }, Halfspace::Positive),
            Some((BoxSide::Left, -2.0))
        );
        assert_eq!(
            plane_limit(&SurfaceKind::YPlane { y0: 2.0 }, Halfspace::Negative),
            Some((BoxSide::Top, 2.0))
        );
        // -x + 3 ≥ 0 means x ≤ 3
        assert_eq!(
            plane_limit(
                &SurfaceKind::Plane {
                    a: -1.0,
                    b: 0.0,
                    c: -3.0
                },
                Halfspace::Positive
            ),
            Some((BoxSide::Right, 3.0))
        );
        assert_eq!(
            plane_limit(
                &SurfaceKind::Plane {
                    a: 1.0,
                    b: 1.0,
                    c: 0.0
                },
                Halfspace::Positive
            ),
            None
        );
    }
}
