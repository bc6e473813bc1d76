//! Constructive solid geometry with flat source regions
//!
//! A [`Geometry`] owns every node in id-indexed arenas: surfaces, materials, cells,
//! universes and lattices. Cells and lattices refer to other nodes only by id, so a
//! universe can be shared by any number of cells and lattice positions.
//!
//! Construction is a sequence of `add_*` calls followed by [`Geometry::finalize`],
//! which validates the tree and flattens it into flat source regions (FSRs).
//! Unknown surface and material references are reported by the call that makes
//! them; everything else is checked at finalize time.
//!
//! # Usage
//! ```
//! use moc_core::geometry::{BoundaryType, Cell, Fill, Geometry, Halfspace, Surface, Universe};
//! use moc_core::materials::Material;
//! use moc_core::core_types::vec2::Vec2;
//!
//! let mut geometry = Geometry::new();
//! let medium = geometry.add_material(Material::one_group("medium", 1.0, 0.5, 0.6).unwrap());
//! let left = geometry.add_surface(Surface::x_plane(-1.0).with_boundary(BoundaryType::Reflective)).unwrap();
//! let right = geometry.add_surface(Surface::x_plane(1.0).with_boundary(BoundaryType::Reflective)).unwrap();
//! let bottom = geometry.add_surface(Surface::y_plane(-1.0).with_boundary(BoundaryType::Reflective)).unwrap();
//! let top = geometry.add_surface(Surface::y_plane(1.0).with_boundary(BoundaryType::Reflective)).unwrap();
//! let cell = geometry
//!     .add_cell(
//!         Cell::new()
//!             .with_surface(left, Halfspace::Positive)
//!             .with_surface(right, Halfspace::Negative)
//!             .with_surface(bottom, Halfspace::Positive)
//!             .with_surface(top, Halfspace::Negative)
//!             .with_fill(Fill::Material(medium)),
//!     )
//!     .unwrap();
//! let root = geometry.add_universe(Universe::new().with_cell(cell)).unwrap();
//! geometry.set_root_universe(root);
//! geometry.finalize().unwrap();
//!
//! assert_eq!(geometry.num_fsrs(), 1);
//! assert!(geometry.find_fsr(&Vec2::new(0.5, 0.5)).is_some());
//! assert!(geometry.find_fsr(&Vec2::new(1.5, 0.5)).is_none());
//! ```

pub mod bounds;
pub mod cell;
mod flatten;
pub mod locate;
pub mod raster;
pub mod surface;
pub mod universe;

pub use bounds::{BoundarySide, BoundingBox, BoxSide};
pub use cell::{Cell, Fill};
pub use locate::{Location, PathLevel};
pub use raster::{RasterKind, RasterMap};
pub use surface::{BoundaryType, Halfspace, Surface, SurfaceKind};
pub use universe::{Lattice, Universe};

use crate::core_types::ids::{CellId, FsrId, LatticeId, MaterialId, SurfaceId, UniverseId};
use crate::error::ConfigurationError;
use crate::materials::{Material, MaterialLibrary};
use flatten::Flattened;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Description of one flat source region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsrInfo {
    /// Leaf material cell the region belongs to
    pub cell: CellId,
    pub material: MaterialId,
    pub ring: usize,
    pub sector: usize,
}

/// CSG model of a 2-D reactor cross-section
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    surfaces: Vec<Surface>,
    materials: Vec<Material>,
    cells: Vec<Cell>,
    universes: Vec<Universe>,
    lattices: Vec<Lattice>,
    root: Option<UniverseId>,
    flat: Option<Flattened>,
}

impl Geometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its id
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.invalidate();
        self.materials.push(material);
        MaterialId::from_index(self.materials.len() - 1)
    }

    /// Register a copy of a library material
    pub fn add_library_material(
        &mut self,
        library: &MaterialLibrary,
        name: &str,
    ) -> Result<MaterialId, ConfigurationError> {
        let material = library.require(name)?.clone();
        Ok(self.add_material(material))
    }

    /// Register a surface
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidSurface`] for degenerate coefficients.
    pub fn add_surface(&mut self, surface: Surface) -> Result<SurfaceId, ConfigurationError> {
        surface
            .validate()
            .map_err(|reason| ConfigurationError::InvalidSurface {
                surface: None,
                reason,
            })?;
        self.invalidate();
        self.surfaces.push(surface);
        Ok(SurfaceId::from_index(self.surfaces.len() - 1))
    }

    /// Register a cell
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnknownSurface`] or [`ConfigurationError::UnknownMaterial`]
    /// when the cell references an entity that was never added.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, ConfigurationError> {
        let id = CellId::from_index(self.cells.len());
        if let Some(&(surface, _)) = cell
            .surfaces()
            .iter()
            .find(|(s, _)| s.index() >= self.surfaces.len())
        {
            return Err(ConfigurationError::UnknownSurface {
                cell: Some(id),
                surface,
            });
        }
        if let Some(Fill::Material(material)) = cell.fill() {
            self.check_material(id, material)?;
        }
        if cell.rings() == 0 || cell.sectors() == 0 {
            return Err(ConfigurationError::InvalidSubdivision {
                cell: id,
                reason: "rings and sectors must be at least 1".to_string(),
            });
        }
        self.invalidate();
        self.cells.push(cell);
        Ok(id)
    }

    /// Register a universe
    pub fn add_universe(&mut self, universe: Universe) -> Result<UniverseId, ConfigurationError> {
        if let Some(&cell) = universe
            .cells()
            .iter()
            .find(|c| c.index() >= self.cells.len())
        {
            return Err(ConfigurationError::UnknownCell { cell });
        }
        self.invalidate();
        self.universes.push(universe);
        Ok(UniverseId::from_index(self.universes.len() - 1))
    }

    /// Register a lattice; its universe entries are checked at finalize time
    pub fn add_lattice(&mut self, lattice: Lattice) -> LatticeId {
        self.invalidate();
        self.lattices.push(lattice);
        LatticeId::from_index(self.lattices.len() - 1)
    }

    /// Set or replace the content of a cell
    ///
    /// Universe and lattice fills may refer to nodes added later.
    pub fn set_cell_fill(&mut self, cell: CellId, fill: Fill) -> Result<(), ConfigurationError> {
        if cell.index() >= self.cells.len() {
            return Err(ConfigurationError::UnknownCell { cell });
        }
        if let Fill::Material(material) = fill {
            self.check_material(cell, material)?;
        }
        self.invalidate();
        self.cells[cell.index()].set_fill(fill);
        Ok(())
    }

    pub fn set_root_universe(&mut self, universe: UniverseId) {
        self.invalidate();
        self.root = Some(universe);
    }

    /// Validate the CSG tree and flatten it into FSRs
    ///
    /// # Errors
    ///
    /// A [`ConfigurationError`] naming the first offending entity: missing root,
    /// unfilled cell, unregistered fill or lattice entry, cyclic nesting, group
    /// mismatch between materials, unbounded root or unpaired periodic sides.
    pub fn finalize(&mut self) -> Result<(), ConfigurationError> {
        let flat = flatten::flatten(self)?;
        let bounds = flat.bounds;
        info!(
            "Geometry finalized: {} FSRs, {} cells, {} universes, {} lattices, {} groups",
            flat.fsrs.len(),
            self.cells.len(),
            self.universes.len(),
            self.lattices.len(),
            flat.num_groups
        );
        debug!(
            "Domain [{}, {}] x [{}, {}], boundaries L={:?} R={:?} B={:?} T={:?}",
            bounds.min.x,
            bounds.max.x,
            bounds.min.y,
            bounds.max.y,
            bounds.boundary(BoxSide::Left),
            bounds.boundary(BoxSide::Right),
            bounds.boundary(BoxSide::Bottom),
            bounds.boundary(BoxSide::Top)
        );
        self.flat = Some(flat);
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.flat.is_some()
    }

    /// Number of flat source regions (zero before finalize)
    pub fn num_fsrs(&self) -> usize {
        self.flat.as_ref().map_or(0, |f| f.fsrs.len())
    }

    /// Number of energy groups (zero before finalize)
    pub fn num_groups(&self) -> usize {
        self.flat.as_ref().map_or(0, |f| f.num_groups)
    }

    /// Bounding box of the root universe
    pub fn bounds(&self) -> Result<&BoundingBox, ConfigurationError> {
        self.flat
            .as_ref()
            .map(|f| &f.bounds)
            .ok_or(ConfigurationError::NotFinalized)
    }

    /// All flat source regions in id order (empty before finalize)
    pub fn fsrs(&self) -> &[FsrInfo] {
        self.flat.as_ref().map_or(&[][..], |f| f.fsrs.as_slice())
    }

    pub fn fsr(&self, fsr: FsrId) -> Option<&FsrInfo> {
        self.fsrs().get(fsr.index())
    }

    /// Material of a flat source region
    pub fn fsr_material(&self, fsr: FsrId) -> Option<&Material> {
        self.fsr(fsr).map(|info| &self.materials[info.material.index()])
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.index())
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.index())
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.index())
    }

    pub fn universe(&self, id: UniverseId) -> Option<&Universe> {
        self.universes.get(id.index())
    }

    pub fn lattice(&self, id: LatticeId) -> Option<&Lattice> {
        self.lattices.get(id.index())
    }

    pub fn root_universe(&self) -> Option<UniverseId> {
        self.root
    }

    fn check_material(&self, cell: CellId, material: MaterialId) -> Result<(), ConfigurationError> {
        if material.index() >= self.materials.len() {
            return Err(ConfigurationError::UnknownMaterial { cell, material });
        }
        Ok(())
    }

    /// Any edit discards the flattened tables
    fn invalidate(&mut self) {
        self.flat = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::vec2::Vec2;

    /// Box [-2, 2]² with a fuel pin of radius 1 split into 2 rings and 4 sectors
    fn pin_cell() -> Geometry {
        let mut g = Geometry::new();
        let fuel = g.add_material(Material::one_group("fuel", 1.0, 0.5, 0.6).unwrap());
        let water = g.add_material(Material::one_group("water", 1.0, 0.9, 0.0).unwrap());
        let planes = [
            Surface::x_plane(-2.0),
            Surface::x_plane(2.0),
            Surface::y_plane(-2.0),
            Surface::y_plane(2.0),
        ]
        .map(|s| g.add_surface(s.with_boundary(BoundaryType::Reflective)).unwrap());
        let circle = g.add_surface(Surface::circle(0.0, 0.0, 1.0)).unwrap();

        let inside = g
            .add_cell(
                Cell::new()
                    .with_surface(circle, Halfspace::Negative)
                    .with_fill(Fill::Material(fuel))
                    .with_rings(2)
                    .with_sectors(4),
            )
            .unwrap();
        let outside = g
            .add_cell(
                Cell::new()
                    .with_surface(circle, Halfspace::Positive)
                    .with_surface(planes[0], Halfspace::Positive)
                    .with_surface(planes[1], Halfspace::Negative)
                    .with_surface(planes[2], Halfspace::Positive)
                    .with_surface(planes[3], Halfspace::Negative)
                    .with_fill(Fill::Material(water)),
            )
            .unwrap();
        let root = g.add_universe(Universe::new().with_cells([inside, outside])).unwrap();
        g.set_root_universe(root);
        g
    }

    #[test]
    fn test_unknown_surface_fails_at_add_cell() {
        let mut g = Geometry::new();
        let err = g
            .add_cell(Cell::new().with_surface(SurfaceId::new(3), Halfspace::Positive))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownSurface {
                cell: Some(CellId::new(0)),
                surface: SurfaceId::new(3)
            }
        );
    }

    #[test]
    fn test_unknown_material_fails_at_set_fill() {
        let mut g = Geometry::new();
        let cell = g.add_cell(Cell::new()).unwrap();
        let err = g
            .set_cell_fill(cell, Fill::Material(MaterialId::new(0)))
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownMaterial { .. }));
    }

    #[test]
    fn test_pin_cell_fsr_layout() {
        let mut g = pin_cell();
        g.finalize().unwrap();
        // 2 rings x 4 sectors in the pin, 1 moderator region
        assert_eq!(g.num_fsrs(), 9);
        assert_eq!(g.num_groups(), 1);

        let loc = g.find_cell_containing(&Vec2::new(0.9, 0.1)).unwrap();
        assert_eq!((loc.ring(), loc.sector()), (1, 0));
        assert_eq!(loc.fsr(), FsrId::new(4));
        let info = g.fsr(loc.fsr()).unwrap();
        assert_eq!((info.ring, info.sector), (1, 0));

        let moderator = g.find_fsr(&Vec2::new(1.5, 1.5)).unwrap();
        assert_eq!(moderator, FsrId::new(8));
        assert!(!g.fsr_material(moderator).unwrap().is_fissile());
    }

    #[test]
    fn test_fsr_enumeration_matches_location() {
        let mut g = pin_cell();
        g.finalize().unwrap();
        for (x, y) in [(0.2, 0.3), (-0.2, 0.3), (-0.9, -0.1), (0.1, -0.95), (1.9, -1.9)] {
            let loc = g.find_cell_containing(&Vec2::new(x, y)).unwrap();
            let info = g.fsr(loc.fsr()).unwrap();
            assert_eq!(info.cell, loc.cell());
            assert_eq!(info.ring, loc.ring());
            assert_eq!(info.sector, loc.sector());
        }
    }

    #[test]
    fn test_bounds_and_distance_to_boundary() {
        let mut g = pin_cell();
        g.finalize().unwrap();
        let bounds = g.bounds().unwrap();
        assert_eq!(bounds.width(), 4.0);
        assert_eq!(bounds.boundary(BoxSide::Top), BoundaryType::Reflective);

        // From the moderator heading at the pin along -x
        let loc = g.find_cell_containing(&Vec2::new(1.5, 0.1)).unwrap();
        let d = g.distance_to_boundary(&loc, &Vec2::new(-1.0, 0.0)).unwrap();
        let expected = 1.5 - (1.0_f64 - 0.01).sqrt();
        assert!((d - expected).abs() < 1e-12);
    }

    #[test]
    fn test_edits_invalidate_finalization() {
        let mut g = pin_cell();
        g.finalize().unwrap();
        assert!(g.is_finalized());
        g.add_material(Material::one_group("extra", 1.0, 0.0, 0.0).unwrap());
        assert!(!g.is_finalized());
        assert_eq!(g.bounds().unwrap_err(), ConfigurationError::NotFinalized);
    }

    #[test]
    fn test_finalize_without_root() {
        let mut g = Geometry::new();
        g.add_material(Material::one_group("m", 1.0, 0.0, 0.0).unwrap());
        assert_eq!(g.finalize().unwrap_err(), ConfigurationError::NoRootUniverse);
    }
}
