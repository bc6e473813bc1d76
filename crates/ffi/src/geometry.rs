//! Geometry construction calls
//!
//! Ids handed out here are the raw values of the core id types and are only
//! meaningful for the instance that returned them.

use moc_core::geometry::{BoundaryType, Cell, Fill, Halfspace, Lattice, Surface, Universe};
use moc_core::{
    CellId, CrossSections, LatticeId, Material, MaterialId, MaterialLibrary, SurfaceId, UniverseId,
};
use std::os::raw::c_char;

use crate::error::{DefaultMocError, MocErrorCode};
use crate::helpers::{handle_ffi_result_error, slice_from, str_from, with_state_mut, write_out};
use crate::instance::MocInstance;

/// Boundary condition of a surface
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MocBoundaryType {
    Vacuum = 0,
    Reflective = 1,
    Periodic = 2,
    /// Internal surface
    Interface = 3,
}

impl From<MocBoundaryType> for BoundaryType {
    fn from(boundary: MocBoundaryType) -> Self {
        match boundary {
            MocBoundaryType::Vacuum => Self::Vacuum,
            MocBoundaryType::Reflective => Self::Reflective,
            MocBoundaryType::Periodic => Self::Periodic,
            MocBoundaryType::Interface => Self::Interface,
        }
    }
}

/// What a cell is filled with; the id is interpreted accordingly
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MocFillKind {
    Material = 0,
    Universe = 1,
    Lattice = 2,
}

fn fill_from(kind: MocFillKind, id: u32) -> Fill {
    match kind {
        MocFillKind::Material => Fill::Material(MaterialId::new(id)),
        MocFillKind::Universe => Fill::Universe(UniverseId::new(id)),
        MocFillKind::Lattice => Fill::Lattice(LatticeId::new(id)),
    }
}

/// Register a multi-group material.
///
/// Parameters
/// - `name`: null-terminated material name
/// - `num_groups`: G, the length of every per-group array
/// - `total`, `nu_fission`, `chi`: G values each
/// - `scatter`: G×G values, row `from`, column `to`
/// - `fission`: G values, or null when only νΣf is known (Σf is then zero)
/// - `out_material`: receives the material id
///
/// # Safety
/// `ptr` must come from `moc_new`; every non-null array must hold the stated count.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn moc_add_material(
    ptr: *const MocInstance,
    name: *const c_char,
    num_groups: usize,
    total: *const f64,
    scatter: *const f64,
    fission: *const f64,
    nu_fission: *const f64,
    chi: *const f64,
    out_material: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        if num_groups == 0 {
            return Err(DefaultMocError::invalid_parameter(
                "num_groups",
                "must be at least 1",
            ));
        }
        let name = unsafe { str_from(name, "name") }?;
        let cross_sections = CrossSections {
            total: unsafe { slice_from(total, num_groups, "total") }?.to_vec(),
            scatter: unsafe { slice_from(scatter, num_groups * num_groups, "scatter") }?.to_vec(),
            fission: if fission.is_null() {
                Vec::new()
            } else {
                unsafe { slice_from(fission, num_groups, "fission") }?.to_vec()
            },
            nu_fission: unsafe { slice_from(nu_fission, num_groups, "nu_fission") }?.to_vec(),
            chi: unsafe { slice_from(chi, num_groups, "chi") }?.to_vec(),
        };
        let material = Material::new(name, cross_sections)?;
        let id = unsafe {
            with_state_mut(ptr, |state| Ok(state.geometry_mut().add_material(material)))
        }?;
        unsafe { write_out(out_material, id.raw(), "out_material") }
    })
}

/// Register the material `name` from a JSON material library file.
///
/// # Safety
/// `ptr` must come from `moc_new`; `path` and `name` must be null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn moc_add_library_material(
    ptr: *const MocInstance,
    path: *const c_char,
    name: *const c_char,
    out_material: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let path = unsafe { str_from(path, "path") }?;
        let name = unsafe { str_from(name, "name") }?;
        let library = MaterialLibrary::from_json_file(path)?;
        let id = unsafe {
            with_state_mut(ptr, |state| {
                Ok(state.geometry_mut().add_library_material(&library, name)?)
            })
        }?;
        unsafe { write_out(out_material, id.raw(), "out_material") }
    })
}

unsafe fn add_surface(
    ptr: *const MocInstance,
    surface: Surface,
    boundary: MocBoundaryType,
    out_surface: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let surface = surface.with_boundary(boundary.into());
        let id = unsafe {
            with_state_mut(ptr, |state| Ok(state.geometry_mut().add_surface(surface)?))
        }?;
        unsafe { write_out(out_surface, id.raw(), "out_surface") }
    })
}

/// Register the plane `a·x + b·y + c = 0`.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_surface` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_add_plane(
    ptr: *const MocInstance,
    a: f64,
    b: f64,
    c: f64,
    boundary: MocBoundaryType,
    out_surface: *mut u32,
) -> MocErrorCode {
    unsafe { add_surface(ptr, Surface::plane(a, b, c), boundary, out_surface) }
}

/// Register the plane `x = x0`.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_surface` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_add_x_plane(
    ptr: *const MocInstance,
    x0: f64,
    boundary: MocBoundaryType,
    out_surface: *mut u32,
) -> MocErrorCode {
    unsafe { add_surface(ptr, Surface::x_plane(x0), boundary, out_surface) }
}

/// Register the plane `y = y0`.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_surface` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_add_y_plane(
    ptr: *const MocInstance,
    y0: f64,
    boundary: MocBoundaryType,
    out_surface: *mut u32,
) -> MocErrorCode {
    unsafe { add_surface(ptr, Surface::y_plane(y0), boundary, out_surface) }
}

/// Register a circle. Circles carry no boundary condition.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_surface` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_add_circle(
    ptr: *const MocInstance,
    x0: f64,
    y0: f64,
    radius: f64,
    out_surface: *mut u32,
) -> MocErrorCode {
    unsafe {
        add_surface(
            ptr,
            Surface::circle(x0, y0, radius),
            MocBoundaryType::Interface,
            out_surface,
        )
    }
}

/// Register a cell bounded by `count` surfaces.
///
/// Parameters
/// - `surfaces`, `halfspaces`: `count` surface ids and their sides (+1 or -1)
/// - `fill_kind`, `fill_id`: the cell's fill
/// - `rings`, `sectors`: subdivision of a material cell, 0 for none
///
/// # Safety
/// `ptr` must come from `moc_new`; both arrays must hold `count` values.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn moc_add_cell(
    ptr: *const MocInstance,
    surfaces: *const u32,
    halfspaces: *const i32,
    count: usize,
    fill_kind: MocFillKind,
    fill_id: u32,
    rings: usize,
    sectors: usize,
    out_cell: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let surfaces = unsafe { slice_from(surfaces, count, "surfaces") }?;
        let halfspaces = unsafe { slice_from(halfspaces, count, "halfspaces") }?;

        let mut cell = Cell::new().with_fill(fill_from(fill_kind, fill_id));
        for (&surface, &sign) in surfaces.iter().zip(halfspaces) {
            let halfspace = Halfspace::from_sign(sign).ok_or_else(|| {
                DefaultMocError::invalid_parameter(
                    "halfspaces",
                    &format!("expected +1 or -1, got {sign}"),
                )
            })?;
            cell = cell.with_surface(SurfaceId::new(surface), halfspace);
        }
        if rings > 0 {
            cell = cell.with_rings(rings);
        }
        if sectors > 0 {
            cell = cell.with_sectors(sectors);
        }

        let id = unsafe { with_state_mut(ptr, |state| Ok(state.geometry_mut().add_cell(cell)?)) }?;
        unsafe { write_out(out_cell, id.raw(), "out_cell") }
    })
}

/// Change the fill of an existing cell.
///
/// # Safety
/// `ptr` must come from `moc_new`.
#[no_mangle]
pub unsafe extern "C" fn moc_set_cell_fill(
    ptr: *const MocInstance,
    cell: u32,
    fill_kind: MocFillKind,
    fill_id: u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| unsafe {
        with_state_mut(ptr, |state| {
            Ok(state
                .geometry_mut()
                .set_cell_fill(CellId::new(cell), fill_from(fill_kind, fill_id))?)
        })
    })
}

/// Register a universe made of `count` cells.
///
/// # Safety
/// `ptr` must come from `moc_new`; `cells` must hold `count` ids.
#[no_mangle]
pub unsafe extern "C" fn moc_add_universe(
    ptr: *const MocInstance,
    cells: *const u32,
    count: usize,
    out_universe: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let cells = unsafe { slice_from(cells, count, "cells") }?;
        let universe = Universe::new().with_cells(cells.iter().map(|&c| CellId::new(c)));
        let id = unsafe {
            with_state_mut(ptr, |state| Ok(state.geometry_mut().add_universe(universe)?))
        }?;
        unsafe { write_out(out_universe, id.raw(), "out_universe") }
    })
}

/// Register an `nx`×`ny` lattice of universes.
///
/// `universes` holds `nx * ny` ids, rows listed top to bottom.
///
/// # Safety
/// `ptr` must come from `moc_new`; `universes` must hold `nx * ny` ids.
#[no_mangle]
pub unsafe extern "C" fn moc_add_lattice(
    ptr: *const MocInstance,
    nx: usize,
    ny: usize,
    width_x: f64,
    width_y: f64,
    universes: *const u32,
    out_lattice: *mut u32,
) -> MocErrorCode {
    handle_ffi_result_error(|| {
        if nx == 0 || ny == 0 {
            return Err(DefaultMocError::invalid_parameter(
                "nx, ny",
                &format!("lattice must have at least one cell, got {nx}x{ny}"),
            ));
        }
        let len = nx
            .checked_mul(ny)
            .ok_or_else(|| DefaultMocError::invalid_parameter("nx, ny", "too many cells"))?;
        let ids = unsafe { slice_from(universes, len, "universes") }?;
        let rows = ids
            .chunks(nx)
            .map(|row| row.iter().map(|&u| UniverseId::new(u)).collect())
            .collect();
        let lattice = Lattice::new(width_x, width_y, rows)?;
        let id = unsafe {
            with_state_mut(ptr, |state| Ok(state.geometry_mut().add_lattice(lattice)))
        }?;
        unsafe { write_out(out_lattice, id.raw(), "out_lattice") }
    })
}

/// Select the universe that spans the problem domain.
///
/// # Safety
/// `ptr` must come from `moc_new`.
#[no_mangle]
pub unsafe extern "C" fn moc_set_root_universe(ptr: *const MocInstance, universe: u32) -> MocErrorCode {
    handle_ffi_result_error(|| unsafe {
        with_state_mut(ptr, |state| {
            state.geometry_mut().set_root_universe(UniverseId::new(universe));
            Ok(())
        })
    })
}

/// Validate the geometry and divide it into flat source regions.
///
/// # Safety
/// `ptr` must come from `moc_new`; `out_num_fsrs` must be writable.
#[no_mangle]
pub unsafe extern "C" fn moc_finalize(ptr: *const MocInstance, out_num_fsrs: *mut usize) -> MocErrorCode {
    handle_ffi_result_error(|| {
        let num_fsrs = unsafe {
            with_state_mut(ptr, |state| {
                let geometry = state.geometry_mut();
                geometry.finalize()?;
                Ok(geometry.num_fsrs())
            })
        }?;
        unsafe { write_out(out_num_fsrs, num_fsrs, "out_num_fsrs") }
    })
}
