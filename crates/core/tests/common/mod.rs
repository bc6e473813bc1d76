//! Shared geometries for the integration tests
#![allow(dead_code)]

use moc_core::geometry::{BoundaryType, Cell, Fill, Geometry, Halfspace, Lattice, Surface, Universe};
use moc_core::materials::{CrossSections, Material};
use moc_core::{MaterialId, SurfaceId, UniverseId};

/// Install a test subscriber once per test binary; `RUST_LOG` selects the level
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One-group infinite-medium data with k∞ = νΣf / Σa ≈ 1.4326
pub fn homogeneous_material() -> Material {
    Material::one_group("medium", 0.452648699, 0.383259177, 0.0994076580).unwrap()
}

pub fn two_group_fuel() -> Material {
    let fission = vec![1.0 / 480.0, 1.0 / 16.0];
    Material::new(
        "fuel",
        CrossSections {
            total: vec![2.0 / 9.0, 5.0 / 6.0],
            scatter: vec![71.0 / 360.0, 0.02, 0.0, 11.0 / 15.0],
            nu_fission: fission.iter().map(|f| 2.4 * f).collect(),
            fission,
            chi: vec![1.0, 0.0],
        },
    )
    .unwrap()
}

pub fn two_group_water() -> Material {
    Material::new(
        "water",
        CrossSections {
            total: vec![2.0 / 9.0, 5.0 / 3.0],
            scatter: vec![71.0 / 360.0, 0.025, 0.0, 47.0 / 30.0],
            fission: vec![0.0, 0.0],
            nu_fission: vec![0.0, 0.0],
            chi: vec![0.0, 0.0],
        },
    )
    .unwrap()
}

/// Planes `x = ±half`, `y = ±half` in left, right, bottom, top order
pub fn box_planes(g: &mut Geometry, half: f64, boundary: BoundaryType) -> [SurfaceId; 4] {
    [
        Surface::x_plane(-half),
        Surface::x_plane(half),
        Surface::y_plane(-half),
        Surface::y_plane(half),
    ]
    .map(|s| g.add_surface(s.with_boundary(boundary)).unwrap())
}

/// Cell inside the four planes returned by [`box_planes`]
pub fn boxed_cell(planes: [SurfaceId; 4], fill: Fill) -> Cell {
    Cell::new()
        .with_surface(planes[0], Halfspace::Positive)
        .with_surface(planes[1], Halfspace::Negative)
        .with_surface(planes[2], Halfspace::Positive)
        .with_surface(planes[3], Halfspace::Negative)
        .with_fill(fill)
}

/// Universe with one unbounded cell of `material`
pub fn material_universe(g: &mut Geometry, material: MaterialId) -> UniverseId {
    let cell = g.add_cell(Cell::new().with_fill(Fill::Material(material))).unwrap();
    g.add_universe(Universe::new().with_cell(cell)).unwrap()
}

/// Box [-2, 2]² with a pin of radius 1 split into 2 rings and 4 sectors
pub fn pin_cell(boundary: BoundaryType) -> Geometry {
    let mut g = Geometry::new();
    let fuel = g.add_material(Material::one_group("fuel", 1.0, 0.5, 0.6).unwrap());
    let water = g.add_material(Material::one_group("water", 1.0, 0.9, 0.0).unwrap());
    let planes = box_planes(&mut g, 2.0, boundary);
    let circle = g.add_surface(Surface::circle(0.0, 0.0, 1.0)).unwrap();

    let pin = g
        .add_cell(
            Cell::new()
                .with_surface(circle, Halfspace::Negative)
                .with_fill(Fill::Material(fuel))
                .with_rings(2)
                .with_sectors(4),
        )
        .unwrap();
    let moderator = g
        .add_cell(
            boxed_cell(planes, Fill::Material(water)).with_surface(circle, Halfspace::Positive),
        )
        .unwrap();
    let root = g.add_universe(Universe::new().with_cells([pin, moderator])).unwrap();
    g.set_root_universe(root);
    g.finalize().unwrap();
    g
}

/// 9×9 lattice of 4/9 cm water cells with a 3×3 fuel block in the center,
/// two-group data, vacuum on all sides
pub fn fuel_block_lattice() -> Geometry {
    let mut g = Geometry::new();
    let fuel = g.add_material(two_group_fuel());
    let water = g.add_material(two_group_water());
    let fuel_u = material_universe(&mut g, fuel);
    let water_u = material_universe(&mut g, water);

    let rows = (0..9)
        .map(|j| {
            (0..9)
                .map(|i| {
                    if (3..6).contains(&i) && (3..6).contains(&j) {
                        fuel_u
                    } else {
                        water_u
                    }
                })
                .collect()
        })
        .collect();
    let lattice = g.add_lattice(Lattice::new(4.0 / 9.0, 4.0 / 9.0, rows).unwrap());

    let planes = box_planes(&mut g, 2.0, BoundaryType::Vacuum);
    let root_cell = g.add_cell(boxed_cell(planes, Fill::Lattice(lattice))).unwrap();
    let root = g.add_universe(Universe::new().with_cell(root_cell)).unwrap();
    g.set_root_universe(root);
    g.finalize().unwrap();
    g
}

/// 200×200 cm reflective box of one homogeneous material, modeled as a ringed and
/// sectored pin in a 1×1 lattice
pub fn homogeneous_box() -> Geometry {
    let mut g = Geometry::new();
    let medium = g.add_material(homogeneous_material());
    let circle = g.add_surface(Surface::circle(0.0, 0.0, 10.0)).unwrap();
    let inner = g
        .add_cell(
            Cell::new()
                .with_surface(circle, Halfspace::Negative)
                .with_fill(Fill::Material(medium))
                .with_rings(2)
                .with_sectors(4),
        )
        .unwrap();
    let outer = g
        .add_cell(
            Cell::new()
                .with_surface(circle, Halfspace::Positive)
                .with_fill(Fill::Material(medium)),
        )
        .unwrap();
    let pin = g.add_universe(Universe::new().with_cells([inner, outer])).unwrap();
    let lattice = g.add_lattice(Lattice::new(200.0, 200.0, vec![vec![pin]]).unwrap());

    let planes = box_planes(&mut g, 100.0, BoundaryType::Reflective);
    let root_cell = g.add_cell(boxed_cell(planes, Fill::Lattice(lattice))).unwrap();
    let root = g.add_universe(Universe::new().with_cell(root_cell)).unwrap();
    g.set_root_universe(root);
    g.finalize().unwrap();
    g
}
