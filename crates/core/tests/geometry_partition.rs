//! Sampled checks that finalized geometries partition their domain into FSRs

mod common;

use common::{fuel_block_lattice, pin_cell};
use moc_core::geometry::{BoundaryType, RasterKind};
use moc_core::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

#[test]
fn test_pin_cell_points_resolve_to_their_ring_and_sector() {
    let geometry = pin_cell(BoundaryType::Reflective);
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let ring_radius = 0.5_f64.sqrt();

    for _ in 0..5000 {
        let point = Vec2::new(rng.random_range(-2.0..2.0), rng.random_range(-2.0..2.0));
        let location = geometry
            .find_cell_containing(&point)
            .unwrap_or_else(|| panic!("({}, {}) is in no cell", point.x, point.y));
        let fsr = location.fsr();
        assert!(fsr.index() < geometry.num_fsrs());
        assert_eq!(geometry.find_fsr(&point), Some(fsr));

        let r = point.norm();
        // Skip points too close to an internal boundary to classify analytically
        if (r - 1.0).abs() < 1e-6 || (r - ring_radius).abs() < 1e-6 {
            continue;
        }
        if r > 1.0 {
            assert_eq!(fsr.index(), 8, "moderator point ({}, {})", point.x, point.y);
            continue;
        }
        let angle = point.y.atan2(point.x).rem_euclid(TAU);
        let sector = (angle / (TAU / 4.0)) as usize;
        let ring = usize::from(r >= ring_radius);
        let info = geometry.fsr(fsr).unwrap();
        assert_eq!(info.ring, ring);
        if (angle % (TAU / 4.0)).abs() > 1e-9 {
            assert_eq!(info.sector, sector.min(3));
        }
    }
}

#[test]
fn test_lattice_points_resolve_to_exactly_one_fsr() {
    let geometry = fuel_block_lattice();
    assert_eq!(geometry.num_fsrs(), 81);
    let mut rng = StdRng::seed_from_u64(42);
    let pitch = 4.0 / 9.0;

    for _ in 0..5000 {
        let point = Vec2::new(rng.random_range(-2.0..2.0), rng.random_range(-2.0..2.0));
        let location = geometry.find_cell_containing(&point).unwrap();
        let fuel = geometry.fsr_material(location.fsr()).unwrap().is_fissile();
        let in_block = point.x.abs() < 1.5 * pitch && point.y.abs() < 1.5 * pitch;
        if (point.x.abs() - 1.5 * pitch).abs() > 1e-9 && (point.y.abs() - 1.5 * pitch).abs() > 1e-9 {
            assert_eq!(fuel, in_block, "({}, {})", point.x, point.y);
        }
    }

    // Points outside the domain belong to no region
    assert!(geometry.find_fsr(&Vec2::new(2.5, 0.0)).is_none());
    assert!(geometry.find_fsr(&Vec2::new(0.0, -2.01)).is_none());
}

#[test]
fn test_raster_covers_every_region() {
    let geometry = fuel_block_lattice();
    let map = geometry.rasterize(90, 90, RasterKind::Fsr).unwrap();
    assert_eq!(map.distinct_values(), geometry.num_fsrs());
    assert!(map.values.iter().all(Option::is_some));

    let materials = geometry.rasterize(9, 9, RasterKind::Material).unwrap();
    assert_eq!(materials.distinct_values(), 2);
}
