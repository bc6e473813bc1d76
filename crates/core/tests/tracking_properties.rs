//! Ray tracing and track layout properties on realistic geometries

mod common;

use approx::assert_relative_eq;
use common::{fuel_block_lattice, pin_cell};
use moc_core::geometry::BoundaryType;
use moc_core::tracking::{trace, TrackEnd, MIN_SEGMENT_LENGTH};
use moc_core::{TrackGenerator, TrackId, TrackOptions, Vec2};
use std::f64::consts::PI;

#[test]
fn test_reverse_chord_yields_reversed_segments() {
    let geometry = pin_cell(BoundaryType::Reflective);
    let chords = [
        (Vec2::new(-2.0, -1.3), Vec2::new(2.0, 0.7)),
        (Vec2::new(-2.0, 0.25), Vec2::new(2.0, 0.25)),
        (Vec2::new(0.3, -2.0), Vec2::new(-0.9, 2.0)),
    ];
    for (a, b) in chords {
        let forward = trace(&geometry, &a, &b, TrackId::new(0)).unwrap();
        let mut backward = trace(&geometry, &b, &a, TrackId::new(1)).unwrap();
        backward.reverse();
        assert_eq!(forward.len(), backward.len());
        for (f, r) in forward.iter().zip(&backward) {
            assert_eq!(f.fsr, r.fsr);
            assert_relative_eq!(f.length, r.length, epsilon = 1e-8);
        }
        let total: f64 = forward.iter().map(|s| s.length).sum();
        assert_relative_eq!(total, (b - a).norm(), epsilon = 1e-8);
    }
}

#[test]
fn test_grazing_rays_never_emit_tiny_segments() {
    let geometry = pin_cell(BoundaryType::Reflective);
    // Tangent to the pin, just inside and just outside, and along a sector ray
    for y in [1.0, 1.0 - 1e-12, 1.0 + 1e-12, 1.0 - 1e-9, 0.0] {
        let a = Vec2::new(-2.0, y);
        let b = Vec2::new(2.0, y);
        let segments = trace(&geometry, &a, &b, TrackId::new(0)).unwrap();
        assert!(!segments.is_empty());
        assert!(segments.iter().all(|s| s.length >= MIN_SEGMENT_LENGTH));
        let total: f64 = segments.iter().map(|s| s.length).sum();
        assert_relative_eq!(total, 4.0, epsilon = 1e-8);
    }
}

#[test]
fn test_region_areas_converge_on_lattice() {
    let geometry = fuel_block_lattice();
    let options = TrackOptions {
        num_azim: 16,
        spacing: 0.01,
        ..TrackOptions::default()
    };
    let tracks = TrackGenerator::new(options).generate(&geometry).unwrap();

    let total: f64 = tracks.fsr_volumes().iter().sum();
    assert_relative_eq!(total, 16.0, max_relative = 1e-9);

    let cell_area = (4.0_f64 / 9.0).powi(2);
    for (i, &volume) in tracks.fsr_volumes().iter().enumerate() {
        assert!(
            (volume - cell_area).abs() / cell_area < 0.01,
            "FSR {i} has area {volume}, expected {cell_area}"
        );
    }
}

#[test]
fn test_pin_areas_converge() {
    let geometry = pin_cell(BoundaryType::Vacuum);
    let options = TrackOptions {
        num_azim: 16,
        spacing: 0.01,
        ..TrackOptions::default()
    };
    let tracks = TrackGenerator::new(options).generate(&geometry).unwrap();
    let volumes = tracks.fsr_volumes();
    // Eight equal-area ring/sector regions of the unit pin
    for &v in &volumes[..8] {
        assert!((v - PI / 8.0).abs() / (PI / 8.0) < 0.01, "pin region area {v}");
    }
    assert!((volumes[8] - (16.0 - PI)).abs() / (16.0 - PI) < 0.01);
}

#[test]
fn test_track_ends_lie_on_the_domain_boundary() {
    let geometry = pin_cell(BoundaryType::Reflective);
    let options = TrackOptions {
        num_azim: 8,
        spacing: 0.1,
        ..TrackOptions::default()
    };
    let tracks = TrackGenerator::new(options).generate(&geometry).unwrap();
    assert_eq!(tracks.num_tracks(), tracks.azimuthal().total_tracks());
    for track in tracks.tracks() {
        for end in [TrackEnd::Start, TrackEnd::End] {
            let p = track.endpoint(end).point;
            let on_edge = (p.x.abs() - 2.0).abs() < 1e-9 || (p.y.abs() - 2.0).abs() < 1e-9;
            assert!(on_edge, "{} end at ({}, {})", track.id(), p.x, p.y);
            assert!(track.link(end).is_some());
        }
        let covered: f64 = track.segments().iter().map(|s| s.length).sum();
        assert_relative_eq!(covered, track.length(), epsilon = 1e-8);
    }
}
