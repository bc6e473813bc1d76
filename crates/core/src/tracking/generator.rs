//! Cyclic track layout, ray tracing and boundary linking

use super::quadrature::{AzimuthalAngle, AzimuthalQuadrature, PolarQuadrature};
use super::track::{EndPoint, Link, Segment, Track, TrackEnd};
use crate::config::TrackOptions;
use crate::core_types::ids::{FsrId, TrackId};
use crate::core_types::vec2::{direction, Vec2};
use crate::error::{MocError, TracingError};
use crate::geometry::{BoundaryType, BoundingBox, BoxSide, Geometry};
use crate::timer::{ProfilerScope, Timer};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::f64::consts::FRAC_PI_2;
use tracing::{debug, info};

/// Step taken past a boundary before locating the next region
const NUDGE: f64 = 1e-9;

/// Pieces shorter than this are not emitted as segments
pub const MIN_SEGMENT_LENGTH: f64 = 1e-10;

/// Builds the track set of a finalized geometry
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackGenerator {
    options: TrackOptions,
}

impl TrackGenerator {
    pub fn new(options: TrackOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrackOptions {
        &self.options
    }

    /// Lay out, trace and link every track of the geometry
    ///
    /// Tracing is parallel over azimuthal angles.
    ///
    /// # Errors
    ///
    /// - [`crate::error::ConfigurationError`] for invalid options or a geometry that
    ///   was not finalized
    /// - [`TracingError::Gap`] when a track crosses a point that lies in no cell
    pub fn generate(&self, geometry: &Geometry) -> Result<TrackSet, MocError> {
        self.options.validate()?;
        let bounds = *geometry.bounds()?;
        if !(bounds.width() > 0.0 && bounds.height() > 0.0)
            || !bounds.width().is_finite()
            || !bounds.height().is_finite()
        {
            return Err(TracingError::EmptyDomain {
                width: bounds.width(),
                height: bounds.height(),
            }
            .into());
        }

        let mut timer = Timer::new();
        let layout_scope = ProfilerScope::new("Track layout");
        let azimuthal = AzimuthalQuadrature::new(
            self.options.num_azim,
            self.options.spacing,
            bounds.width(),
            bounds.height(),
        )?;

        let mut angle_offsets = Vec::with_capacity(azimuthal.num_angles() + 1);
        let mut total = 0;
        for angle in azimuthal.angles() {
            angle_offsets.push(total);
            total += angle.num_tracks();
        }
        angle_offsets.push(total);
        layout_scope.record(&mut timer);

        info!(
            "Generating {} tracks over {} azimuthal angles (spacing {})",
            total,
            azimuthal.num_angles(),
            self.options.spacing
        );

        let tracing_scope = ProfilerScope::new("Ray tracing");
        let num_fsrs = geometry.num_fsrs();
        let traced: Vec<TracedAngle> = azimuthal
            .angles()
            .par_iter()
            .enumerate()
            .map(|(a, angle)| {
                trace_angle(geometry, &bounds, a, angle, angle_offsets[a], num_fsrs)
            })
            .collect::<Result<_, TracingError>>()?;
        tracing_scope.record(&mut timer);

        let mut tracks = Vec::with_capacity(total);
        let mut volumes = vec![0.0; num_fsrs];
        let mut moments = vec![Vec2::zeros(); num_fsrs];
        for angle in traced {
            tracks.extend(angle.tracks);
            for (v, dv) in volumes.iter_mut().zip(&angle.volumes) {
                *v += *dv;
            }
            for (m, dm) in moments.iter_mut().zip(&angle.moments) {
                *m += *dm;
            }
        }
        let centroids = volumes
            .iter()
            .zip(&moments)
            .map(|(&v, m)| if v > 0.0 { *m / v } else { Vec2::zeros() })
            .collect();

        let link_scope = ProfilerScope::new("Boundary linking");
        link_tracks(&mut tracks, &azimuthal, &angle_offsets);
        link_scope.record(&mut timer);

        let num_segments = tracks.iter().map(|t| t.segments.len()).sum();
        let untracked = volumes.iter().filter(|&&v| v == 0.0).count();
        info!(
            "Traced {} tracks into {} segments in {:.3} s",
            tracks.len(),
            num_segments,
            timer.split("Ray tracing")
        );
        if untracked > 0 {
            debug!("{untracked} FSRs were not crossed by any track");
        }

        Ok(TrackSet {
            tracks,
            azimuthal,
            polar: self.options.polar,
            angle_offsets,
            bounds,
            fsr_volumes: volumes,
            fsr_centroids: centroids,
            num_segments,
            timer,
        })
    }
}

/// Tracks and per-FSR tallies of one azimuthal angle
struct TracedAngle {
    tracks: Vec<Track>,
    volumes: Vec<f64>,
    moments: Vec<Vec2>,
}

fn trace_angle(
    geometry: &Geometry,
    bounds: &BoundingBox,
    a: usize,
    angle: &AzimuthalAngle,
    first_id: usize,
    num_fsrs: usize,
) -> Result<TracedAngle, TracingError> {
    let dir = direction(angle.phi);
    let dx = angle.dx(bounds.width());
    let dy = angle.dy(bounds.height());
    let upward_right = angle.phi < FRAC_PI_2;

    let mut starts = Vec::with_capacity(angle.num_tracks());
    for k in 0..angle.num_x {
        let x = if upward_right {
            bounds.min.x + dx * (angle.num_x - k) as f64 - 0.5 * dx
        } else {
            bounds.min.x + dx * (k as f64 + 0.5)
        };
        starts.push((Vec2::new(x, bounds.min.y), BoxSide::Bottom));
    }
    for k in 0..angle.num_y {
        let y = bounds.min.y + dy * (k as f64 + 0.5);
        if upward_right {
            starts.push((Vec2::new(bounds.min.x, y), BoxSide::Left));
        } else {
            starts.push((Vec2::new(bounds.max.x, y), BoxSide::Right));
        }
    }

    // Both sweep directions cover the angle, hence the factor 2
    let area_weight = 2.0 * angle.weight * angle.spacing;
    let mut volumes = vec![0.0; num_fsrs];
    let mut moments = vec![Vec2::zeros(); num_fsrs];
    let mut tracks = Vec::with_capacity(starts.len());

    for (k, (start, start_side)) in starts.into_iter().enumerate() {
        let id = TrackId::from_index(first_id + k);
        let (length, end_side) = bounds
            .exit(&start, &dir)
            .ok_or(TracingError::EmptyDomain {
                width: bounds.width(),
                height: bounds.height(),
            })?;
        let end = start + dir * length;

        let segments = trace(geometry, &start, &end, id)?;

        let mut travelled = 0.0;
        for segment in &segments {
            let mid = start + dir * (travelled + 0.5 * segment.length);
            let weight = area_weight * segment.length;
            volumes[segment.fsr.index()] += weight;
            moments[segment.fsr.index()] += mid * weight;
            travelled += segment.length;
        }

        tracks.push(Track {
            id,
            angle: a,
            phi: angle.phi,
            start: endpoint(bounds, start, start_side, dx, dy),
            end: endpoint(bounds, end, end_side, dx, dy),
            segments,
            links: [None, None],
        });
    }

    Ok(TracedAngle {
        tracks,
        volumes,
        moments,
    })
}

fn endpoint(bounds: &BoundingBox, point: Vec2, side: BoxSide, dx: f64, dy: f64) -> EndPoint {
    let (offset, spacing) = match side {
        BoxSide::Left | BoxSide::Right => (point.y - bounds.min.y, dy),
        BoxSide::Bottom | BoxSide::Top => (point.x - bounds.min.x, dx),
    };
    EndPoint {
        point,
        side,
        index: (offset / spacing - 0.5).round().max(0.0) as usize,
        boundary: bounds.boundary(side),
    }
}

/// Segment the chord from `start` to `end` by the flat source regions it crosses
///
/// Consecutive pieces in the same region are merged and pieces shorter than
/// [`MIN_SEGMENT_LENGTH`] are dropped, so tangent and grazing rays never produce
/// zero-length segments.
///
/// # Errors
///
/// [`TracingError::Gap`] when a point along the chord lies in no cell; `track` names
/// the chord in the error.
pub fn trace(
    geometry: &Geometry,
    start: &Vec2,
    end: &Vec2,
    track: TrackId,
) -> Result<Vec<Segment>, TracingError> {
    let chord = end - start;
    let length = chord.norm();
    if length <= NUDGE {
        return Ok(Vec::new());
    }
    let dir = chord / length;

    let mut segments: Vec<Segment> = Vec::new();
    let mut travelled = 0.0;
    while length - travelled > NUDGE {
        let probe = start + dir * (travelled + NUDGE);
        let location = geometry
            .find_cell_containing(&probe)
            .ok_or(TracingError::Gap {
                track,
                x: probe.x,
                y: probe.y,
            })?;
        let step = geometry
            .distance_to_boundary(&location, &dir)
            .map_or(length, |d| travelled + NUDGE + d)
            .min(length);
        push_piece(&mut segments, location.fsr(), step - travelled);
        travelled = step;
    }
    Ok(segments)
}

fn push_piece(segments: &mut Vec<Segment>, fsr: FsrId, length: f64) {
    match segments.last_mut() {
        Some(last) if last.fsr == fsr => last.length += length,
        _ if length < MIN_SEGMENT_LENGTH => {}
        _ => segments.push(Segment { fsr, length }),
    }
}

/// Fill the boundary links of every track end
///
/// Reflective ends link to the complementary angle's end at the same side and
/// position, periodic ends to the same angle's end at the opposite side.
fn link_tracks(tracks: &mut [Track], azimuthal: &AzimuthalQuadrature, angle_offsets: &[usize]) {
    let ends: Vec<FxHashMap<(BoxSide, usize), Link>> = (0..azimuthal.num_angles())
        .map(|a| {
            let mut map = FxHashMap::default();
            for track in &tracks[angle_offsets[a]..angle_offsets[a + 1]] {
                for end in [TrackEnd::Start, TrackEnd::End] {
                    let p = track.endpoint(end);
                    map.insert(
                        (p.side, p.index),
                        Link {
                            track: track.id,
                            end,
                        },
                    );
                }
            }
            map
        })
        .collect();

    for track in tracks.iter_mut() {
        for end in [TrackEnd::Start, TrackEnd::End] {
            let p = *track.endpoint(end);
            let link = match p.boundary {
                BoundaryType::Reflective => ends[azimuthal.complement(track.angle)]
                    .get(&(p.side, p.index))
                    .copied(),
                BoundaryType::Periodic => ends[track.angle]
                    .get(&(p.side.opposite(), p.index))
                    .copied(),
                BoundaryType::Vacuum | BoundaryType::Interface => None,
            };
            debug_assert!(
                link.is_some() || matches!(p.boundary, BoundaryType::Vacuum | BoundaryType::Interface),
                "{} has no partner at {:?} {}",
                track.id,
                p.side,
                p.index
            );
            track.links[end.index()] = link;
        }
    }
}

/// Owned result of track generation
#[derive(Debug, Clone)]
pub struct TrackSet {
    tracks: Vec<Track>,
    azimuthal: AzimuthalQuadrature,
    polar: PolarQuadrature,
    angle_offsets: Vec<usize>,
    bounds: BoundingBox,
    fsr_volumes: Vec<f64>,
    fsr_centroids: Vec<Vec2>,
    num_segments: usize,
    timer: Timer,
}

impl TrackSet {
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id.index())
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn num_segments(&self) -> usize {
        self.num_segments
    }

    /// Tracks of azimuthal angle `angle`
    pub fn tracks_for_angle(&self, angle: usize) -> &[Track] {
        &self.tracks[self.angle_offsets[angle]..self.angle_offsets[angle + 1]]
    }

    pub fn azimuthal(&self) -> &AzimuthalQuadrature {
        &self.azimuthal
    }

    pub fn polar(&self) -> PolarQuadrature {
        self.polar
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Tracked area of every FSR, indexed by FSR id
    pub fn fsr_volumes(&self) -> &[f64] {
        &self.fsr_volumes
    }

    pub fn fsr_volume(&self, fsr: FsrId) -> f64 {
        self.fsr_volumes[fsr.index()]
    }

    /// Length-weighted segment midpoint of every FSR
    pub fn fsr_centroids(&self) -> &[Vec2] {
        &self.fsr_centroids
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Cell, Fill, Halfspace, Surface, Universe};
    use crate::materials::Material;
    use approx::assert_relative_eq;

    fn square(boundary: BoundaryType, with_pin: bool) -> Geometry {
        let mut g = Geometry::new();
        let m = g.add_material(Material::one_group("m", 1.0, 0.5, 0.5).unwrap());
        let planes = [
            Surface::x_plane(-1.0),
            Surface::x_plane(1.0),
            Surface::y_plane(-1.0),
            Surface::y_plane(1.0),
        ]
        .map(|s| g.add_surface(s.with_boundary(boundary)).unwrap());
        let mut outer = Cell::new()
            .with_surface(planes[0], Halfspace::Positive)
            .with_surface(planes[1], Halfspace::Negative)
            .with_surface(planes[2], Halfspace::Positive)
            .with_surface(planes[3], Halfspace::Negative)
            .with_fill(Fill::Material(m));
        let mut cells = Vec::new();
        if with_pin {
            let circle = g.add_surface(Surface::circle(0.0, 0.0, 0.5)).unwrap();
            outer = outer.with_surface(circle, Halfspace::Positive);
            cells.push(
                g.add_cell(
                    Cell::new()
                        .with_surface(circle, Halfspace::Negative)
                        .with_fill(Fill::Material(m)),
                )
                .unwrap(),
            );
        }
        cells.push(g.add_cell(outer).unwrap());
        let root = g.add_universe(Universe::new().with_cells(cells)).unwrap();
        g.set_root_universe(root);
        g.finalize().unwrap();
        g
    }

    fn generate(g: &Geometry, num_azim: usize, spacing: f64) -> TrackSet {
        TrackGenerator::new(TrackOptions {
            num_azim,
            spacing,
            ..TrackOptions::default()
        })
        .generate(g)
        .unwrap()
    }

    #[test]
    fn test_requires_finalized_geometry() {
        let g = Geometry::new();
        assert!(TrackGenerator::default().generate(&g).is_err());
    }

    #[test]
    fn test_volume_of_homogeneous_box_is_exact() {
        let g = square(BoundaryType::Vacuum, false);
        let tracks = generate(&g, 8, 0.05);
        assert_relative_eq!(tracks.fsr_volumes()[0], 4.0, max_relative = 1e-10);
        let c = tracks.fsr_centroids()[0];
        assert!(c.norm() < 1e-9);
    }

    #[test]
    fn test_pin_area_converges() {
        let g = square(BoundaryType::Vacuum, true);
        let tracks = generate(&g, 16, 0.01);
        let pin = std::f64::consts::PI * 0.25;
        assert_relative_eq!(tracks.fsr_volumes()[0], pin, max_relative = 1e-2);
        assert_relative_eq!(tracks.fsr_volumes()[1], 4.0 - pin, max_relative = 1e-2);
    }

    #[test]
    fn test_segments_cover_track_length() {
        let g = square(BoundaryType::Reflective, true);
        let tracks = generate(&g, 8, 0.1);
        for track in tracks.tracks() {
            let total: f64 = track.segments().iter().map(|s| s.length).sum();
            assert_relative_eq!(total, track.length(), epsilon = 1e-8);
            assert!(track.segments().iter().all(|s| s.length >= MIN_SEGMENT_LENGTH));
            assert!(track
                .segments()
                .windows(2)
                .all(|w| w[0].fsr != w[1].fsr));
        }
    }

    #[test]
    fn test_reflective_links_are_mutual() {
        let g = square(BoundaryType::Reflective, false);
        let tracks = generate(&g, 8, 0.1);
        for track in tracks.tracks() {
            for end in [TrackEnd::Start, TrackEnd::End] {
                let link = track.link(end).unwrap();
                let partner = tracks.track(link.track).unwrap();
                assert_eq!(
                    tracks.azimuthal().complement(track.angle()),
                    partner.angle()
                );
                let back = partner.link(link.end).unwrap();
                assert_eq!(back.track, track.id());
                assert_eq!(back.end, end);
                let a = track.endpoint(end).point;
                let b = partner.endpoint(link.end).point;
                assert!((a - b).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_periodic_links_cross_the_domain() {
        let g = square(BoundaryType::Periodic, false);
        let tracks = generate(&g, 8, 0.1);
        for track in tracks.tracks() {
            let link = track.link(TrackEnd::End).unwrap();
            let partner = tracks.track(link.track).unwrap();
            assert_eq!(partner.angle(), track.angle());
            assert_eq!(link.end, TrackEnd::Start);
            assert_eq!(partner.start().side, track.end().side.opposite());
        }
    }

    #[test]
    fn test_vacuum_has_no_links() {
        let g = square(BoundaryType::Vacuum, false);
        let tracks = generate(&g, 4, 0.2);
        assert!(tracks
            .tracks()
            .iter()
            .all(|t| t.link(TrackEnd::Start).is_none() && t.link(TrackEnd::End).is_none()));
        assert!(tracks.timer().split("Ray tracing") > 0.0);
    }
}
