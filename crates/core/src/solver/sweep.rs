//! Transport sweep (CPU implementation)
//!
//! Every track is swept forward and backward for every polar angle and group. The
//! angular flux entering a track comes from the `incoming` buffer, and the flux
//! leaving it is written to the track's slot of `outgoing`. Tracks never touch
//! each other's data during a sweep, so the sweep runs in parallel over tracks
//! with one scalar-flux tally per rayon job, merged by an associative reduce.
//!
//! Boundary buffers hold `2 · P · G` values per track, laid out as
//! `(track · 2 + direction) · P · G + polar · G + group`.

use super::exponential::Exponential;
use super::fields::FluxField;
use super::source::FOUR_PI;
use crate::tracking::{Direction, Segment, Track, TrackSet};
use rayon::prelude::*;

/// Per-job accumulator of a sweep
#[derive(Debug, Clone)]
pub(crate) struct SweepTally {
    /// Weighted angular flux change per region and group
    pub flux: Vec<f64>,
    /// Weighted angular flux leaving through vacuum ends
    pub leakage: f64,
}

impl SweepTally {
    fn new(len: usize) -> Self {
        Self {
            flux: vec![0.0; len],
            leakage: 0.0,
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (a, b) in self.flux.iter_mut().zip(&other.flux) {
            *a += *b;
        }
        self.leakage += other.leakage;
        self
    }
}

/// Read-only inputs of a sweep
pub(crate) struct SweepParams<'a> {
    pub tracks: &'a TrackSet,
    pub sigma_t: &'a FluxField,
    pub reduced_source: &'a FluxField,
    pub exponential: &'a Exponential,
}

/// Number of boundary values stored per track and direction
pub(crate) fn values_per_direction(tracks: &TrackSet, num_groups: usize) -> usize {
    tracks.polar().num_polar() * num_groups
}

/// Sweep all tracks once
///
/// # Arguments
///
/// * `params` - Tracks, cross sections and the reduced source
/// * `incoming` - Angular flux entering every track and direction
/// * `outgoing` - Output, angular flux leaving every track and direction
///
/// # Returns
///
/// The merged tally of all tracks
pub(crate) fn transport_sweep_cpu(
    params: &SweepParams<'_>,
    incoming: &[f64],
    outgoing: &mut [f64],
) -> SweepTally {
    let num_groups = params.sigma_t.num_groups;
    let stride = 2 * values_per_direction(params.tracks, num_groups);
    let weights = track_weights(params.tracks);
    let len = params.sigma_t.data.len();

    outgoing
        .par_chunks_mut(stride)
        .zip(incoming.par_chunks(stride))
        .zip(params.tracks.tracks().par_iter())
        .fold(
            || SweepTally::new(len),
            |mut tally, ((out, inc), track)| {
                sweep_track(params, &weights, track, inc, out, &mut tally);
                tally
            },
        )
        .reduce(|| SweepTally::new(len), SweepTally::merge)
}

/// Quadrature weight `4π · w_azim · w_polar · spacing · sin θ` per angle and polar angle
fn track_weights(tracks: &TrackSet) -> Vec<f64> {
    let polar = tracks.polar();
    tracks
        .azimuthal()
        .angles()
        .iter()
        .flat_map(|angle| {
            polar
                .weights()
                .iter()
                .zip(polar.sin_thetas())
                .map(move |(w, sin_theta)| FOUR_PI * angle.weight * w * angle.spacing * sin_theta)
        })
        .collect()
}

fn sweep_track(
    params: &SweepParams<'_>,
    weights: &[f64],
    track: &Track,
    incoming: &[f64],
    outgoing: &mut [f64],
    tally: &mut SweepTally,
) {
    let sin_thetas = params.tracks.polar().sin_thetas();
    let num_polar = sin_thetas.len();
    let num_groups = params.sigma_t.num_groups;
    let n = num_polar * num_groups;
    let weights = &weights[track.angle() * num_polar..(track.angle() + 1) * num_polar];

    for direction in Direction::BOTH {
        let offset = direction.index() * n;
        let psi = &mut outgoing[offset..offset + n];
        psi.copy_from_slice(&incoming[offset..offset + n]);

        match direction {
            Direction::Forward => {
                for segment in track.segments() {
                    attenuate(params, sin_thetas, weights, segment, psi, tally);
                }
            }
            Direction::Backward => {
                for segment in track.segments().iter().rev() {
                    attenuate(params, sin_thetas, weights, segment, psi, tally);
                }
            }
        }

        if track.link(direction.exit()).is_none() {
            tally.leakage += psi
                .chunks(num_groups)
                .zip(weights)
                .map(|(polar_psi, w)| w * polar_psi.iter().sum::<f64>())
                .sum::<f64>();
        }
    }
}

/// Carry `psi` across one segment and tally the change
#[inline]
fn attenuate(
    params: &SweepParams<'_>,
    sin_thetas: &[f64],
    weights: &[f64],
    segment: &Segment,
    psi: &mut [f64],
    tally: &mut SweepTally,
) {
    let num_groups = params.sigma_t.num_groups;
    let sigma_t = params.sigma_t.region(segment.fsr);
    let source = params.reduced_source.region(segment.fsr);
    let start = segment.fsr.index() * num_groups;
    let row = &mut tally.flux[start..start + num_groups];

    for ((polar_psi, sin_theta), w) in psi.chunks_mut(num_groups).zip(sin_thetas).zip(weights) {
        let length = segment.length / sin_theta;
        for g in 0..num_groups {
            let delta = (polar_psi[g] - source[g])
                * params.exponential.attenuation(sigma_t[g] * length);
            polar_psi[g] -= delta;
            row[g] += w * delta;
        }
    }
}
