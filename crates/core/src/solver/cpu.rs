//! CPU-based transport solver implementation
//!
//! This module provides the `TransportSolver` implementation used by every front
//! end: flat `Vec<f64>` fields and Rayon for parallelism. One power iteration is
//! a sequence of synchronous parallel stages:
//!
//! 1. normalize the flux to a unit fission source
//! 2. update the reduced source of every region
//! 3. sweep all tracks, then route outgoing boundary fluxes to linked tracks
//! 4. rebuild the scalar flux from the sweep tally
//! 5. update k from the fission source ratio

use super::exponential::Exponential;
use super::fields::FluxField;
use super::snapshot::{RegionSolution, SolutionSnapshot};
use super::source::{fission_rates_cpu, total_absorption_cpu, update_source_cpu, FOUR_PI};
use super::state::{EigenvalueResult, InitialGuess, IterationRecord, SolverState};
use super::sweep::{transport_sweep_cpu, values_per_direction, SweepParams};
use super::TransportSolver;
use crate::config::SolverOptions;
use crate::core_types::ids::{FsrId, MaterialId};
use crate::error::{ConfigurationError, MocError, NumericError};
use crate::geometry::Geometry;
use crate::materials::Material;
use crate::timer::{ProfilerScope, Timer};
use crate::tracking::{Direction, TrackSet};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Smallest total cross section the solver divides by
pub const MIN_SIGMA_T: f64 = 1e-12;

/// CPU power-iteration solver over a tracked geometry
///
/// Borrows the geometry and its tracks; both stay usable after a failed solve.
pub struct CpuSolver<'a> {
    geometry: &'a Geometry,
    tracks: &'a TrackSet,
    options: SolverOptions,
    pool: Option<Arc<ThreadPool>>,
    exponential: Exponential,

    // Per-region data, indexed by FSR id
    materials: Vec<&'a Material>,
    volumes: Vec<f64>,
    sigma_t: FluxField,

    // Iteration fields
    flux: FluxField,
    reduced_source: FluxField,
    // Boundary angular fluxes: read from `incoming`, written to `outgoing`, then routed back
    incoming: Vec<f64>,
    outgoing: Vec<f64>,
    // Slot in `outgoing` feeding each slot of `incoming`, `None` at vacuum ends
    sources: Vec<Option<usize>>,

    k_eff: f64,
    leakage: f64,
    state: SolverState,
    history: Vec<IterationRecord>,
    timer: Timer,
}

impl<'a> CpuSolver<'a> {
    /// Create a solver for `geometry` swept along `tracks`
    ///
    /// # Arguments
    ///
    /// * `geometry` - Finalized geometry the tracks were generated for
    /// * `tracks` - Output of [`crate::tracking::TrackGenerator::generate`]
    /// * `options` - Thread count, tolerances and exponential evaluation
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError`] for invalid options, an unfinalized geometry or
    ///   tracks generated for a different geometry
    /// - [`NumericError::NonPositiveTotal`] if a region's material has Σt ≤ 1e-12
    pub fn new(
        geometry: &'a Geometry,
        tracks: &'a TrackSet,
        options: SolverOptions,
    ) -> Result<Self, MocError> {
        options.validate()?;
        if !geometry.is_finalized() {
            return Err(ConfigurationError::NotFinalized.into());
        }
        let num_fsrs = geometry.num_fsrs();
        let num_groups = geometry.num_groups();
        if tracks.fsr_volumes().len() != num_fsrs {
            return Err(ConfigurationError::InvalidOption {
                name: "tracks",
                reason: format!(
                    "tracks cover {} regions but the geometry has {num_fsrs}",
                    tracks.fsr_volumes().len()
                ),
            }
            .into());
        }

        let mut materials = Vec::with_capacity(num_fsrs);
        for info in geometry.fsrs() {
            let material = geometry
                .material(info.material)
                .ok_or(ConfigurationError::NotFinalized)?;
            materials.push(material);
        }
        check_total_cross_sections(geometry)?;

        let mut sigma_t = FluxField::new(num_fsrs, num_groups);
        for (row, material) in sigma_t.data.chunks_mut(num_groups).zip(&materials) {
            for (g, value) in row.iter_mut().enumerate() {
                *value = material.sigma_t(g);
            }
        }

        let pool = if options.num_threads > 0 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(options.num_threads)
                .build()
                .map_err(|e| ConfigurationError::InvalidOption {
                    name: "num_threads",
                    reason: e.to_string(),
                })?;
            Some(Arc::new(pool))
        } else {
            None
        };

        let boundary_len = tracks.num_tracks() * 2 * values_per_direction(tracks, num_groups);
        debug!(
            "Transport solver: {} FSRs, {} groups, {} boundary fluxes, {} threads",
            num_fsrs,
            num_groups,
            boundary_len,
            options.num_threads
        );

        Ok(Self {
            geometry,
            tracks,
            exponential: options.exponential.build()?,
            options,
            pool,
            materials,
            volumes: tracks.fsr_volumes().to_vec(),
            sigma_t,
            flux: FluxField::new(num_fsrs, num_groups),
            reduced_source: FluxField::new(num_fsrs, num_groups),
            incoming: vec![0.0; boundary_len],
            outgoing: vec![0.0; boundary_len],
            sources: incoming_sources(tracks),
            k_eff: 1.0,
            leakage: 0.0,
            state: SolverState::Uninitialized,
            history: Vec::new(),
            timer: Timer::new(),
        })
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Solve with the iteration cap and tolerance of the solver options
    pub fn solve(&mut self) -> Result<EigenvalueResult, MocError> {
        self.compute_eigenvalue(self.options.max_iterations, self.options.tolerance)
    }

    fn initialize(&mut self, guess: InitialGuess) {
        let warm = guess == InitialGuess::Previous && self.state.has_solution();
        if guess == InitialGuess::Previous && !warm {
            debug!("No previous solution, starting from a uniform flux");
        }
        if !warm {
            self.flux.fill(1.0);
            self.incoming.fill(0.0);
            self.k_eff = 1.0;
            self.leakage = 0.0;
        }
        self.history.clear();
        self.state = SolverState::FluxInitialized;
    }

    fn iterate(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<EigenvalueResult, MocError> {
        let solve_scope = ProfilerScope::new("Total solve");
        let mut result = EigenvalueResult {
            k_eff: self.k_eff,
            converged: false,
            iterations: 0,
            residual: f64::INFINITY,
            leakage: self.leakage,
            balance_k: 0.0,
        };
        let mut production = 1.0;

        for iteration in 0..max_iterations {
            self.state = SolverState::Sweeping;
            self.normalize(iteration)?;
            let old_rates = fission_rates_cpu(&self.materials, &self.flux, &self.volumes);

            let scope = ProfilerScope::new("Source update");
            update_source_cpu(&self.materials, &self.flux, self.k_eff, &mut self.reduced_source);
            scope.record(&mut self.timer);

            let scope = ProfilerScope::new("Transport sweep");
            let params = SweepParams {
                tracks: self.tracks,
                sigma_t: &self.sigma_t,
                reduced_source: &self.reduced_source,
                exponential: &self.exponential,
            };
            let tally = transport_sweep_cpu(&params, &self.incoming, &mut self.outgoing);
            self.route_boundary_fluxes();
            scope.record(&mut self.timer);

            let scope = ProfilerScope::new("Flux update");
            self.update_flux(&tally.flux);
            self.check_flux(iteration)?;
            scope.record(&mut self.timer);

            let new_rates = fission_rates_cpu(&self.materials, &self.flux, &self.volumes);
            production = new_rates.iter().sum::<f64>();
            if !(production > 0.0 && production.is_finite()) {
                return Err(NumericError::ZeroFissionSource { iteration }.into());
            }
            let k_new = self.k_eff * production;
            let delta_k = (k_new - self.k_eff).abs() / k_new;
            let residual = source_residual(&old_rates, &new_rates, production);
            let absorption = total_absorption_cpu(&self.materials, &self.flux, &self.volumes);

            self.k_eff = k_new;
            self.leakage = tally.leakage / production;
            self.history.push(IterationRecord {
                iteration,
                k_eff: k_new,
                delta_k,
                residual,
            });
            debug!(
                "Iteration {}: k_eff = {:.6}, residual = {:.3E}",
                iteration, k_new, residual
            );

            result = EigenvalueResult {
                k_eff: k_new,
                converged: delta_k < tolerance && residual < tolerance,
                iterations: iteration + 1,
                residual,
                leakage: self.leakage,
                balance_k: production / (absorption + tally.leakage),
            };
            if result.converged {
                break;
            }
        }

        // Leave the flux normalized to a unit fission source
        let scale = 1.0 / production;
        self.flux.scale(scale);
        self.incoming.iter_mut().for_each(|v| *v *= scale);

        solve_scope.record(&mut self.timer);
        if result.converged {
            self.state = SolverState::Converged;
            info!(
                "Converged after {} iterations: k_eff = {:.6}",
                result.iterations, result.k_eff
            );
        } else {
            self.state = SolverState::MaxItersReached;
            warn!(
                "No convergence after {} iterations: k_eff = {:.6}, residual = {:.3E}",
                result.iterations, result.k_eff, result.residual
            );
        }
        Ok(result)
    }

    /// Scale flux and boundary fluxes to a unit total fission source
    fn normalize(&mut self, iteration: usize) -> Result<(), NumericError> {
        let total: f64 = fission_rates_cpu(&self.materials, &self.flux, &self.volumes)
            .iter()
            .sum();
        if !(total > 0.0 && total.is_finite()) {
            return Err(NumericError::ZeroFissionSource { iteration });
        }
        let scale = 1.0 / total;
        self.flux.scale(scale);
        self.incoming.par_iter_mut().for_each(|v| *v *= scale);
        Ok(())
    }

    /// Copy every outgoing flux into the incoming slot of the linked track end
    fn route_boundary_fluxes(&mut self) {
        let n = values_per_direction(self.tracks, self.flux.num_groups);
        let outgoing = &self.outgoing;
        self.incoming
            .par_chunks_mut(n)
            .zip(self.sources.par_iter())
            .for_each(|(slot, source)| match source {
                Some(src) => slot.copy_from_slice(&outgoing[src * n..(src + 1) * n]),
                None => slot.fill(0.0),
            });
    }

    /// `φ = tally / (Σt V) + 4π R`
    fn update_flux(&mut self, tally: &[f64]) {
        let num_groups = self.flux.num_groups;
        self.flux
            .data
            .par_chunks_mut(num_groups)
            .zip(tally.par_chunks(num_groups))
            .zip(self.sigma_t.data.par_chunks(num_groups))
            .zip(self.reduced_source.data.par_chunks(num_groups))
            .zip(self.volumes.par_iter())
            .for_each(|((((phi, tally), sigma_t), source), &volume)| {
                for g in 0..num_groups {
                    let streaming = if volume > 0.0 {
                        tally[g] / (sigma_t[g] * volume)
                    } else {
                        0.0
                    };
                    phi[g] = streaming + FOUR_PI * source[g];
                }
            });
    }

    fn check_flux(&self, iteration: usize) -> Result<(), NumericError> {
        match self.flux.data.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(NumericError::NonFiniteFlux {
                fsr: FsrId::from_index(i / self.flux.num_groups),
                group: i % self.flux.num_groups,
                iteration,
            }),
            None => Ok(()),
        }
    }
}

impl TransportSolver for CpuSolver<'_> {
    fn compute_eigenvalue_with_guess(
        &mut self,
        max_iterations: usize,
        tolerance: f64,
        guess: InitialGuess,
    ) -> Result<EigenvalueResult, MocError> {
        if max_iterations == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "max_iterations",
                reason: "at least one iteration is required".to_string(),
            }
            .into());
        }
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "tolerance",
                reason: format!("{tolerance} must be positive"),
            }
            .into());
        }

        self.initialize(guess);
        let result = match self.pool.clone() {
            Some(pool) => pool.install(|| self.iterate(max_iterations, tolerance)),
            None => self.iterate(max_iterations, tolerance),
        };
        if let Err(e) = &result {
            warn!("Solve aborted: {e}");
            self.state = SolverState::Uninitialized;
        }
        result
    }

    fn state(&self) -> SolverState {
        self.state
    }

    fn k_eff(&self) -> f64 {
        self.k_eff
    }

    fn scalar_flux(&self, fsr: FsrId, group: usize) -> Option<f64> {
        (fsr.index() < self.flux.num_fsrs && group < self.flux.num_groups)
            .then(|| self.flux.get(fsr.index(), group))
    }

    fn read_flux(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self.flux.as_slice())
    }

    fn fsr_volumes(&self) -> &[f64] {
        &self.volumes
    }

    fn fission_rates(&self) -> Vec<f64> {
        fission_rates_cpu(&self.materials, &self.flux, &self.volumes)
    }

    fn leakage(&self) -> f64 {
        self.leakage
    }

    fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    fn timer(&self) -> &Timer {
        &self.timer
    }

    fn snapshot(&self) -> SolutionSnapshot {
        let rates = self.fission_rates();
        let centroids = self.tracks.fsr_centroids();
        let regions = self
            .geometry
            .fsrs()
            .iter()
            .enumerate()
            .map(|(i, info)| RegionSolution {
                fsr: FsrId::from_index(i),
                cell: info.cell,
                material: info.material,
                ring: info.ring,
                sector: info.sector,
                volume: self.volumes[i],
                centroid: [centroids[i].x, centroids[i].y],
                flux: self.flux.region(FsrId::from_index(i)).to_vec(),
                fission_rate: rates[i],
            })
            .collect();

        SolutionSnapshot {
            state: self.state,
            k_eff: self.k_eff,
            leakage: self.leakage,
            num_groups: self.flux.num_groups,
            regions,
            history: self.history.clone(),
            timings: self
                .timer
                .splits()
                .map(|(name, seconds)| (name.to_string(), seconds))
                .collect(),
        }
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.flux.num_fsrs, self.flux.num_groups)
    }
}

/// Reject materials whose total cross section cannot be divided by
fn check_total_cross_sections(geometry: &Geometry) -> Result<(), NumericError> {
    for (id, material) in geometry.materials().iter().enumerate() {
        let used = geometry
            .fsrs()
            .iter()
            .any(|info| info.material.index() == id);
        if !used {
            continue;
        }
        for g in 0..material.num_groups() {
            let value = material.sigma_t(g);
            if !(value > MIN_SIGMA_T) {
                return Err(NumericError::NonPositiveTotal {
                    material: MaterialId::from_index(id),
                    group: g,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Inverse of the boundary link table
///
/// Slot `track · 2 + direction` of the result names the outgoing slot whose flux
/// enters that track in that direction.
fn incoming_sources(tracks: &TrackSet) -> Vec<Option<usize>> {
    let mut sources = vec![None; tracks.num_tracks() * 2];
    for track in tracks.tracks() {
        for direction in Direction::BOTH {
            if let Some(link) = track.link(direction.exit()) {
                let target = link.track.index() * 2 + link.direction().index();
                sources[target] = Some(track.id().index() * 2 + direction.index());
            }
        }
    }
    sources
}

/// RMS relative change of the per-region fission source over fissile regions
///
/// `old` sums to one; `new` is normalized by `production` before comparing.
fn source_residual(old: &[f64], new: &[f64], production: f64) -> f64 {
    let (sum, count) = old
        .iter()
        .zip(new)
        .filter(|(o, _)| **o > 0.0)
        .fold((0.0, 0_usize), |(sum, count), (&o, &n)| {
            let change = (n / production - o) / o;
            (sum + change * change, count + 1)
        });
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}
