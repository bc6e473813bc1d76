//! Serializable view of a solution for reporting tools

use super::state::{IterationRecord, SolverState};
use crate::core_types::ids::{CellId, FsrId, MaterialId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

/// Solution data of one flat source region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSolution {
    pub fsr: FsrId,
    pub cell: CellId,
    pub material: MaterialId,
    pub ring: usize,
    pub sector: usize,
    pub volume: f64,
    pub centroid: [f64; 2],
    /// Scalar flux per group
    pub flux: Vec<f64>,
    pub fission_rate: f64,
}

/// Copy of a solver's state at one point in time
///
/// Snapshots never refer back to the solver, so they can be written out or sent to
/// another thread while the solver keeps iterating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    pub state: SolverState,
    pub k_eff: f64,
    pub leakage: f64,
    pub num_groups: usize,
    pub regions: Vec<RegionSolution>,
    pub history: Vec<IterationRecord>,
    /// Time splits in seconds
    pub timings: Vec<(String, f64)>,
}

impl SolutionSnapshot {
    pub fn num_fsrs(&self) -> usize {
        self.regions.len()
    }

    /// Total fission rate over all regions
    pub fn total_fission_rate(&self) -> f64 {
        self.regions.iter().map(|r| r.fission_rate).sum()
    }

    /// Volume-weighted flux per group over the whole domain
    pub fn group_flux(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.num_groups];
        for region in &self.regions {
            for (t, phi) in total.iter_mut().zip(&region.flux) {
                *t += region.volume * phi;
            }
        }
        total
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn write_json(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
