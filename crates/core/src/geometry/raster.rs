//! Regular-grid sampling of region maps for external plotting

use super::Geometry;
use crate::core_types::vec2::Vec2;
use crate::error::ConfigurationError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which id to record at each sample point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RasterKind {
    Fsr,
    Material,
    Cell,
}

/// Ids sampled at pixel centers over the domain bounding box
///
/// `values[j * nx + i]` holds pixel `(i, j)` with `j = 0` the bottom row; `None`
/// marks points that lie in no cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMap {
    pub kind: RasterKind,
    pub nx: usize,
    pub ny: usize,
    pub min: Vec2,
    pub max: Vec2,
    pub values: Vec<Option<u32>>,
}

impl RasterMap {
    pub fn get(&self, i: usize, j: usize) -> Option<u32> {
        self.values[j * self.nx + i]
    }

    /// Number of distinct ids present in the map
    pub fn distinct_values(&self) -> usize {
        let mut ids: Vec<u32> = self.values.iter().flatten().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

impl Geometry {
    /// Sample the geometry on an `nx × ny` grid
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::NotFinalized`] before finalize and
    /// [`ConfigurationError::InvalidOption`] for an empty grid.
    pub fn rasterize(
        &self,
        nx: usize,
        ny: usize,
        kind: RasterKind,
    ) -> Result<RasterMap, ConfigurationError> {
        let bounds = *self.bounds()?;
        if nx == 0 || ny == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "raster size",
                reason: format!("{nx} x {ny} has no pixels"),
            });
        }

        let dx = bounds.width() / nx as f64;
        let dy = bounds.height() / ny as f64;
        let mut values = vec![None; nx * ny];
        values.par_chunks_mut(nx).enumerate().for_each(|(j, row)| {
            let y = bounds.min.y + (j as f64 + 0.5) * dy;
            for (i, value) in row.iter_mut().enumerate() {
                let point = Vec2::new(bounds.min.x + (i as f64 + 0.5) * dx, y);
                *value = self.find_cell_containing(&point).map(|loc| match kind {
                    RasterKind::Fsr => loc.fsr().raw(),
                    RasterKind::Material => loc.material().raw(),
                    RasterKind::Cell => loc.cell().raw(),
                });
            }
        });

        Ok(RasterMap {
            kind,
            nx,
            ny,
            min: bounds.min,
            max: bounds.max,
            values,
        })
    }
}
