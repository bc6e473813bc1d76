//! Per-region, per-group field storage
//!
//! Scalar flux, sources and tallies are stored as flat `Vec<f64>` arrays indexed
//! `fsr * num_groups + group`, so a region's groups are contiguous and parallel
//! loops can hand out one region per chunk.

use crate::core_types::ids::FsrId;

/// Field data over FSRs and energy groups
#[derive(Debug, Clone, PartialEq)]
pub struct FluxField {
    /// Values in region-major order (`fsr * num_groups + group`)
    pub data: Vec<f64>,
    /// Number of flat source regions
    pub num_fsrs: usize,
    /// Number of energy groups
    pub num_groups: usize,
}

impl FluxField {
    /// Create a field initialized to zero
    ///
    /// # Arguments
    ///
    /// * `num_fsrs` - Number of flat source regions
    /// * `num_groups` - Number of energy groups
    #[must_use]
    pub fn new(num_fsrs: usize, num_groups: usize) -> Self {
        Self::with_value(num_fsrs, num_groups, 0.0)
    }

    /// Create a field with every entry set to `value`
    #[must_use]
    pub fn with_value(num_fsrs: usize, num_groups: usize, value: f64) -> Self {
        Self {
            data: vec![value; num_fsrs * num_groups],
            num_fsrs,
            num_groups,
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Value for region `fsr` in `group`
    ///
    /// # Panics
    ///
    /// Panics if the region or group is out of range
    #[inline]
    #[must_use]
    pub fn get(&self, fsr: usize, group: usize) -> f64 {
        assert!(
            fsr < self.num_fsrs && group < self.num_groups,
            "Region or group out of bounds"
        );
        self.data[fsr * self.num_groups + group]
    }

    #[inline]
    pub fn set(&mut self, fsr: usize, group: usize, value: f64) {
        assert!(
            fsr < self.num_fsrs && group < self.num_groups,
            "Region or group out of bounds"
        );
        self.data[fsr * self.num_groups + group] = value;
    }

    /// All groups of one region
    #[inline]
    pub fn region(&self, fsr: FsrId) -> &[f64] {
        let start = fsr.index() * self.num_groups;
        &self.data[start..start + self.num_groups]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Multiply every entry by `factor`
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = FluxField::new(10, 2);
        assert_eq!(field.num_fsrs, 10);
        assert_eq!(field.num_groups, 2);
        assert_eq!(field.data.len(), 20);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_field_get_set_is_region_major() {
        let mut field = FluxField::new(4, 3);
        field.set(2, 1, 7.5);
        assert_eq!(field.get(2, 1), 7.5);
        assert_eq!(field.data[2 * 3 + 1], 7.5);
        assert_eq!(field.region(FsrId::new(2)), &[0.0, 7.5, 0.0]);
    }

    #[test]
    fn test_field_fill_and_scale() {
        let mut field = FluxField::with_value(3, 1, 2.0);
        field.scale(0.25);
        assert!(field.data.iter().all(|&v| v == 0.5));
        field.fill(1.0);
        assert!(field.data.iter().all(|&v| v == 1.0));
    }

    #[test]
    #[should_panic(expected = "Region or group out of bounds")]
    fn test_field_bounds_check() {
        let field = FluxField::new(2, 2);
        let _ = field.get(0, 2);
    }
}
