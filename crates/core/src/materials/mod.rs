//! Multi-group cross-section data
//!
//! A [`Material`] holds the macroscopic cross sections of one homogenized region for
//! `G` energy groups. Group indices are zero-based here; group 0 is the fastest group.
//!
//! The scattering matrix is stored row-major with the *source* group as row:
//! `sigma_s(g, g')` is the transfer cross section from group `g` into group `g'`.
//! This is the layout of the `scatter matrix` dataset in material data files.

mod library;

pub use library::MaterialLibrary;

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tolerance on the fission spectrum normalization
const CHI_TOLERANCE: f64 = 1e-6;

/// Raw per-group cross-section arrays, as found in a material data file
///
/// Field names follow the dataset names of the material data layout so a library can
/// be deserialized directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossSections {
    /// Total cross section Σt per group (1/cm)
    pub total: Vec<f64>,
    /// Scattering matrix Σs[g→g'] in row-major order (`G × G` entries)
    #[serde(rename = "scatter matrix", alias = "scatter")]
    pub scatter: Vec<f64>,
    /// Fission cross section Σf per group; empty means non-fissile
    #[serde(default)]
    pub fission: Vec<f64>,
    /// Production cross section νΣf per group
    #[serde(rename = "nu-fission", alias = "nu_fission")]
    pub nu_fission: Vec<f64>,
    /// Fission spectrum χ per group
    pub chi: Vec<f64>,
}

/// Validated multi-group material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NamedCrossSections", into = "NamedCrossSections")]
pub struct Material {
    name: String,
    num_groups: usize,
    sigma_t: Vec<f64>,
    sigma_s: Vec<f64>,
    sigma_f: Vec<f64>,
    nu_sigma_f: Vec<f64>,
    chi: Vec<f64>,
}

/// Serialized form of a [`Material`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedCrossSections {
    name: String,
    #[serde(flatten)]
    data: CrossSections,
}

impl TryFrom<NamedCrossSections> for Material {
    type Error = ConfigurationError;

    fn try_from(value: NamedCrossSections) -> Result<Self, Self::Error> {
        Material::new(value.name, value.data)
    }
}

impl From<Material> for NamedCrossSections {
    fn from(material: Material) -> Self {
        NamedCrossSections {
            data: material.cross_sections(),
            name: material.name,
        }
    }
}

impl Material {
    /// Build a material from raw cross-section arrays
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidMaterial`] if the arrays disagree on the
    /// number of groups, contain negative or non-finite values, or if the fission
    /// spectrum of a fissile material does not sum to one.
    ///
    /// A total cross section smaller than out-scatter plus fission is accepted with a
    /// warning; the solver assumes physically consistent data.
    pub fn new(name: impl Into<String>, xs: CrossSections) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let invalid = |reason: String| ConfigurationError::InvalidMaterial {
            name: name.clone(),
            reason,
        };

        let num_groups = xs.total.len();
        if num_groups == 0 {
            return Err(invalid("no energy groups".to_string()));
        }

        let sigma_f = if xs.fission.is_empty() {
            vec![0.0; num_groups]
        } else {
            xs.fission
        };

        for (label, values, expected) in [
            ("scatter matrix", &xs.scatter, num_groups * num_groups),
            ("fission", &sigma_f, num_groups),
            ("nu-fission", &xs.nu_fission, num_groups),
            ("chi", &xs.chi, num_groups),
        ] {
            if values.len() != expected {
                return Err(invalid(format!(
                    "{label} has {} entries, expected {expected}",
                    values.len()
                )));
            }
        }

        for (label, values) in [
            ("total", &xs.total),
            ("scatter matrix", &xs.scatter),
            ("fission", &sigma_f),
            ("nu-fission", &xs.nu_fission),
            ("chi", &xs.chi),
        ] {
            if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(invalid(format!("{label} contains {bad}")));
            }
        }

        let chi_sum: f64 = xs.chi.iter().sum();
        let fissile = xs.nu_fission.iter().any(|&v| v > 0.0);
        if fissile && (chi_sum - 1.0).abs() > CHI_TOLERANCE {
            return Err(invalid(format!("chi sums to {chi_sum}, expected 1")));
        }
        if !fissile && chi_sum.abs() > CHI_TOLERANCE && (chi_sum - 1.0).abs() > CHI_TOLERANCE {
            return Err(invalid(format!("chi sums to {chi_sum}, expected 0 or 1")));
        }

        let material = Self {
            name,
            num_groups,
            sigma_t: xs.total,
            sigma_s: xs.scatter,
            sigma_f,
            nu_sigma_f: xs.nu_fission,
            chi: xs.chi,
        };

        for g in 0..num_groups {
            let removal = material.scatter_out(g) + material.sigma_f[g];
            if material.sigma_t[g] + 1e-12 < removal {
                warn!(
                    "Material '{}' group {}: total {} is below out-scatter + fission {}",
                    material.name, g, material.sigma_t[g], removal
                );
            }
        }

        Ok(material)
    }

    /// One-group material from total, scattering and production cross sections
    ///
    /// Fissile when `nu_sigma_f > 0`, in which case χ = 1.
    pub fn one_group(
        name: impl Into<String>,
        sigma_t: f64,
        sigma_s: f64,
        nu_sigma_f: f64,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            name,
            CrossSections {
                total: vec![sigma_t],
                scatter: vec![sigma_s],
                fission: Vec::new(),
                nu_fission: vec![nu_sigma_f],
                chi: vec![if nu_sigma_f > 0.0 { 1.0 } else { 0.0 }],
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    #[inline]
    pub fn sigma_t(&self, group: usize) -> f64 {
        self.sigma_t[group]
    }

    /// Transfer cross section from `from` into `to`
    #[inline]
    pub fn sigma_s(&self, from: usize, to: usize) -> f64 {
        self.sigma_s[from * self.num_groups + to]
    }

    #[inline]
    pub fn sigma_f(&self, group: usize) -> f64 {
        self.sigma_f[group]
    }

    #[inline]
    pub fn nu_sigma_f(&self, group: usize) -> f64 {
        self.nu_sigma_f[group]
    }

    #[inline]
    pub fn chi(&self, group: usize) -> f64 {
        self.chi[group]
    }

    /// Total out-scatter from `group` into every group (including self-scatter)
    pub fn scatter_out(&self, group: usize) -> f64 {
        let row = group * self.num_groups;
        self.sigma_s[row..row + self.num_groups].iter().sum()
    }

    /// Absorption cross section Σa = Σt − Σs_out
    pub fn absorption(&self, group: usize) -> f64 {
        self.sigma_t[group] - self.scatter_out(group)
    }

    pub fn is_fissile(&self) -> bool {
        self.nu_sigma_f.iter().any(|&v| v > 0.0)
    }

    /// Infinite-medium multiplication factor
    ///
    /// Solves the `G`-group infinite-medium balance by power iteration on the
    /// material's own fission/scattering matrices. Returns `None` for non-fissile
    /// materials or when absorption vanishes.
    pub fn k_infinity(&self) -> Option<f64> {
        if !self.is_fissile() {
            return None;
        }
        let g_count = self.num_groups;
        let mut flux = vec![1.0; g_count];
        let mut k = 1.0;

        for _ in 0..500 {
            let fission: f64 = (0..g_count).map(|g| self.nu_sigma_f[g] * flux[g]).sum();
            if fission <= 0.0 {
                return None;
            }
            // Gauss-Seidel over groups: downscatter is picked up immediately.
            let mut next = flux.clone();
            for g in 0..g_count {
                let in_scatter: f64 = (0..g_count)
                    .filter(|&gp| gp != g)
                    .map(|gp| self.sigma_s(gp, g) * next[gp])
                    .sum();
                let removal = self.sigma_t[g] - self.sigma_s(g, g);
                if removal <= 0.0 {
                    return None;
                }
                next[g] = (self.chi[g] * fission / k + in_scatter) / removal;
            }
            let new_fission: f64 = (0..g_count).map(|g| self.nu_sigma_f[g] * next[g]).sum();
            let new_k = k * new_fission / fission;
            let done = (new_k - k).abs() < 1e-12;
            k = new_k;
            flux = next;
            if done {
                break;
            }
        }
        Some(k)
    }

    /// Copy of the raw arrays
    pub fn cross_sections(&self) -> CrossSections {
        CrossSections {
            total: self.sigma_t.clone(),
            scatter: self.sigma_s.clone(),
            fission: self.sigma_f.clone(),
            nu_fission: self.nu_sigma_f.clone(),
            chi: self.chi.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    pub(crate) fn two_group_fuel() -> Material {
        Material::new(
            "fuel",
            CrossSections {
                total: vec![2.0 / 9.0, 5.0 / 6.0],
                scatter: vec![71.0 / 360.0, 0.02, 0.0, 11.0 / 15.0],
                fission: vec![1.0 / 480.0, 1.0 / 16.0],
                nu_fission: vec![2.4 / 480.0, 2.4 / 16.0],
                chi: vec![1.0, 0.0],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_absorption_from_total_minus_scatter() {
        let fuel = two_group_fuel();
        assert_eq!(fuel.num_groups(), 2);
        assert_relative_eq!(fuel.absorption(0), 0.005, epsilon = 1e-12);
        assert_relative_eq!(fuel.absorption(1), 0.1, epsilon = 1e-12);
        assert_relative_eq!(fuel.sigma_s(0, 1), 0.02);
        assert_eq!(fuel.sigma_s(1, 0), 0.0);
    }

    #[test]
    fn test_k_infinity_one_group() {
        let medium = Material::one_group("medium", 0.452648699, 0.383259177, 0.0994076580).unwrap();
        let expected = 0.0994076580 / (0.452648699 - 0.383259177);
        assert_relative_eq!(medium.k_infinity().unwrap(), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_k_infinity_two_group() {
        // k = (νΣf1 + νΣf2 Σ12 / Σa2) / (Σa1 + Σ12)
        let fuel = two_group_fuel();
        let expected = (0.005 + 0.15 * 0.02 / 0.1) / (0.005 + 0.02);
        assert_relative_eq!(fuel.k_infinity().unwrap(), expected, max_relative = 1e-8);
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let err = Material::new(
            "broken",
            CrossSections {
                total: vec![1.0, 1.0],
                scatter: vec![0.5],
                fission: Vec::new(),
                nu_fission: vec![0.0, 0.0],
                chi: vec![0.0, 0.0],
            },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidMaterial { .. }));
        assert!(err.to_string().contains("scatter matrix"));
    }

    #[test]
    fn test_rejects_unnormalized_chi_for_fissile() {
        let err = Material::new(
            "fuel",
            CrossSections {
                total: vec![1.0, 1.0],
                scatter: vec![0.0; 4],
                fission: Vec::new(),
                nu_fission: vec![0.1, 0.1],
                chi: vec![0.5, 0.2],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("chi"));
    }

    #[test]
    fn test_non_fissile_allows_zero_chi() {
        let water = Material::one_group("water", 1.0, 0.9, 0.0).unwrap();
        assert!(!water.is_fissile());
        assert_eq!(water.k_infinity(), None);
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let fuel = two_group_fuel();
        let json = serde_json::to_string(&fuel).unwrap();
        assert!(json.contains("scatter matrix"));
        let back: Material = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fuel);

        let bad = r#"{"name":"x","total":[-1.0],"scatter matrix":[0.0],"nu-fission":[0.0],"chi":[0.0]}"#;
        assert!(serde_json::from_str::<Material>(bad).is_err());
    }
}
