//! Region sources and reaction rates (CPU implementation)
//!
//! All kernels run in parallel over flat source regions; each region only reads its
//! own flux and material, so no synchronization is needed.

use super::fields::FluxField;
use crate::materials::Material;
use rayon::prelude::*;
use std::f64::consts::PI;

pub(crate) const FOUR_PI: f64 = 4.0 * PI;

/// Update the reduced source `R = Q / (4π Σt)` of every region
///
/// `Q = χ/k · Σ νΣf φ + Σ Σs(g' → g) φ(g')`
///
/// # Arguments
///
/// * `materials` - Material of every region
/// * `flux` - Current scalar flux
/// * `k_eff` - Current eigenvalue estimate
/// * `reduced_source` - Output, same shape as `flux`
pub(crate) fn update_source_cpu(
    materials: &[&Material],
    flux: &FluxField,
    k_eff: f64,
    reduced_source: &mut FluxField,
) {
    let num_groups = flux.num_groups;
    let inverse_k = 1.0 / k_eff;
    reduced_source
        .data
        .par_chunks_mut(num_groups)
        .zip(flux.data.par_chunks(num_groups))
        .zip(materials.par_iter())
        .for_each(|((source, phi), material)| {
            let fission: f64 = phi
                .iter()
                .enumerate()
                .map(|(g, p)| material.nu_sigma_f(g) * p)
                .sum();
            for (g, r) in source.iter_mut().enumerate() {
                let scatter: f64 = phi
                    .iter()
                    .enumerate()
                    .map(|(from, p)| material.sigma_s(from, g) * p)
                    .sum();
                let q = material.chi(g) * fission * inverse_k + scatter;
                *r = q / (FOUR_PI * material.sigma_t(g));
            }
        });
}

/// Fission production `V · Σ νΣf φ` of every region
pub(crate) fn fission_rates_cpu(
    materials: &[&Material],
    flux: &FluxField,
    volumes: &[f64],
) -> Vec<f64> {
    reaction_rates(materials, flux, volumes, Material::nu_sigma_f)
}

/// Absorption `V · Σ Σa φ` summed over all regions
pub(crate) fn total_absorption_cpu(
    materials: &[&Material],
    flux: &FluxField,
    volumes: &[f64],
) -> f64 {
    reaction_rates(materials, flux, volumes, Material::absorption)
        .iter()
        .sum()
}

fn reaction_rates(
    materials: &[&Material],
    flux: &FluxField,
    volumes: &[f64],
    cross_section: fn(&Material, usize) -> f64,
) -> Vec<f64> {
    flux.data
        .par_chunks(flux.num_groups)
        .zip(materials.par_iter())
        .zip(volumes.par_iter())
        .map(|((phi, material), &volume)| {
            volume
                * phi
                    .iter()
                    .enumerate()
                    .map(|(g, p)| cross_section(material, g) * p)
                    .sum::<f64>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::CrossSections;
    use approx::assert_relative_eq;

    fn two_group() -> Material {
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
    fn test_one_group_infinite_medium_source() {
        let m = Material::one_group("m", 0.5, 0.3, 0.25).unwrap();
        let materials = vec![&m; 2];
        let flux = FluxField::with_value(2, 1, 2.0);
        let mut source = FluxField::new(2, 1);
        update_source_cpu(&materials, &flux, 1.25, &mut source);
        // Q = 0.25 · 2 / 1.25 + 0.3 · 2
        let q = 0.4 + 0.6;
        assert_relative_eq!(source.get(0, 0), q / (FOUR_PI * 0.5));
        assert_eq!(source.get(0, 0), source.get(1, 0));
    }

    #[test]
    fn test_two_group_source_uses_downscatter() {
        let fuel = two_group();
        let materials = vec![&fuel];
        let mut flux = FluxField::new(1, 2);
        flux.set(0, 0, 1.0);
        flux.set(0, 1, 0.5);
        let mut source = FluxField::new(1, 2);
        update_source_cpu(&materials, &flux, 1.0, &mut source);

        let fission = 2.4 / 480.0 + 0.5 * 2.4 / 16.0;
        let fast = fission + 71.0 / 360.0;
        let thermal = 0.02 + 0.5 * 11.0 / 15.0;
        assert_relative_eq!(source.get(0, 0), fast / (FOUR_PI * 2.0 / 9.0), epsilon = 1e-14);
        assert_relative_eq!(source.get(0, 1), thermal / (FOUR_PI * 5.0 / 6.0), epsilon = 1e-14);
    }

    #[test]
    fn test_rates_scale_with_volume() {
        let fuel = two_group();
        let materials = vec![&fuel, &fuel];
        let flux = FluxField::with_value(2, 2, 1.0);
        let rates = fission_rates_cpu(&materials, &flux, &[1.0, 3.0]);
        assert_relative_eq!(rates[1], 3.0 * rates[0]);
        let absorption = total_absorption_cpu(&materials, &flux, &[1.0, 3.0]);
        assert!(absorption > 0.0);
    }
}
