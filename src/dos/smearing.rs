/// Total DOS built from band energies by Gaussian smearing
use std::f64::consts::PI;

use itertools_num::linspace;
use ndarray::Axis;
use rayon::prelude::*;
use tracing::debug;

use super::TotalDos;
use crate::{
    error::{Result, W90Error},
    parser::eigenval::BandEnergies,
    util::ElementWiseAddAssign,
};

pub const SMEARING_WIDTH: f64 = 0.05;

/**
Uniform energy grid from `e_min` to `e_max` (both included).
*/
pub fn compute_energy_range(e_min: f64, e_max: f64, num_points: usize) -> Result<Vec<f64>> {
    if !(e_max > e_min) || num_points < 2 {
        return Err(W90Error::DegenerateRange(e_min, e_max));
    }
    Ok(linspace::<f64>(e_min, e_max, num_points).collect())
}

/**
Normalised Gaussian of standard deviation `width`
g(x) = 1 / (σ*sqrt(2PI)) * exp(-1/2 * (e - de)^2/σ^2)
*/
fn gaussian_smearing(e: f64, de: f64, width: f64) -> f64 {
    (-((e - de) / width).powi(2) / 2.0).exp() / ((2.0 * PI).sqrt() * width)
}

/**
Compute the total Density of States (DOS) of every spin channel.
# Arguments:
  * `bands`: eigenvalues read from `EIGENVAL` or `<seed>.eig`.
  * `efermi`: subtracted from every eigenvalue.
  * `energy_range`: grid relative to the Fermi level.
  * `width`: Gaussian standard deviation in eV.
# Notes:
  * k-points without weights (`.eig`) count equally, so each band
    integrates to one in both cases.
*/
pub fn total_dos(
    bands: &BandEnergies,
    efermi: f64,
    energy_range: &[f64],
    width: f64,
) -> Result<TotalDos> {
    if !(width > 0.0) {
        return Err(W90Error::DegenerateRange(0.0, width));
    }
    let uniform = vec![1.0 / bands.nkpts().max(1) as f64; bands.nkpts()];
    let weights = bands.kpoint_weights().unwrap_or(uniform.as_slice());
    let weight_sum: f64 = weights.iter().sum();
    let channels = bands
        .energies()
        .axis_iter(Axis(0))
        .map(|spin| -> Result<Vec<f64>> {
            let per_kpoint: Vec<Vec<f64>> = spin
                .axis_iter(Axis(0))
                .into_par_iter()
                .zip(weights.par_iter())
                .map(|(eigen, &w)| {
                    energy_range
                        .iter()
                        .map(|&e| {
                            eigen
                                .iter()
                                .map(|de| gaussian_smearing(e, de - efermi, width))
                                .sum::<f64>()
                                * w
                                / weight_sum
                        })
                        .collect()
                })
                .collect();
            let mut dos = vec![0.0; energy_range.len()];
            for contribution in &per_kpoint {
                dos.add_assign(contribution.as_slice())?;
            }
            Ok(dos)
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "Smeared {} bands x {} k-points over {} energies",
        bands.nbands(),
        bands.nkpts(),
        energy_range.len()
    );
    let mut channels = channels.into_iter();
    let spin_up = channels.next().unwrap_or_else(|| vec![0.0; energy_range.len()]);
    Ok(TotalDos::new(energy_range.to_vec(), spin_up, channels.next()))
}
