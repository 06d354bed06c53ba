//! Agreement between a VASP band structure and its Wannier90
//! interpolation along the same k-path.
pub mod kernel;

use std::fmt;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    error::{Result, W90Error},
    numerics::{CubicSpline, SavitzkyGolay},
    parser::band_dat::BandPath,
};
pub use kernel::Kernel;

/// Two consecutive k-points closer than this are the same point.
const DUPLICATE_K: f64 = 1e-7;
const SAVGOL_WINDOW: usize = 9;
const SAVGOL_ORDER: usize = 2;

/// Number of VASP bands lying below the first Wannier90 band, found by
/// sliding the Wannier90 energies at the first k-point over the VASP
/// ones and keeping the offset with the smallest absolute difference.
pub fn align_bands(vasp: &BandPath, w90: &BandPath) -> Result<usize> {
    let (nv, nw) = (vasp.nbands(), w90.nbands());
    if nw == 0 || nw > nv || vasp.nk() == 0 || w90.nk() == 0 {
        return Err(W90Error::BandCountMismatch {
            vasp: nv,
            wannier: nw,
        });
    }
    let ve = vasp.energies().column(0);
    let we = w90.energies().column(0);
    let distance = |offset: usize| -> f64 {
        ve.iter()
            .skip(offset)
            .zip(we.iter())
            .map(|(v, w)| (v - w).abs())
            .sum()
    };
    let (offset, _) = (0..=nv - nw)
        .map(|i| (i, distance(i)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
    info!("nbnds_excl: {offset}");
    Ok(offset)
}

/// Marks the points kept after dropping repeated k-points, which appear
/// at the joints of path segments. `keep_last` selects which member of a
/// repeated pair survives.
fn dedup_mask(kpath: &[f64], keep_last: bool) -> Vec<bool> {
    let distinct = kpath.windows(2).map(|w| !(w[1] - w[0] < DUPLICATE_K));
    if keep_last {
        distinct.chain(std::iter::once(true)).collect()
    } else {
        std::iter::once(true).chain(distinct).collect()
    }
}

fn masked<'a, I>(values: I, mask: &[bool]) -> Vec<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .zip(mask)
        .filter_map(|(v, &keep)| keep.then_some(*v))
        .collect()
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

/// Per-band scores of a Wannier90 band structure against VASP.
#[derive(Debug, Clone)]
pub struct BandQuality {
    offset: usize,
    k_ratio: f64,
    /// Largest kernel-weighted deviation of every Wannier90 band, in meV
    deviations: Vec<f64>,
    /// Largest kernel weight along every band
    weights: Vec<f64>,
}

impl BandQuality {
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Ratio of the VASP path length to the Wannier90 one, close to 2π
    /// when the two use different reciprocal units.
    pub fn k_ratio(&self) -> f64 {
        self.k_ratio
    }

    pub fn deviations(&self) -> &[f64] {
        self.deviations.as_ref()
    }

    pub fn weights(&self) -> &[f64] {
        self.weights.as_ref()
    }

    /// Weighted mean deviation in meV, `None` when no band falls inside
    /// the kernel.
    pub fn average(&self) -> Option<f64> {
        let total_weight: f64 = self.weights.iter().sum();
        (total_weight > 0.0).then(|| self.deviations.iter().sum::<f64>() / total_weight)
    }
}

impl fmt::Display for BandQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== MAX DIFF of VASP vs W90 with each bands (meV) ===")?;
        writeln!(f, "nbnds_excl: {}    k ratio: {:.6}", self.offset, self.k_ratio)?;
        writeln!(f, "{:>5}  {:>12}  {:>8}", "band", "dE (meV)", "weight")?;
        for (i, (de, w)) in self.deviations.iter().zip(self.weights.iter()).enumerate() {
            writeln!(f, "{:>5}  {:>12.4}  {:>8.4}", i + 1, de, w)?;
        }
        match self.average() {
            Some(avg) => writeln!(f, "Average dE (meV): {avg}"),
            None => writeln!(f, "Average dE (meV): no band inside the kernel"),
        }
    }
}

/**
Score every Wannier90 band against the VASP band it interpolates.

The Wannier90 band is resampled by a cubic spline at the VASP k-points
(rescaled by the ratio of path lengths), the difference to the VASP band
is smoothed with a Savitzky–Golay filter (window 9, order 2) to remove
spline ringing at segment joints, and the largest kernel-weighted
absolute deviation is kept.
# Errors:
  * `BandCountMismatch` when Wannier90 has more bands than VASP.
  * `InsufficientPoints` when a path is too short for the spline or filter.
*/
pub fn evaluate(vasp: &BandPath, w90: &BandPath, kernel: &Kernel) -> Result<BandQuality> {
    let offset = align_bands(vasp, w90)?;
    let vmax = max_of(vasp.kpath().iter().copied());
    let wmax = max_of(w90.kpath().iter().copied());
    if !(wmax > 0.0) {
        return Err(W90Error::DegenerateRange(w90.kpath()[0], wmax));
    }
    let k_ratio = vmax / wmax;
    debug!("VASP/W90 k ratio: {k_ratio}");

    let vmask = dedup_mask(vasp.kpath(), false);
    let wmask = dedup_mask(w90.kpath(), true);
    let wk = masked(w90.kpath(), &wmask);
    let sample_at: Vec<f64> = masked(vasp.kpath(), &vmask)
        .into_iter()
        .map(|k| k / k_ratio)
        .collect();
    let filter = SavitzkyGolay::new(SAVGOL_WINDOW, SAVGOL_ORDER)?;

    let band_score = |i: usize| -> Result<(f64, f64)> {
        let spline = CubicSpline::new(&wk, &masked(w90.energies().row(i), &wmask))?;
        let fitted = spline.eval_many(&sample_at);
        let v_band = masked(vasp.energies().row(i + offset), &vmask);
        let delta: Vec<f64> = fitted.iter().zip(&v_band).map(|(w, v)| w - v).collect();
        let smoothed = filter.apply(&delta)?;
        let deviation = max_of(
            v_band
                .iter()
                .zip(smoothed.iter())
                .map(|(&e, d)| kernel.weight(e) * d.abs()),
        ) * 1000.0;
        let weight = max_of(v_band.iter().map(|&e| kernel.weight(e)));
        Ok((deviation, weight))
    };
    let scores: Vec<(f64, f64)> = (0..w90.nbands())
        .into_par_iter()
        .map(band_score)
        .collect::<Result<Vec<_>>>()?;
    let (deviations, weights) = scores.into_iter().unzip();
    let quality = BandQuality {
        offset,
        k_ratio,
        deviations,
        weights,
    };
    if let Some(avg) = quality.average() {
        info!("Average dE (meV): {avg}");
    }
    Ok(quality)
}

#[cfg(test)]
pub(crate) mod test {
    use ndarray::Array2;

    use super::*;

    fn band(n: usize, k: f64) -> f64 {
        match n {
            0 => -10.0,
            1 => k * k,
            _ => 3.0 + (2.0 * k).sin(),
        }
    }

    /// Three VASP bands on a 21-point path twice as long as the Wannier90
    /// one, which interpolates the upper two.
    pub(crate) fn paths(shift: f64) -> (BandPath, BandPath) {
        let wk: Vec<f64> = (0..21).map(|i| i as f64 / 20.0).collect();
        let vk: Vec<f64> = wk.iter().map(|k| 2.0 * k).collect();
        let vee = Array2::from_shape_fn((3, 21), |(n, j)| band(n, wk[j]));
        let wee = Array2::from_shape_fn((2, 21), |(n, j)| {
            band(n + 1, wk[j]) + if n == 0 { shift } else { 0.0 }
        });
        (
            BandPath::new(vk, vee).unwrap(),
            BandPath::new(wk, wee).unwrap(),
        )
    }

    #[test]
    fn test_align_bands() {
        let (vasp, w90) = paths(0.0);
        assert_eq!(align_bands(&vasp, &w90).unwrap(), 1);
        assert!(matches!(
            align_bands(&w90, &vasp),
            Err(W90Error::BandCountMismatch { vasp: 2, wannier: 3 })
        ));
    }

    #[test]
    fn test_dedup_mask() {
        let k = [0.0, 0.5, 0.5, 1.0];
        assert_eq!(dedup_mask(&k, false), vec![true, true, false, true]);
        assert_eq!(dedup_mask(&k, true), vec![true, false, true, true]);
    }

    #[test]
    fn test_evaluate_identical() {
        let (vasp, w90) = paths(0.0);
        let quality = evaluate(&vasp, &w90, &Kernel::default()).unwrap();
        assert_eq!(quality.offset(), 1);
        assert!((quality.k_ratio() - 2.0).abs() < 1e-12);
        assert_eq!(quality.weights(), &[1.0, 1.0]);
        assert!(quality.deviations().iter().all(|d| d.abs() < 1e-6));
        assert!(quality.average().unwrap() < 1e-6);
    }

    #[test]
    fn test_evaluate_shifted_band() {
        let (vasp, w90) = paths(0.01);
        let quality = evaluate(&vasp, &w90, &Kernel::default()).unwrap();
        assert!((quality.deviations()[0] - 10.0).abs() < 1e-6);
        assert!(quality.deviations()[1].abs() < 1e-6);
        assert!((quality.average().unwrap() - 5.0).abs() < 1e-6);
        assert!(quality.to_string().contains("Average dE (meV): "));
    }

    #[test]
    fn test_evaluate_outside_kernel() {
        let (vasp, w90) = paths(0.0);
        let kernel = Kernel::Unit {
            mid: 100.0,
            width: 1.0,
        };
        let quality = evaluate(&vasp, &w90, &kernel).unwrap();
        assert_eq!(quality.weights(), &[0.0, 0.0]);
        assert!(quality.average().is_none());
    }

    #[test]
    fn test_evaluate_with_repeated_kpoints() {
        // a segment joint repeats k = 0.5 in both paths
        let mut wk: Vec<f64> = (0..=10).map(|i| i as f64 / 20.0).collect();
        wk.extend((10..=20).map(|i| i as f64 / 20.0));
        let vk: Vec<f64> = wk.iter().map(|k| 2.0 * k).collect();
        let vee = Array2::from_shape_fn((3, wk.len()), |(n, j)| band(n, wk[j]));
        let wee = Array2::from_shape_fn((2, wk.len()), |(n, j)| band(n + 1, wk[j]));
        let vasp = BandPath::new(vk, vee).unwrap();
        let w90 = BandPath::new(wk, wee).unwrap();
        let quality = evaluate(&vasp, &w90, &Kernel::default()).unwrap();
        assert!(quality.deviations().iter().all(|d| d.abs() < 1e-6));
    }
}
