use std::{fmt::Write, path::Path};

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array2, Axis};
use tracing::debug;

use super::{eigenval::BandEnergies, general::float_line};
use crate::error::{read_text, Result, W90Error};

/// A band structure along a k-path, as written by p4vasp (`bnd.dat`) or
/// by Wannier90 (`<seed>_band.dat`).
#[derive(Debug, Clone)]
pub struct BandPath {
    /// Cumulative path length, length = nk
    kpath: Vec<f64>,
    /// dimension = (nbands, nk)
    energies: Array2<f64>,
}

impl BandPath {
    pub fn new(kpath: Vec<f64>, energies: Array2<f64>) -> Result<Self> {
        if kpath.len() != energies.ncols() {
            return Err(W90Error::LengthMismatch {
                context: "band path k-points",
                left: kpath.len(),
                right: energies.ncols(),
            });
        }
        Ok(Self { kpath, energies })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(&path)?;
        debug!("Reading band path from {}", path.as_ref().display());
        parse_band_dat(&text)
    }

    /// Build a band path from one spin channel of line-mode band energies,
    /// with `distances` from [`kpath_distances`].
    pub fn from_band_energies(bands: &BandEnergies, spin: usize, distances: Vec<f64>) -> Result<Self> {
        let view = bands
            .energies_at_spin(spin)
            .ok_or(W90Error::LengthMismatch {
                context: "spin channel",
                left: spin + 1,
                right: bands.nspin(),
            })?;
        Self::new(distances, view.t().to_owned())
    }

    pub fn kpath(&self) -> &[f64] {
        self.kpath.as_ref()
    }

    pub fn energies(&self) -> &Array2<f64> {
        &self.energies
    }

    pub fn nbands(&self) -> usize {
        self.energies.nrows()
    }

    pub fn nk(&self) -> usize {
        self.kpath.len()
    }

    /// p4vasp-style text: one `k E` row per point, bands separated by a
    /// blank line.
    pub fn to_dat_string(&self) -> String {
        let mut out = String::new();
        for band in self.energies.axis_iter(Axis(0)) {
            for (k, e) in self.kpath.iter().zip(band.iter()) {
                let _ = writeln!(out, "{k:12.6} {e:12.6}");
            }
            out.push('\n');
        }
        out
    }
}

/// Parse two-column band data. Comment lines start with `#`. Each band
/// restarts the k-path at its minimum, so the number of points per band is
/// the distance between the first two rows holding the minimum k.
pub fn parse_band_dat(text: &str) -> Result<BandPath> {
    const FORMAT: &str = "band dat";
    let mut kk = Vec::new();
    let mut ee = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = float_line(FORMAT, line)?;
        if row.len() < 2 {
            return Err(W90Error::parse(FORMAT, format!("expected `k E`, got `{line}`")));
        }
        kk.push(row[0]);
        ee.push(row[1]);
    }
    if kk.is_empty() {
        return Err(W90Error::InsufficientPoints {
            context: "band dat",
            needed: 1,
            actual: 0,
        });
    }
    let kmin = kk.iter().copied().fold(f64::INFINITY, f64::min);
    let mut starts = kk
        .iter()
        .enumerate()
        .filter(|(_, &k)| k == kmin)
        .map(|(i, _)| i);
    let nk = match (starts.next(), starts.next()) {
        (Some(first), Some(second)) => second - first,
        _ => kk.len(),
    };
    if nk == 0 || ee.len() % nk != 0 {
        return Err(W90Error::LengthMismatch {
            context: "band dat rows per band",
            left: ee.len(),
            right: nk,
        });
    }
    kk.truncate(nk);
    let energies = Array2::from_shape_vec((ee.len() / nk, nk), ee)
        .map_err(|e| W90Error::parse(FORMAT, e.to_string()))?;
    BandPath::new(kk, energies)
}

/// Cumulative Cartesian length of a line-mode k-path.
///
/// `kpoints` are fractional coordinates, `reciprocal` has the reciprocal
/// lattice vectors as rows. Every `points_per_segment` points a new segment
/// starts, and the jump to its first point does not add to the length.
pub fn kpath_distances(
    kpoints: &Array2<f64>,
    reciprocal: &Matrix3<f64>,
    points_per_segment: usize,
) -> Vec<f64> {
    let cart: Vec<Vector3<f64>> = kpoints
        .axis_iter(Axis(0))
        .map(|k| reciprocal.transpose() * Vector3::new(k[0], k[1], k[2]))
        .collect();
    let mut distances = Vec::with_capacity(cart.len());
    let mut total = 0.0;
    for (i, k) in cart.iter().enumerate() {
        let new_segment = points_per_segment > 0 && i % points_per_segment == 0;
        if i > 0 && !new_segment {
            total += (k - cart[i - 1]).norm();
        }
        distances.push(total);
    }
    distances
}
