use std::path::Path;

use ndarray::{Array2, Array3, ArrayView2, Axis};
use ndarray_stats::QuantileExt;
use tracing::debug;

use super::general::{finish, float_line, float_row};
use crate::error::{read_text, Result, W90Error};

/// Band energies read from VASP `EIGENVAL` or Wannier90 `<seed>.eig`.
#[derive(Debug, Clone)]
pub struct BandEnergies {
    nspin: usize,
    nkpts: usize,
    nbands: usize,
    /// Only known for `EIGENVAL`
    nelect: Option<f64>,
    /// Fractional k-point coordinates, shape (nkpts, 3). Only known for `EIGENVAL`
    kpoints: Option<Array2<f64>>,
    kpoint_weights: Option<Vec<f64>>,
    /// dimension = (nspin, nkpts, nbands)
    energies: Array3<f64>,
}

impl BandEnergies {
    pub fn new(
        nelect: Option<f64>,
        kpoints: Option<Array2<f64>>,
        kpoint_weights: Option<Vec<f64>>,
        energies: Array3<f64>,
    ) -> Self {
        let (nspin, nkpts, nbands) = energies.dim();
        Self {
            nspin,
            nkpts,
            nbands,
            nelect,
            kpoints,
            kpoint_weights,
            energies,
        }
    }

    /// Read `path`, treating files named `*.eig` as Wannier90 eigenvalues
    /// and anything else as `EIGENVAL`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = read_text(path)?;
        debug!("Reading band energies from {}", path.display());
        if path.extension().is_some_and(|ext| ext == "eig") {
            parse_w90_eig(&text)
        } else {
            parse_eigenval(&text)
        }
    }

    pub fn nspin(&self) -> usize {
        self.nspin
    }

    pub fn nkpts(&self) -> usize {
        self.nkpts
    }

    pub fn nbands(&self) -> usize {
        self.nbands
    }

    pub fn nelect(&self) -> Option<f64> {
        self.nelect
    }

    pub fn kpoints(&self) -> Option<&Array2<f64>> {
        self.kpoints.as_ref()
    }

    pub fn kpoint_weights(&self) -> Option<&[f64]> {
        self.kpoint_weights.as_deref()
    }

    pub fn energies(&self) -> &Array3<f64> {
        &self.energies
    }

    /// Energies of one spin channel, shape (nkpts, nbands).
    pub fn energies_at_spin(&self, spin: usize) -> Option<ArrayView2<'_, f64>> {
        (spin < self.nspin).then(|| self.energies.index_axis(Axis(0), spin))
    }

    pub fn emin(&self) -> Result<f64> {
        Ok(*self.energies.min()?)
    }

    pub fn emax(&self) -> Result<f64> {
        Ok(*self.energies.max()?)
    }

    /// Minimum and maximum of every band over all k-points for `spin`.
    pub fn band_extrema(&self, spin: usize) -> Option<(Vec<f64>, Vec<f64>)> {
        let view = self.energies_at_spin(spin)?;
        let mins = view
            .axis_iter(Axis(1))
            .map(|band| band.fold(f64::INFINITY, |acc, &e| acc.min(e)))
            .collect();
        let maxs = view
            .axis_iter(Axis(1))
            .map(|band| band.fold(f64::NEG_INFINITY, |acc, &e| acc.max(e)))
            .collect();
        Some((mins, maxs))
    }
}

/// Parse VASP `EIGENVAL`.
///
/// Blank lines carry no information and are dropped first. The first
/// line ends with ISPIN, the sixth holds `NELECT NKPTS NBANDS`. Every
/// k-point block is a `kx ky kz weight` line followed by one line per
/// band: `index e_up [e_down] occ_up [occ_down]`.
pub fn parse_eigenval(text: &str) -> Result<BandEnergies> {
    const FORMAT: &str = "EIGENVAL";
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 6 {
        return Err(W90Error::InsufficientPoints {
            context: "EIGENVAL header",
            needed: 6,
            actual: lines.len(),
        });
    }
    let nspin = lines[0]
        .split_whitespace()
        .last()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n == 1 || *n == 2)
        .ok_or_else(|| W90Error::parse(FORMAT, format!("bad ISPIN line `{}`", lines[0])))?;
    let counts = float_line(FORMAT, lines[5])?;
    if counts.len() != 3 {
        return Err(W90Error::parse(
            FORMAT,
            format!("expected `NELECT NKPTS NBANDS`, got `{}`", lines[5]),
        ));
    }
    let (nelect, nkpts, nbands) = (counts[0], counts[1] as usize, counts[2] as usize);

    let body = &lines[6..];
    let (block, needed) = nbands
        .checked_add(1)
        .and_then(|block| Some((block, nkpts.checked_mul(block)?)))
        .ok_or_else(|| {
            W90Error::parse(FORMAT, format!("NKPTS and NBANDS out of range in `{}`", lines[5]))
        })?;
    if body.len() < needed {
        return Err(W90Error::InsufficientPoints {
            context: "EIGENVAL k-point blocks",
            needed,
            actual: body.len(),
        });
    }
    let mut kpoints = Array2::<f64>::zeros((nkpts, 3));
    let mut weights = Vec::with_capacity(nkpts);
    let mut energies = Array3::<f64>::zeros((nspin, nkpts, nbands));
    for (ik, chunk) in body.chunks(block).take(nkpts).enumerate() {
        let (_, header) = finish(FORMAT, float_row(chunk[0]))?;
        if header.len() < 4 {
            return Err(W90Error::parse(
                FORMAT,
                format!("bad k-point line `{}`", chunk[0]),
            ));
        }
        kpoints.row_mut(ik).assign(&ndarray::arr1(&header[..3]));
        weights.push(header[header.len() - 1]);
        for (ib, line) in chunk[1..].iter().enumerate() {
            let (_, row) = finish(FORMAT, float_row(line))?;
            if row.len() < 1 + nspin {
                return Err(W90Error::parse(FORMAT, format!("bad band line `{line}`")));
            }
            for spin in 0..nspin {
                energies[[spin, ik, ib]] = row[1 + spin];
            }
        }
    }
    Ok(BandEnergies::new(
        Some(nelect),
        Some(kpoints),
        Some(weights),
        energies,
    ))
}

/// Parse Wannier90 `<seed>.eig`: one `band kpoint energy` triple per line,
/// bands running fastest.
pub fn parse_w90_eig(text: &str) -> Result<BandEnergies> {
    const FORMAT: &str = "wannier90 .eig";
    let mut rows = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let row = float_line(FORMAT, line)?;
        if row.len() != 3 {
            return Err(W90Error::parse(FORMAT, format!("bad line `{line}`")));
        }
        rows.push(row);
    }
    let nbands = rows.iter().map(|r| r[0] as usize).max().unwrap_or(0);
    let nkpts = rows.iter().map(|r| r[1] as usize).max().unwrap_or(0);
    if nbands * nkpts != rows.len() || rows.is_empty() {
        return Err(W90Error::LengthMismatch {
            context: "wannier90 .eig rows",
            left: nbands * nkpts,
            right: rows.len(),
        });
    }
    let flat: Vec<f64> = rows.iter().map(|r| r[2]).collect();
    let energies = Array3::from_shape_vec((1, nkpts, nbands), flat)
        .map_err(|e| W90Error::parse(FORMAT, e.to_string()))?;
    Ok(BandEnergies::new(None, None, None, energies))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub(crate) const EIGENVAL_SPIN1: &str = "    2    2    1    1
  0.1000000E+02  0.3800000E-09  0.3800000E-09  0.3800000E-09  0.5000000E-15
  1.000000000000000E-004
  CAR
 Si

     8     3     4

  0.0000000E+00  0.0000000E+00  0.0000000E+00  0.3333333E+00
    1       -5.800000   1.000000
    2        6.200000   1.000000
    3        6.300000   0.000000
    4        8.500000   0.000000

  0.2500000E+00  0.0000000E+00  0.0000000E+00  0.3333333E+00
    1       -4.900000   1.000000
    2        5.100000   1.000000
    3        6.900000   0.000000
    4        9.000000   0.000000

  0.5000000E+00  0.0000000E+00  0.0000000E+00  0.3333334E+00
    1       -3.500000   1.000000
    2        4.000000   1.000000
    3        7.400000   0.000000
    4       10.000000   0.000000
";

    #[test]
    fn test_parse_eigenval() {
        let bands = parse_eigenval(EIGENVAL_SPIN1).unwrap();
        assert_eq!(bands.nspin(), 1);
        assert_eq!(bands.nkpts(), 3);
        assert_eq!(bands.nbands(), 4);
        assert_eq!(bands.nelect(), Some(8.0));
        assert_eq!(bands.energies()[[0, 1, 2]], 6.9);
        assert_eq!(bands.kpoints().unwrap()[[2, 0]], 0.5);
        assert!((bands.kpoint_weights().unwrap()[0] - 0.3333333).abs() < 1e-12);
        let (mins, maxs) = bands.band_extrema(0).unwrap();
        assert_eq!(mins, vec![-5.8, 4.0, 6.3, 8.5]);
        assert_eq!(maxs, vec![-3.5, 6.2, 7.4, 10.0]);
        assert_eq!(bands.emin().unwrap(), -5.8);
        assert_eq!(bands.emax().unwrap(), 10.0);
    }

    #[test]
    fn test_parse_eigenval_spin_polarised() {
        let text = "    2    2    1    2
 header
 header
 CAR
 Fe
     8     1     2

  0.0  0.0  0.0  1.0
    1   -1.0   -0.5   1.0   1.0
    2    2.0    2.5   0.0   0.0
";
        let bands = parse_eigenval(text).unwrap();
        assert_eq!(bands.nspin(), 2);
        assert_eq!(bands.energies()[[1, 0, 0]], -0.5);
        assert_eq!(bands.energies()[[0, 0, 1]], 2.0);
        assert!(bands.energies_at_spin(2).is_none());
    }

    #[test]
    fn test_parse_eigenval_truncated() {
        let truncated: String = EIGENVAL_SPIN1.lines().take(12).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            parse_eigenval(&truncated),
            Err(W90Error::InsufficientPoints { .. })
        ));
    }

    #[test]
    fn test_parse_eigenval_huge_counts() {
        for counts in ["8 1e30 4", "8 3 1e30"] {
            let text = EIGENVAL_SPIN1.replacen("     8     3     4", counts, 1);
            assert!(matches!(parse_eigenval(&text), Err(W90Error::Parse { .. })));
        }
    }

    #[test]
    fn test_parse_w90_eig() {
        let text = "    1    1   -5.80000000
    2    1    6.20000000
    1    2   -4.90000000
    2    2    5.10000000
";
        let bands = parse_w90_eig(text).unwrap();
        assert_eq!(bands.nspin(), 1);
        assert_eq!(bands.nkpts(), 2);
        assert_eq!(bands.nbands(), 2);
        assert_eq!(bands.energies()[[0, 1, 0]], -4.9);
        assert!(bands.nelect().is_none());
    }
}
