//! Energy windows for Wannier90 disentanglement, derived from the energy
//! range every band covers over the Brillouin zone.
pub mod dis_table;
pub mod report;

use std::fmt;

use tracing::debug;

use crate::{
    error::{Result, W90Error},
    parser::eigenval::BandEnergies,
};

/// Default margin kept between a frozen-window edge and the band it
/// excludes, in eV.
pub const FROZ_EPS: f64 = 4e-3;

/// Per-band energy extents of one spin channel. Bands are sorted by
/// energy at every k-point, so both `eband_min` and `eband_max` are
/// non-decreasing.
#[derive(Debug, Clone)]
pub struct EnergyWindows {
    eband_min: Vec<f64>,
    eband_max: Vec<f64>,
    emin: f64,
    emax: f64,
}

impl EnergyWindows {
    pub fn new(eband_min: Vec<f64>, eband_max: Vec<f64>) -> Result<Self> {
        if eband_min.len() != eband_max.len() {
            return Err(W90Error::LengthMismatch {
                context: "band minima and maxima",
                left: eband_min.len(),
                right: eband_max.len(),
            });
        }
        if eband_min.is_empty() {
            return Err(W90Error::InsufficientPoints {
                context: "energy windows",
                needed: 1,
                actual: 0,
            });
        }
        let emin = eband_min.iter().copied().fold(f64::INFINITY, f64::min);
        let emax = eband_max.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            eband_min,
            eband_max,
            emin,
            emax,
        })
    }

    /// Windows of the first spin channel.
    pub fn from_bands(bands: &BandEnergies) -> Result<Self> {
        let (mins, maxs) = bands.band_extrema(0).ok_or(W90Error::InsufficientPoints {
            context: "spin channels",
            needed: 1,
            actual: 0,
        })?;
        debug!(
            "{} bands over {} k-points",
            bands.nbands(),
            bands.nkpts()
        );
        Self::new(mins, maxs)
    }

    pub fn eband_min(&self) -> &[f64] {
        self.eband_min.as_ref()
    }

    pub fn eband_max(&self) -> &[f64] {
        self.eband_max.as_ref()
    }

    pub fn emin(&self) -> f64 {
        self.emin
    }

    pub fn emax(&self) -> f64 {
        self.emax
    }

    pub fn nbands(&self) -> usize {
        self.eband_min.len()
    }

    /// Number of bands that have states inside `[emin, emax]`.
    pub fn count_states(&self, emin: f64, emax: f64) -> usize {
        self.eband_min
            .iter()
            .zip(self.eband_max.iter())
            .filter(|(&lo, &hi)| lo <= emax && hi >= emin)
            .count()
    }

    /// Lowest `dis_froz_min` such that `[dis_froz_min, emax]` holds no more
    /// than `nwann` bands: just above the top of the band below the
    /// `nwann` highest bands reaching down to `emax`.
    pub fn suggest_froz_min(&self, emax: f64, nwann: usize, eps: f64) -> f64 {
        let first_above = self
            .eband_min
            .iter()
            .position(|&lo| lo > emax)
            .unwrap_or(0);
        match first_above.checked_sub(nwann + 1) {
            Some(idx) => self.eband_max[idx] + eps,
            None => self.emin.trunc() - 1.0,
        }
    }

    /// Highest `dis_froz_max` such that `[emin, dis_froz_max]` holds no
    /// more than `nwann` bands: just below the bottom of the band after
    /// the `nwann` lowest bands reaching up to `emin`.
    pub fn suggest_froz_max(&self, emin: f64, nwann: usize, eps: f64) -> f64 {
        let first_inside = self
            .eband_max
            .iter()
            .position(|&hi| hi >= emin)
            .unwrap_or(0);
        let idx = first_inside + nwann;
        if idx >= self.nbands() {
            self.emax.trunc() + 1.0
        } else {
            self.eband_min[idx] - eps
        }
    }

    /// Frozen windows for `nwann` Wannier functions when `[emin, emax]`
    /// contains more bands than that. The upper edge is first placed as if
    /// `nwann + i` functions were wanted, then the lower edge is raised
    /// until only `nwann` bands remain. `i` runs over the surplus bands in
    /// steps of the degeneracy `ndeg`.
    pub fn suggest(&self, emin: f64, emax: f64, nwann: usize, ndeg: usize) -> Result<Suggestion> {
        if nwann == 0 {
            return Err(W90Error::InvalidNumWann(nwann));
        }
        let num_states = self.count_states(emin, emax);
        let surplus = num_states.saturating_sub(nwann);
        let windows = (1..=surplus)
            .step_by(ndeg.max(1))
            .map(|i| {
                let froz_max = self.suggest_froz_max(emin, nwann + i, FROZ_EPS);
                let froz_min = self.suggest_froz_min(froz_max, nwann, FROZ_EPS);
                FrozenWindow { froz_min, froz_max }
            })
            .collect();
        Ok(Suggestion {
            erange: (emin, emax),
            num_states,
            nwann,
            ndeg,
            windows,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenWindow {
    pub froz_min: f64,
    pub froz_max: f64,
}

/// Result of [`EnergyWindows::suggest`].
#[derive(Debug, Clone)]
pub struct Suggestion {
    erange: (f64, f64),
    num_states: usize,
    nwann: usize,
    ndeg: usize,
    windows: Vec<FrozenWindow>,
}

impl Suggestion {
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn windows(&self) -> &[FrozenWindow] {
        self.windows.as_ref()
    }

    pub fn nwann(&self) -> usize {
        self.nwann
    }

    pub fn ndeg(&self) -> usize {
        self.ndeg
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (emin, emax) = self.erange;
        writeln!(
            f,
            "There are {} states in [{emin}, {emax}].",
            self.num_states
        )?;
        if self.windows.is_empty() {
            return writeln!(f, "No more states than WFs, any frozen window inside the range works.");
        }
        writeln!(f, "Suggest froz_min & froz_max as following:")?;
        writeln!(f, "    nwann: {}    degeneracy: {}", self.nwann, self.ndeg)?;
        for w in &self.windows {
            writeln!(
                f,
                "    dis_froz_min : {:+10.5}    dis_froz_max : {:+10.5}",
                w.froz_min, w.froz_max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Six bands:
    /// 0: [-6.0, -5.0]  1: [-4.0, -1.0]  2: [-2.0, 0.5]
    /// 3: [1.0, 2.0]    4: [1.5, 3.0]    5: [5.0, 7.0]
    pub(crate) fn windows() -> EnergyWindows {
        EnergyWindows::new(
            vec![-6.0, -4.0, -2.0, 1.0, 1.5, 5.0],
            vec![-5.0, -1.0, 0.5, 2.0, 3.0, 7.0],
        )
        .unwrap()
    }

    #[test]
    fn test_count_states() {
        let w = windows();
        assert_eq!(w.count_states(-3.0, 1.2), 3);
        assert_eq!(w.count_states(-10.0, 10.0), 6);
        assert_eq!(w.count_states(3.5, 4.5), 0);
        // touching edges count
        assert_eq!(w.count_states(3.0, 5.0), 2);
    }

    #[test]
    fn test_suggest_froz_min() {
        let w = windows();
        // bands reaching down to 2.0: 0..=4, so band 4 - 2 = 2 is excluded
        assert!((w.suggest_froz_min(2.0, 2, FROZ_EPS) - 0.504).abs() < 1e-12);
        // not enough bands below: fall back under the lowest energy
        assert_eq!(w.suggest_froz_min(-1.5, 3, FROZ_EPS), -7.0);
        // no band starts above emax: the search lands on band 0
        assert_eq!(w.suggest_froz_min(100.0, 1, FROZ_EPS), -7.0);
    }

    #[test]
    fn test_suggest_froz_max() {
        let w = windows();
        // bands reaching up to -1.5 start at 1, so band 1 + 2 = 3 is excluded
        assert!((w.suggest_froz_max(-1.5, 2, FROZ_EPS) - 0.996).abs() < 1e-12);
        assert_eq!(w.suggest_froz_max(-1.5, 5, FROZ_EPS), 8.0);
        // no band reaches up to emin: the search lands on band 0
        assert!((w.suggest_froz_max(10.0, 0, FROZ_EPS) + 6.004).abs() < 1e-12);
        assert!((w.suggest_froz_max(10.0, 2, FROZ_EPS) + 2.004).abs() < 1e-12);
        assert_eq!(w.suggest_froz_max(10.0, 6, FROZ_EPS), 8.0);
    }

    #[test]
    fn test_suggest() {
        let w = windows();
        let s = w.suggest(-3.0, 3.0, 2, 1).unwrap();
        assert_eq!(s.num_states(), 4);
        assert_eq!(s.windows().len(), 2);
        let first = s.windows()[0];
        assert!((first.froz_max - 1.496).abs() < 1e-12);
        assert!((first.froz_min + 0.996).abs() < 1e-12);
        let second = s.windows()[1];
        assert!((second.froz_max - 4.996).abs() < 1e-12);
        assert!((second.froz_min - 0.504).abs() < 1e-12);
        // every suggested frozen window touches exactly nwann bands
        for win in s.windows() {
            assert_eq!(w.count_states(win.froz_min, win.froz_max), 2);
        }
        let text = s.to_string();
        assert!(text.contains("dis_froz_min :   -0.99600    dis_froz_max :   +1.49600"));

        let stepped = w.suggest(-3.0, 3.0, 2, 2).unwrap();
        assert_eq!(stepped.windows().len(), 1);
        assert!(matches!(w.suggest(-3.0, 3.0, 0, 1), Err(W90Error::InvalidNumWann(0))));
    }

    #[test]
    fn test_suggest_up_to_top_band() {
        let w = windows();
        let s = w.suggest(-3.0, 6.0, 2, 1).unwrap();
        assert_eq!(s.num_states(), 5);
        assert_eq!(s.windows().len(), 3);
        let last = s.windows()[2];
        assert_eq!(last.froz_max, 8.0);
        assert_eq!(last.froz_min, -7.0);
    }

    #[test]
    fn test_suggest_without_surplus() {
        let s = windows().suggest(-3.0, 1.2, 3, 2).unwrap();
        assert!(s.windows().is_empty());
    }
}
