use std::fmt;

use serde::Deserialize;

use super::EnergyWindows;

/// Energy range wide enough to keep every band.
pub const FULL_RANGE: (f64, f64) = (-1e4, 1e4);

/// A contiguous block of bands, or a single band, with its energy extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandGroup {
    pub first: usize,
    pub last: usize,
    pub emin: f64,
    pub emax: f64,
}

impl BandGroup {
    fn overlaps(&self, (ymin, ymax): (f64, f64)) -> bool {
        self.emax > ymin && self.emin < ymax
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportOptions {
    /// Bands below this index are left out
    #[serde(default)]
    pub nbnds_excl: usize,
    /// List bands one by one instead of gap-separated blocks
    #[serde(default)]
    pub separate: bool,
    /// Degeneracy of the bands: step between listed bands when `separate`
    /// is set, and between suggested windows
    #[serde(default = "default_ndeg")]
    pub ndeg: usize,
    pub erange: Option<(f64, f64)>,
}

fn default_ndeg() -> usize {
    2
}

impl EnergyWindows {
    /// Blocks of bands separated by energy gaps. A gap lies between bands
    /// `i` and `i + 1` when the bottom of `i + 1` is above the top of `i`.
    /// The first block starts at `nbnds_excl`.
    pub fn band_groups(&self, nbnds_excl: usize) -> Vec<BandGroup> {
        let nbands = self.nbands();
        if nbnds_excl >= nbands {
            return vec![];
        }
        let gaps: Vec<usize> = (0..nbands - 1)
            .filter(|&i| self.eband_min[i + 1] > self.eband_max[i])
            .filter(|&i| i + 1 > nbnds_excl)
            .collect();
        let firsts = std::iter::once(nbnds_excl).chain(gaps.iter().map(|i| i + 1));
        let lasts = gaps.iter().copied().chain(std::iter::once(nbands - 1));
        firsts
            .zip(lasts)
            .map(|(first, last)| BandGroup {
                first,
                last,
                emin: self.eband_min[first],
                emax: self.eband_max[last],
            })
            .collect()
    }

    /// Every `ndeg`-th band starting at `nbnds_excl`, the top band left out.
    pub fn separate_bands(&self, nbnds_excl: usize, ndeg: usize) -> Vec<BandGroup> {
        (nbnds_excl..self.nbands().saturating_sub(1))
            .step_by(ndeg.max(1))
            .map(|i| BandGroup {
                first: i,
                last: i,
                emin: self.eband_min[i],
                emax: self.eband_max[i],
            })
            .collect()
    }

    pub fn report(&self, efermi: f64, options: &ReportOptions) -> WindowReport {
        let erange = options.erange.unwrap_or(FULL_RANGE);
        let groups = if options.separate {
            self.separate_bands(options.nbnds_excl, options.ndeg)
        } else {
            self.band_groups(options.nbnds_excl)
        };
        WindowReport {
            efermi,
            separate: options.separate,
            groups: groups.into_iter().filter(|g| g.overlaps(erange)).collect(),
        }
    }
}

/// Table of band blocks (or bands) and their energy extents.
#[derive(Debug, Clone)]
pub struct WindowReport {
    efermi: f64,
    separate: bool,
    groups: Vec<BandGroup>,
}

impl WindowReport {
    pub fn efermi(&self) -> f64 {
        self.efermi
    }

    pub fn groups(&self) -> &[BandGroup] {
        self.groups.as_ref()
    }
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "--------------------------------";
        writeln!(f, "EFERMI: {:2.6}", self.efermi)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Band No.     EMIN        EMAX")?;
        writeln!(f, "{rule}")?;
        for g in &self.groups {
            if self.separate {
                writeln!(f, "  {:3}    {:+10.5}  {:+10.5}", g.first, g.emin, g.emax)?;
            } else {
                writeln!(f, "{:3}~{:3}  {:+10.5}  {:+10.5}", g.first, g.last, g.emin, g.emax)?;
            }
        }
        writeln!(f, "{rule}")
    }
}
