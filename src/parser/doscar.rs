use std::path::Path;

use tracing::debug;

use super::general::float_line;
use crate::{
    dos::orbital::{Orbital, NUM_ORBITALS},
    error::{read_text, Result, W90Error},
};

/// Total and site/orbital projected DOS from a `DOSCAR` written with
/// `LORBIT = 11`. Only the spin-up (collinear) or total (non-collinear)
/// channel of the projections is kept.
#[derive(Debug, Clone)]
pub struct CompleteDos {
    efermi: f64,
    energies: Vec<f64>,
    /// Spin-up (or only) channel of the total DOS
    total: Vec<f64>,
    /// length = number of sites, each holding the s, p and d orbitals in
    /// `Orbital` order
    site_orbitals: Vec<[Vec<f64>; NUM_ORBITALS]>,
}

impl CompleteDos {
    pub fn new(
        efermi: f64,
        energies: Vec<f64>,
        total: Vec<f64>,
        site_orbitals: Vec<[Vec<f64>; NUM_ORBITALS]>,
    ) -> Self {
        Self {
            efermi,
            energies,
            total,
            site_orbitals,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(&path)?;
        debug!("Reading DOS from {}", path.as_ref().display());
        parse_doscar(&text)
    }

    pub fn efermi(&self) -> f64 {
        self.efermi
    }

    pub fn energies(&self) -> &[f64] {
        self.energies.as_ref()
    }

    /// Energies relative to the Fermi level.
    pub fn shifted_energies(&self) -> Vec<f64> {
        self.energies.iter().map(|e| e - self.efermi).collect()
    }

    pub fn total(&self) -> &[f64] {
        self.total.as_ref()
    }

    pub fn num_sites(&self) -> usize {
        self.site_orbitals.len()
    }

    pub fn site_orbital_dos(&self, site: usize, orbital: Orbital) -> Option<&[f64]> {
        self.site_orbitals
            .get(site)
            .map(|orbs| orbs[orbital as usize].as_slice())
    }
}

/// Number of columns per orbital in a site block; the first column of
/// each group is kept.
fn orbital_stride(ncols: usize) -> Option<usize> {
    match ncols {
        // collinear, without and with f orbitals
        9 | 16 => Some(1),
        // spin polarised: up, down
        18 | 32 => Some(2),
        // non-collinear: total, mx, my, mz
        36 | 64 => Some(4),
        _ => None,
    }
}

fn energy_block<'a>(lines: &'a [&'a str], start: usize, nedos: usize) -> Result<&'a [&'a str]> {
    let end = start
        .checked_add(nedos)
        .ok_or_else(|| W90Error::parse("DOSCAR", format!("NEDOS {nedos} out of range")))?;
    lines.get(start..end).ok_or(W90Error::InsufficientPoints {
        context: "DOSCAR energy block",
        needed: end,
        actual: lines.len(),
    })
}

pub fn parse_doscar(text: &str) -> Result<CompleteDos> {
    const FORMAT: &str = "DOSCAR";
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.len() < 6 {
        return Err(W90Error::InsufficientPoints {
            context: "DOSCAR header",
            needed: 6,
            actual: lines.len(),
        });
    }
    let nions = lines[0]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| W90Error::parse(FORMAT, format!("bad first line `{}`", lines[0])))?;
    let header = float_line(FORMAT, lines[5])?;
    if header.len() < 4 {
        return Err(W90Error::parse(
            FORMAT,
            format!("expected `EMAX EMIN NEDOS EFERMI`, got `{}`", lines[5]),
        ));
    }
    let nedos = header[2] as usize;
    let efermi = header[3];
    let mut cursor = 6;

    let total_block = energy_block(&lines, cursor, nedos)?;
    let mut energies = Vec::with_capacity(total_block.len());
    let mut total = Vec::with_capacity(total_block.len());
    for line in total_block {
        let row = float_line(FORMAT, line)?;
        if row.len() < 2 {
            return Err(W90Error::parse(FORMAT, format!("bad total DOS line `{line}`")));
        }
        energies.push(row[0]);
        total.push(row[1]);
    }
    cursor += nedos;

    let mut site_orbitals = Vec::new();
    // Projections are only present when LORBIT was set
    while site_orbitals.len() < nions && lines.get(cursor).is_some_and(|l| !l.is_empty()) {
        cursor += 1;
        let mut orbitals: [Vec<f64>; NUM_ORBITALS] = Default::default();
        for line in energy_block(&lines, cursor, nedos)? {
            let row = float_line(FORMAT, line)?;
            let ncols = row.len().saturating_sub(1);
            let stride = orbital_stride(ncols).ok_or_else(|| {
                W90Error::parse(
                    FORMAT,
                    format!("{ncols} projection columns are not lm-decomposed"),
                )
            })?;
            for (j, orb) in orbitals.iter_mut().enumerate() {
                orb.push(row[1 + j * stride]);
            }
        }
        site_orbitals.push(orbitals);
        cursor += nedos;
    }
    debug!(
        "DOSCAR: {} points, {} of {} sites projected",
        nedos,
        site_orbitals.len(),
        nions
    );
    Ok(CompleteDos::new(efermi, energies, total, site_orbitals))
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Two sites on a 5-point grid. Site 0 has s weight 1.0, site 1 has
    /// px weight 2.0, everything else is zero.
    pub(crate) fn doscar_text() -> String {
        let mut text = String::from(
            "    2    2    1    0\n  0.1E+02\n  1.0E-004\n  CAR\n GaAs\n",
        );
        let header = "     2.0    -2.0     5     0.5     1.0\n";
        text.push_str(header);
        let grid = [-2.0, -1.0, 0.0, 1.0, 2.0];
        for e in grid {
            text.push_str(&format!("{e:8.3}  3.0  0.0\n"));
        }
        for site in 0..2 {
            text.push_str(header);
            for e in grid {
                let mut cols = vec![0.0; 9];
                if site == 0 {
                    cols[0] = 1.0;
                } else {
                    cols[3] = 2.0;
                }
                let row: Vec<String> = cols.iter().map(|c| format!("{c:.4}")).collect();
                text.push_str(&format!("{e:8.3} {}\n", row.join(" ")));
            }
        }
        text
    }

    /// The sites of `doscar_text` in the non-collinear layout: every
    /// orbital has total, mx, my and mz columns, the moments set to 9.0.
    pub(crate) fn noncollinear_doscar_text() -> String {
        let mut text = String::from(
            "    2    2    1    0\n  0.1E+02\n  1.0E-004\n  CAR\n GaAs\n",
        );
        let header = "     2.0    -2.0     5     0.5     1.0\n";
        text.push_str(header);
        let grid = [-2.0, -1.0, 0.0, 1.0, 2.0];
        for e in grid {
            text.push_str(&format!("{e:8.3}  3.0  0.0\n"));
        }
        for site in 0..2 {
            text.push_str(header);
            for e in grid {
                let mut cols = vec![9.0; 36];
                for orbital in 0..9 {
                    cols[4 * orbital] = 0.0;
                }
                if site == 0 {
                    cols[0] = 1.0;
                } else {
                    cols[4 * 3] = 2.0;
                }
                let row: Vec<String> = cols.iter().map(|c| format!("{c:.4}")).collect();
                text.push_str(&format!("{e:8.3} {}\n", row.join(" ")));
            }
        }
        text
    }

    #[test]
    fn test_parse_doscar_noncollinear() {
        let dos = parse_doscar(&noncollinear_doscar_text()).unwrap();
        assert_eq!(dos.num_sites(), 2);
        assert_eq!(dos.site_orbital_dos(0, Orbital::S).unwrap(), &[1.0; 5]);
        assert_eq!(dos.site_orbital_dos(0, Orbital::Py).unwrap(), &[0.0; 5]);
        assert_eq!(dos.site_orbital_dos(1, Orbital::Px).unwrap(), &[2.0; 5]);
        assert_eq!(dos.site_orbital_dos(1, Orbital::Dx2).unwrap(), &[0.0; 5]);
    }

    #[test]
    fn test_parse_doscar_huge_nedos() {
        let text = doscar_text().replacen("     5     0.5", "  1e30     0.5", 1);
        assert!(matches!(parse_doscar(&text), Err(W90Error::Parse { .. })));
    }

    #[test]
    fn test_parse_doscar() {
        let dos = parse_doscar(&doscar_text()).unwrap();
        assert_eq!(dos.efermi(), 0.5);
        assert_eq!(dos.energies().len(), 5);
        assert_eq!(dos.total()[0], 3.0);
        assert_eq!(dos.num_sites(), 2);
        assert_eq!(dos.site_orbital_dos(0, Orbital::S).unwrap()[2], 1.0);
        assert_eq!(dos.site_orbital_dos(1, Orbital::Px).unwrap()[4], 2.0);
        assert_eq!(dos.site_orbital_dos(1, Orbital::S).unwrap()[4], 0.0);
        assert!(dos.site_orbital_dos(2, Orbital::S).is_none());
        assert_eq!(dos.shifted_energies()[0], -2.5);
    }

    #[test]
    fn test_doscar_spin_polarised_takes_up_channel() {
        let mut text = String::from("1 1 1 0\nx\nx\nCAR\nFe\n");
        text.push_str("1.0 -1.0 2 0.0 1.0\n");
        text.push_str("-1.0 1.0 1.0 0.0 0.0\n1.0 1.0 1.0 0.0 0.0\n");
        text.push_str("1.0 -1.0 2 0.0 1.0\n");
        for e in [-1.0, 1.0] {
            let cols: Vec<String> = (0..18).map(|j| format!("{}", j as f64)).collect();
            text.push_str(&format!("{e} {}\n", cols.join(" ")));
        }
        let dos = parse_doscar(&text).unwrap();
        assert_eq!(dos.site_orbital_dos(0, Orbital::Py).unwrap()[0], 2.0);
        assert_eq!(dos.site_orbital_dos(0, Orbital::Dx2).unwrap()[1], 16.0);
    }

    #[test]
    fn test_doscar_without_projections() {
        let text = "1 1 1 0\nx\nx\nCAR\nSi\n1.0 -1.0 2 0.0 1.0\n-1.0 1.0 0.0\n1.0 1.0 0.0\n";
        let dos = parse_doscar(text).unwrap();
        assert_eq!(dos.num_sites(), 0);
        assert_eq!(dos.total(), &[1.0, 1.0]);
    }
}
