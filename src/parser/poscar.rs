use std::{f64::consts::PI, path::Path};

use nalgebra::{Matrix3, Vector3};

use super::general::{finish, float_line, float_row};
use crate::{
    error::{read_text, Result, W90Error},
    util::unique_in_order,
};

/// Crystal structure from a VASP5 `POSCAR`/`CONTCAR`.
#[derive(Debug, Clone)]
pub struct Structure {
    /// Lattice vectors as rows, in Angstrom
    lattice: Matrix3<f64>,
    /// Species symbol of every site
    species: Vec<String>,
    frac_coords: Vec<[f64; 3]>,
}

impl Structure {
    pub fn new(lattice: Matrix3<f64>, species: Vec<String>, frac_coords: Vec<[f64; 3]>) -> Self {
        Self {
            lattice,
            species,
            frac_coords,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        const FORMAT: &str = "POSCAR";
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        if lines.len() < 8 {
            return Err(W90Error::InsufficientPoints {
                context: "POSCAR header",
                needed: 8,
                actual: lines.len(),
            });
        }
        let scale = float_line(FORMAT, lines[1])?;
        let mut lattice = Matrix3::zeros();
        for (i, line) in lines[2..5].iter().enumerate() {
            let row = float_line(FORMAT, line)?;
            if row.len() != 3 {
                return Err(W90Error::parse(FORMAT, format!("bad lattice line `{line}`")));
            }
            lattice.set_row(i, &Vector3::new(row[0], row[1], row[2]).transpose());
        }
        let factor = match scale.as_slice() {
            [s] if *s > 0.0 => *s,
            // A negative scale is the target cell volume
            [s] => (-s / lattice.determinant().abs()).cbrt(),
            _ => {
                return Err(W90Error::parse(
                    FORMAT,
                    format!("unsupported scale line `{}`", lines[1]),
                ))
            }
        };
        lattice *= factor;

        let symbols: Vec<&str> = lines[5].split_whitespace().collect();
        if symbols.iter().any(|s| s.parse::<f64>().is_ok()) {
            return Err(W90Error::parse(FORMAT, "species names line is missing"));
        }
        let counts: Vec<usize> = lines[6]
            .split_whitespace()
            .map(|c| c.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| W90Error::parse(FORMAT, format!("bad counts line: {e}")))?;
        if counts.len() != symbols.len() {
            return Err(W90Error::LengthMismatch {
                context: "POSCAR species and counts",
                left: symbols.len(),
                right: counts.len(),
            });
        }
        let species: Vec<String> = symbols
            .iter()
            .zip(counts.iter())
            .flat_map(|(s, &n)| std::iter::repeat(s.to_string()).take(n))
            .collect();

        let mut idx = 7;
        if lines[idx].starts_with(['S', 's']) {
            idx += 1;
        }
        let mode = lines.get(idx).copied().unwrap_or("");
        let cartesian = mode.starts_with(['C', 'c', 'K', 'k']);
        let positions = &lines[(idx + 1).min(lines.len())..];
        if positions.len() < species.len() {
            return Err(W90Error::InsufficientPoints {
                context: "POSCAR positions",
                needed: species.len(),
                actual: positions.len(),
            });
        }
        let inverse = lattice
            .try_inverse()
            .ok_or_else(|| W90Error::parse(FORMAT, "singular lattice"))?;
        let mut frac_coords = Vec::with_capacity(species.len());
        for line in &positions[..species.len()] {
            let (_, row) = finish(FORMAT, float_row(line))?;
            if row.len() < 3 {
                return Err(W90Error::parse(FORMAT, format!("bad position `{line}`")));
            }
            let p = Vector3::new(row[0], row[1], row[2]);
            let frac = if cartesian {
                // Cartesian positions are scaled like the lattice
                inverse.transpose() * (p * factor)
            } else {
                p
            };
            frac_coords.push([frac[0], frac[1], frac[2]]);
        }
        Ok(Self::new(lattice, species, frac_coords))
    }

    pub fn lattice(&self) -> &Matrix3<f64> {
        &self.lattice
    }

    pub fn species(&self) -> &[String] {
        self.species.as_ref()
    }

    pub fn frac_coords(&self) -> &[[f64; 3]] {
        self.frac_coords.as_ref()
    }

    pub fn num_sites(&self) -> usize {
        self.species.len()
    }

    /// Reciprocal lattice vectors as rows, including the 2π factor.
    pub fn reciprocal_lattice(&self) -> Option<Matrix3<f64>> {
        self.lattice
            .try_inverse()
            .map(|inv| inv.transpose() * (2.0 * PI))
    }

    /// Symbols in order of first appearance.
    pub fn unique_species(&self) -> Vec<&str> {
        unique_in_order(self.species.iter().map(String::as_str))
    }
}
