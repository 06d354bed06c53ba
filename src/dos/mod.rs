pub mod orbital;
pub mod projection;
pub mod smearing;

use std::fmt;

/// Total DOS on a uniform energy grid. Spin 1 is always present, spin 2
/// only for spin-polarised band energies.
#[derive(Debug, Clone)]
pub struct TotalDos {
    energy_range: Vec<f64>,
    spin_up: Vec<f64>,
    spin_down: Option<Vec<f64>>,
}

impl TotalDos {
    pub fn new(energy_range: Vec<f64>, spin_up: Vec<f64>, spin_down: Option<Vec<f64>>) -> Self {
        Self {
            energy_range,
            spin_up,
            spin_down,
        }
    }

    pub fn num_points(&self) -> usize {
        self.energy_range.len()
    }

    pub fn energy_range(&self) -> &[f64] {
        self.energy_range.as_ref()
    }

    pub fn spin_up(&self) -> &[f64] {
        self.spin_up.as_ref()
    }

    pub fn spin_down(&self) -> Option<&[f64]> {
        self.spin_down.as_deref()
    }
}

/// Columns `E  up  [down]`.
impl fmt::Display for TotalDos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.energy_range.iter().enumerate() {
            write!(f, "{e:12.6} {:14.6e}", self.spin_up[i])?;
            if let Some(down) = &self.spin_down {
                write!(f, " {:14.6e}", down[i])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
