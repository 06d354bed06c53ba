use std::fmt;

use super::EnergyWindows;
use crate::error::{Result, W90Error};

pub const DIS_EPS: f64 = 0.02;

/// One choice of disentanglement windows, enclosing `num_wann` bands
/// starting at `first_band`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisWindowRow {
    pub first_band: usize,
    pub dis_win_max: f64,
    pub dis_froz_max: f64,
    pub dis_froz_min: f64,
    pub dis_win_min: f64,
}

#[derive(Debug, Clone)]
pub struct DisWindowTable {
    rows: Vec<DisWindowRow>,
}

impl DisWindowTable {
    pub fn rows(&self) -> &[DisWindowRow] {
        self.rows.as_ref()
    }
}

impl EnergyWindows {
    /// Every block of `num_wann` consecutive bands above the first
    /// `n_excl`, each with the outer and frozen windows that separate it
    /// from its neighbours by `epsilon`.
    pub fn dis_win_table(
        &self,
        num_wann: usize,
        n_excl: usize,
        epsilon: f64,
    ) -> Result<DisWindowTable> {
        let nbands = self.nbands();
        if num_wann == 0 {
            return Err(W90Error::InvalidNumWann(num_wann));
        }
        if nbands < num_wann + n_excl {
            return Err(W90Error::NoWindowChoice {
                nbands,
                num_wann,
                n_excl,
            });
        }
        let rows = (0..nbands - num_wann - n_excl)
            .map(|idx| {
                let first = n_excl + idx;
                let dis_win_min = self.eband_min[first] - epsilon;
                let dis_froz_min = match first {
                    0 => dis_win_min,
                    _ => self.eband_max[first - 1] + epsilon,
                };
                DisWindowRow {
                    first_band: first,
                    dis_win_max: self.eband_max[first + num_wann - 1] + epsilon,
                    dis_froz_max: self.eband_min[first + num_wann] - epsilon,
                    dis_froz_min,
                    dis_win_min,
                }
            })
            .collect();
        Ok(DisWindowTable { rows })
    }
}

impl fmt::Display for DisWindowTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dis_win_max  dis_froz_max  dis_froz_min  dis_win_min")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:4.2}  {:4.2}  {:4.2}  {:4.2}",
                row.dis_win_max, row.dis_froz_max, row.dis_froz_min, row.dis_win_min
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::window::test::windows;

    #[test]
    fn test_dis_win_table() {
        let table = windows().dis_win_table(2, 0, DIS_EPS).unwrap();
        assert_eq!(table.rows().len(), 4);
        let first = table.rows()[0];
        assert!((first.dis_win_min + 6.02).abs() < 1e-12);
        assert_eq!(first.dis_froz_min, first.dis_win_min);
        assert!((first.dis_win_max + 0.98).abs() < 1e-12);
        assert!((first.dis_froz_max + 2.02).abs() < 1e-12);
        let third = table.rows()[2];
        assert_eq!(third.first_band, 2);
        assert!((third.dis_froz_min + 0.98).abs() < 1e-12);
        assert!((third.dis_win_max - 2.02).abs() < 1e-12);
        assert!((third.dis_froz_max - 1.48).abs() < 1e-12);
        assert!(table.to_string().starts_with("dis_win_max  dis_froz_max"));
    }

    #[test]
    fn test_dis_win_table_excluded() {
        let w = windows();
        let table = w.dis_win_table(3, 2, DIS_EPS).unwrap();
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].first_band, 2);
        assert!(w.dis_win_table(3, 3, DIS_EPS).unwrap().rows().is_empty());
        assert!(matches!(
            w.dis_win_table(5, 2, DIS_EPS),
            Err(W90Error::NoWindowChoice { .. })
        ));
    }
}
