use std::{fmt, path::{Path, PathBuf}};

use serde::Deserialize;
use tracing::warn;

use super::{default_path, TaskProcess};
use crate::{
    error::{Result, W90Error},
    parser::{eigenval::BandEnergies, vasprun::resolve_efermi, wannier90::Wannier90Input},
    window::{
        dis_table::{DisWindowTable, DIS_EPS},
        report::{ReportOptions, WindowReport},
        EnergyWindows, Suggestion,
    },
};

/**
Energy-window analysis of the band energies in `path`.
# Field:
    * eig: `EIGENVAL` or `<seed>.eig`
    * efermi: read from `vasprun.xml` when absent
    * nwann: number of WFs, read from `win` when absent
    * count: energy range to count states in
    * suggest: energy range to suggest frozen windows in
    * table: list every choice of disentanglement windows
*/
#[derive(Deserialize, Debug)]
pub struct WindowTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_eig")]
    eig: String,
    efermi: Option<f64>,
    nwann: Option<usize>,
    #[serde(default = "default_win")]
    win: String,
    #[serde(flatten)]
    report: ReportOptions,
    count: Option<(f64, f64)>,
    suggest: Option<(f64, f64)>,
    table: Option<TableOptions>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TableOptions {
    #[serde(default)]
    n_excl: usize,
    #[serde(default = "default_dis_eps")]
    epsilon: f64,
}

fn default_eig() -> String {
    "EIGENVAL".to_string()
}

fn default_win() -> String {
    "wannier90.win".to_string()
}

fn default_dis_eps() -> f64 {
    DIS_EPS
}

impl WindowTask {
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    pub fn eig_filename(&self) -> PathBuf {
        self.path.join(&self.eig)
    }

    /// Explicit `nwann`, else `num_wann` of the `.win` file.
    pub fn num_wann(&self) -> Result<usize> {
        if let Some(n) = self.nwann {
            return Ok(n);
        }
        let input = Wannier90Input::from_file(self.path.join(&self.win))?;
        input.num_wann().ok_or(W90Error::InvalidNumWann(0))
    }
}

#[derive(Debug)]
pub struct WindowOutput {
    report: WindowReport,
    count: Option<((f64, f64), usize)>,
    suggestion: Option<Suggestion>,
    table: Option<DisWindowTable>,
}

impl WindowOutput {
    pub fn report(&self) -> &WindowReport {
        &self.report
    }

    pub fn suggestion(&self) -> Option<&Suggestion> {
        self.suggestion.as_ref()
    }

    pub fn table(&self) -> Option<&DisWindowTable> {
        self.table.as_ref()
    }
}

impl fmt::Display for WindowOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.report)?;
        if let Some(((emin, emax), n)) = self.count {
            writeln!(f, "There are {n} states in [{emin}, {emax}].")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "{suggestion}")?;
        }
        if let Some(table) = &self.table {
            write!(f, "{table}")?;
        }
        Ok(())
    }
}

impl TaskProcess for WindowTask {
    type Output = WindowOutput;

    fn execute(&self) -> Result<Self::Output> {
        let bands = BandEnergies::from_file(self.eig_filename())?;
        if bands.nspin() > 1 {
            warn!("Only the first spin channel is analysed");
        }
        let efermi = resolve_efermi(self.efermi, &self.path)?;
        let windows = EnergyWindows::from_bands(&bands)?;
        let report = windows.report(efermi, &self.report);
        let count = self
            .count
            .map(|(emin, emax)| ((emin, emax), windows.count_states(emin, emax)));
        let suggestion = match self.suggest {
            Some((emin, emax)) => {
                Some(windows.suggest(emin, emax, self.num_wann()?, self.report.ndeg)?)
            }
            None => None,
        };
        let table = match self.table {
            Some(opts) => Some(windows.dis_win_table(self.num_wann()?, opts.n_excl, opts.epsilon)?),
            None => None,
        };
        Ok(WindowOutput {
            report,
            count,
            suggestion,
            table,
        })
    }
}
