/// Struct for dos and projection configs in .toml
use std::{
    fmt::{self, Write},
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::info;

use super::{
    band_config::default_poscar,
    default_path, TaskProcess,
};
use crate::{
    dos::{
        orbital::Channel,
        projection::{
            channel_dos, orbital_weights, parse_orbital_selection, projection_lines,
            rank_windows, ranked_weights, select_projections, smooth, ProjectionSelection,
            RankedWeights, SiteGroup, WeightTable, WindowRanking, KEEP_RATE, PICK_RATE,
        },
        smearing::{compute_energy_range, total_dos, SMEARING_WIDTH},
        TotalDos,
    },
    error::{Result, W90Error},
    parser::{doscar::CompleteDos, eigenval::BandEnergies, poscar::Structure},
    window::{dis_table::DIS_EPS, EnergyWindows},
};

fn default_doscar() -> String {
    "DOSCAR".to_string()
}

fn default_eig() -> String {
    "EIGENVAL".to_string()
}

/**
Orbital analysis of the DOS inside `erange` (relative to the Fermi level)
to choose Wannier90 projections.
# Field:
    * pick: keep orbitals above this fraction of the heaviest one
    * soc: spin-orbit coupling doubles the number of WFs
    * extra: manual selection like `Bi,4-7,0-3;F,8-23,1-3`, ranked
      against the computed weights
    * rank_pct: percentage of the heaviest weight shown in the ranking
    * windows: rank candidate disentanglement windows by the DOS of the
      selected orbitals inside their frozen window
*/
#[derive(Deserialize, Debug)]
pub struct ProjectionTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_doscar")]
    doscar: String,
    #[serde(default = "default_poscar")]
    poscar: String,
    erange: (f64, f64),
    #[serde(default = "default_pick")]
    pick: f64,
    #[serde(default = "default_soc")]
    soc: bool,
    extra: Option<String>,
    #[serde(default = "default_rank_pct")]
    rank_pct: f64,
    windows: Option<WindowRankOptions>,
}

#[derive(Deserialize, Debug)]
pub struct WindowRankOptions {
    #[serde(default = "default_eig")]
    eig: String,
    #[serde(default)]
    n_excl: usize,
    #[serde(default = "default_dis_eps")]
    epsilon: f64,
    #[serde(default = "default_keep")]
    keep: f64,
}

fn default_pick() -> f64 {
    PICK_RATE
}

fn default_soc() -> bool {
    true
}

fn default_rank_pct() -> f64 {
    1.0
}

fn default_dis_eps() -> f64 {
    DIS_EPS
}

fn default_keep() -> f64 {
    KEEP_RATE
}

impl ProjectionTask {
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    fn load(&self) -> Result<(CompleteDos, Structure)> {
        let dos = CompleteDos::from_file(self.path.join(&self.doscar))?;
        let structure = Structure::from_file(self.path.join(&self.poscar))?;
        info!(
            "Reading {} for dos analysis",
            self.path.join(&self.doscar).display()
        );
        Ok((dos, structure))
    }
}

#[derive(Debug)]
pub struct ProjectionOutput {
    table: WeightTable,
    selection: ProjectionSelection,
    num_wann: usize,
    lines: Vec<String>,
    ranked: Option<RankedWeights>,
    windows: Option<WindowRanking>,
}

impl ProjectionOutput {
    pub fn selection(&self) -> &ProjectionSelection {
        &self.selection
    }

    pub fn num_wann(&self) -> usize {
        self.num_wann
    }

    pub fn lines(&self) -> &[String] {
        self.lines.as_ref()
    }

    pub fn windows(&self) -> Option<&WindowRanking> {
        self.windows.as_ref()
    }
}

impl fmt::Display for ProjectionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        writeln!(
            f,
            "\nNumber of Selected Orbitals: {}",
            self.selection.num_orbitals()
        )?;
        writeln!(f, "\nNumber of Selected WFs: {}", self.num_wann)?;
        writeln!(f, "\nSelected Orbitals: ")?;
        write!(f, "{}", self.selection)?;
        if let Some(ranked) = &self.ranked {
            write!(f, "\n{ranked}")?;
        }
        writeln!(f, "\nWannier90 Projection:")?;
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        if let Some(windows) = &self.windows {
            write!(f, "\n{windows}")?;
        }
        Ok(())
    }
}

impl TaskProcess for ProjectionTask {
    type Output = ProjectionOutput;

    fn execute(&self) -> Result<Self::Output> {
        let (dos, structure) = self.load()?;
        let table = orbital_weights(&dos, &structure, self.erange)?;
        let selection = select_projections(&table, self.pick);
        let lines = projection_lines(&selection, &structure)?;
        let ranked = match &self.extra {
            Some(extra) => Some(ranked_weights(
                &table,
                self.rank_pct,
                &parse_orbital_selection(extra)?,
            )),
            None => None,
        };
        let num_wann = selection.num_wann(self.soc);
        let windows = match &self.windows {
            Some(opts) => {
                let bands = BandEnergies::from_file(self.path.join(&opts.eig))?;
                let candidates = EnergyWindows::from_bands(&bands)?.dis_win_table(
                    num_wann,
                    opts.n_excl,
                    opts.epsilon,
                )?;
                Some(rank_windows(&candidates, &dos, selection.selected(), opts.keep)?)
            }
            None => None,
        };
        Ok(ProjectionOutput {
            table,
            selection,
            num_wann,
            lines,
            ranked,
            windows,
        })
    }
}

/**
One curve of projected DOS.
# Field:
    * sites: species symbol or site indices (`"0,1"`)
    * channel: `s`, `p`, `d` or a single orbital such as `pz`
    * label: column header, `<sites>-<channel>` when absent
*/
#[derive(Deserialize, Debug, Clone)]
pub struct DosGroup {
    sites: SiteGroup,
    channel: Channel,
    label: Option<String>,
}

impl DosGroup {
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.sites, self.channel))
    }
}

/**
Gaussian smearing of the band energies onto a uniform grid, relative to
the Fermi level of the `DOSCAR`.
*/
#[derive(Deserialize, Debug, Clone)]
pub struct SmearingOptions {
    #[serde(default = "default_eig")]
    eig: String,
    #[serde(default = "default_smearing_width")]
    width: f64,
    #[serde(default = "default_emin")]
    emin: f64,
    #[serde(default = "default_emax")]
    emax: f64,
    #[serde(default = "default_n_per_ev")]
    n_per_ev: f64,
}

fn default_smearing_width() -> f64 {
    SMEARING_WIDTH
}

fn default_emin() -> f64 {
    -8.0
}

fn default_emax() -> f64 {
    14.0
}

fn default_n_per_ev() -> f64 {
    100.0
}

/**
Smoothed total and projected DOS from `DOSCAR`, as text columns.
# Field:
    * sigma: Gaussian broadening in eV
    * output: file to write the columns to, relative to `path`
*/
#[derive(Deserialize, Debug)]
pub struct DosTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_doscar")]
    doscar: String,
    #[serde(default = "default_poscar")]
    poscar: String,
    #[serde(default = "default_sigma")]
    sigma: f64,
    output: Option<String>,
    #[serde(default)]
    groups: Vec<DosGroup>,
    smearing: Option<SmearingOptions>,
}

fn default_sigma() -> f64 {
    0.02
}

#[derive(Debug)]
pub struct DosOutput {
    efermi: f64,
    energies: Vec<f64>,
    labels: Vec<String>,
    /// Total DOS first, then one column per group
    columns: Vec<Vec<f64>>,
    smeared: Option<TotalDos>,
    written: Option<PathBuf>,
}

impl DosOutput {
    pub fn labels(&self) -> &[String] {
        self.labels.as_ref()
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        self.columns.as_ref()
    }

    pub fn smeared(&self) -> Option<&TotalDos> {
        self.smeared.as_ref()
    }

    pub fn table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# EFERMI: {:.6}", self.efermi);
        let _ = write!(out, "# {:>10}", "E");
        for label in &self.labels {
            let _ = write!(out, " {label:>14}");
        }
        out.push('\n');
        for (i, e) in self.energies.iter().enumerate() {
            let _ = write!(out, "{e:12.6}");
            for column in &self.columns {
                let _ = write!(out, " {:14.6e}", column[i]);
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for DosOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.written {
            Some(path) => writeln!(
                f,
                "DOS columns {} written to `{}`.",
                self.labels.join(", "),
                path.display()
            )?,
            None => write!(f, "{}", self.table())?,
        }
        if let Some(smeared) = &self.smeared {
            writeln!(f, "# Smeared total DOS (E - EFERMI)")?;
            write!(f, "{smeared}")?;
        }
        Ok(())
    }
}

impl TaskProcess for DosTask {
    type Output = DosOutput;

    fn execute(&self) -> Result<Self::Output> {
        let dos = CompleteDos::from_file(self.path.join(&self.doscar))?;
        let energies = dos.energies().to_vec();
        let mut labels = vec!["total".to_string()];
        let mut columns = vec![smooth(&energies, dos.total(), self.sigma)?];
        if !self.groups.is_empty() {
            let structure = Structure::from_file(self.path.join(&self.poscar))?;
            for group in &self.groups {
                let densities = channel_dos(&dos, &structure, &group.sites, group.channel)?;
                columns.push(smooth(&energies, &densities, self.sigma)?);
                labels.push(group.label());
            }
        }
        let smeared = match &self.smearing {
            Some(opts) => {
                let bands = BandEnergies::from_file(self.path.join(&opts.eig))?;
                let num_points = ((opts.emax - opts.emin) * opts.n_per_ev) as usize;
                let grid = compute_energy_range(opts.emin, opts.emax, num_points)?;
                Some(total_dos(&bands, dos.efermi(), &grid, opts.width)?)
            }
            None => None,
        };
        let mut output = DosOutput {
            efermi: dos.efermi(),
            energies,
            labels,
            columns,
            smeared,
            written: None,
        };
        if let Some(name) = &self.output {
            let target = self.path.join(name);
            fs::write(&target, output.table()).map_err(|e| W90Error::io(&target, e))?;
            info!("DOS written to {}", target.display());
            output.written = Some(target);
        }
        Ok(output)
    }
}
