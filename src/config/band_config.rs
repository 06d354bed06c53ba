use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::info;

use super::{default_path, TaskProcess};
use crate::{
    compare::{evaluate, BandQuality, Kernel},
    error::{Result, W90Error},
    parser::{
        band_dat::{kpath_distances, BandPath},
        eigenval::BandEnergies,
        kpoints::KpointPath,
        poscar::Structure,
        wannier90::SpreadHistory,
    },
};

/**
Comparison of a VASP band structure with its Wannier90 interpolation.
# Field:
    * vasp: p4vasp `bnd.dat`
    * wannier: `wannier90_band.dat`
    * wout: `wannier90.wout`, for the spread convergence
    * kernel: `type,mid,width`, see `Kernel`
    * quality / spread: switch the two analyses
*/
#[derive(Deserialize, Debug)]
pub struct CompareTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_vasp")]
    vasp: String,
    #[serde(default = "default_wannier")]
    wannier: String,
    #[serde(default = "default_wout")]
    wout: String,
    #[serde(default = "default_kernel")]
    kernel: String,
    #[serde(default = "default_true")]
    quality: bool,
    #[serde(default = "default_true")]
    spread: bool,
}

fn default_vasp() -> String {
    "bnd.dat".to_string()
}

fn default_wannier() -> String {
    "wannier90_band.dat".to_string()
}

fn default_wout() -> String {
    "wannier90.wout".to_string()
}

fn default_kernel() -> String {
    Kernel::default().to_string()
}

fn default_true() -> bool {
    true
}

impl CompareTask {
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    pub fn kernel(&self) -> Result<Kernel> {
        self.kernel.parse()
    }
}

#[derive(Debug)]
pub struct CompareOutput {
    quality: Option<BandQuality>,
    /// `None` when the spread was not requested or no `.wout` was found
    min_spread: Option<(u32, f64)>,
}

impl CompareOutput {
    pub fn quality(&self) -> Option<&BandQuality> {
        self.quality.as_ref()
    }

    pub fn min_spread(&self) -> Option<(u32, f64)> {
        self.min_spread
    }
}

impl fmt::Display for CompareOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(quality) = &self.quality {
            write!(f, "{quality}")?;
        }
        if let Some((iter, spread)) = self.min_spread {
            writeln!(f, "MIN_NUM_ITER: {iter}   SPREAD: {spread}")?;
        }
        Ok(())
    }
}

impl TaskProcess for CompareTask {
    type Output = CompareOutput;

    fn execute(&self) -> Result<Self::Output> {
        let kernel = self.kernel()?;
        let quality = if self.quality {
            info!("Reading Data from {}", self.path.join(&self.vasp).display());
            let vasp = BandPath::from_file(self.path.join(&self.vasp))?;
            let w90 = BandPath::from_file(self.path.join(&self.wannier))?;
            info!("Evaluating Band Quality with kernel {kernel}");
            Some(evaluate(&vasp, &w90, &kernel)?)
        } else {
            None
        };
        let wout = self.path.join(&self.wout);
        let min_spread = if !self.spread {
            None
        } else if wout.exists() {
            SpreadHistory::from_file(&wout)?.min_iteration()
        } else {
            info!("There is no `{}`.", wout.display());
            None
        };
        Ok(CompareOutput {
            quality,
            min_spread,
        })
    }
}

/**
Export line-mode band energies as p4vasp `bnd.dat`. Spin-polarised runs
give `bnd_up.dat` and `bnd_down.dat`.
*/
#[derive(Deserialize, Debug)]
pub struct ExportBandTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_eigenval")]
    eigenval: String,
    #[serde(default = "default_kpoints")]
    kpoints: String,
    #[serde(default = "default_poscar")]
    poscar: String,
}

fn default_eigenval() -> String {
    "EIGENVAL".to_string()
}

pub(crate) fn default_kpoints() -> String {
    "KPOINTS".to_string()
}

pub(crate) fn default_poscar() -> String {
    "POSCAR".to_string()
}

#[derive(Debug)]
pub struct ExportOutput {
    written: Vec<(PathBuf, usize)>,
}

impl ExportOutput {
    pub fn written(&self) -> &[(PathBuf, usize)] {
        self.written.as_ref()
    }
}

impl fmt::Display for ExportOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.written.len() > 1 {
            writeln!(f, "NSPIN = {}", self.written.len())?;
        }
        for (path, nbands) in &self.written {
            writeln!(f, "export {nbands} bands to `{}`.", path.display())?;
        }
        Ok(())
    }
}

impl TaskProcess for ExportBandTask {
    type Output = ExportOutput;

    fn execute(&self) -> Result<Self::Output> {
        let bands = BandEnergies::from_file(self.path.join(&self.eigenval))?;
        let kpoints_text = crate::error::read_text(self.path.join(&self.kpoints))?;
        let kpath = KpointPath::parse(&kpoints_text, "!")?;
        let structure = Structure::from_file(self.path.join(&self.poscar))?;
        let reciprocal = structure
            .reciprocal_lattice()
            .ok_or(W90Error::parse("POSCAR", "singular lattice"))?;
        let kpoints = bands.kpoints().ok_or(W90Error::parse(
            "EIGENVAL",
            "k-point coordinates are required for a band path",
        ))?;
        let distances = kpath_distances(kpoints, &reciprocal, kpath.points_per_segment());
        let names: &[&str] = if bands.nspin() == 1 {
            &["bnd.dat"]
        } else {
            &["bnd_up.dat", "bnd_down.dat"]
        };
        let mut written = Vec::new();
        for (spin, name) in names.iter().enumerate() {
            let band_path = BandPath::from_band_energies(&bands, spin, distances.clone())?;
            let target = self.path.join(name);
            fs::write(&target, band_path.to_dat_string())
                .map_err(|e| W90Error::io(&target, e))?;
            written.push((target, band_path.nbands()));
        }
        Ok(ExportOutput { written })
    }
}
