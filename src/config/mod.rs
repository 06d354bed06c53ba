/**
Define and control Structs for deserialization of the config.toml
*/
use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::info;

use self::{
    band_config::{CompareTask, ExportBandTask},
    dos_config::{DosTask, ProjectionTask},
    window_config::WindowTask,
    wannier_config::{KpathTask, TemplateTask},
};
use crate::error::{read_text, Result};

pub mod band_config;
pub mod dos_config;
pub mod wannier_config;
pub mod window_config;

/**
Config file struct for deserialization
# Field:
    * title: String,
    * tasks: Task - Struct of Task
*/
#[derive(Deserialize, Debug)]
pub struct Config {
    title: String,
    tasks: Task,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn title(&self) -> &str {
        self.title.as_ref()
    }

    pub fn tasks(&self) -> &Task {
        &self.tasks
    }
}

/**
Tasks of a run, each optional.
# Field:
    * window: energy windows of the band energies
    * compare: VASP vs Wannier90 band quality and spread convergence
    * projection: orbital analysis for Wannier90 projections
    * dos: smoothed projected DOS columns
    * kpath: `Kpoint_Path` block from `KPOINTS`
    * export_band: p4vasp `bnd.dat` from `EIGENVAL`
    * template: Wannier90 parameter templates
*/
#[derive(Deserialize, Debug, Default)]
pub struct Task {
    window: Option<WindowTask>,
    compare: Option<CompareTask>,
    projection: Option<ProjectionTask>,
    dos: Option<DosTask>,
    kpath: Option<KpathTask>,
    export_band: Option<ExportBandTask>,
    template: Option<TemplateTask>,
}

impl Task {
    pub fn window(&self) -> Option<&WindowTask> {
        self.window.as_ref()
    }

    pub fn compare(&self) -> Option<&CompareTask> {
        self.compare.as_ref()
    }

    pub fn projection(&self) -> Option<&ProjectionTask> {
        self.projection.as_ref()
    }

    pub fn dos(&self) -> Option<&DosTask> {
        self.dos.as_ref()
    }

    pub fn kpath(&self) -> Option<&KpathTask> {
        self.kpath.as_ref()
    }

    pub fn export_band(&self) -> Option<&ExportBandTask> {
        self.export_band.as_ref()
    }

    pub fn template(&self) -> Option<&TemplateTask> {
        self.template.as_ref()
    }

    /// Run every configured task in a fixed order and collect the reports.
    pub fn execute_all(&self) -> Result<Vec<TaskReport>> {
        let mut reports = Vec::new();
        push_report(&mut reports, "template", self.template())?;
        push_report(&mut reports, "kpath", self.kpath())?;
        push_report(&mut reports, "export_band", self.export_band())?;
        push_report(&mut reports, "window", self.window())?;
        push_report(&mut reports, "projection", self.projection())?;
        push_report(&mut reports, "dos", self.dos())?;
        push_report(&mut reports, "compare", self.compare())?;
        Ok(reports)
    }
}

pub trait TaskProcess {
    type Output: fmt::Display;
    fn execute(&self) -> Result<Self::Output>;
}

/// Printed result of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub name: &'static str,
    pub body: String,
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        write!(f, "{}", self.body)
    }
}

fn push_report<T: TaskProcess>(
    reports: &mut Vec<TaskReport>,
    name: &'static str,
    task: Option<&T>,
) -> Result<()> {
    if let Some(task) = task {
        info!("Running task `{name}`");
        reports.push(TaskReport {
            name,
            body: task.execute()?.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn default_path() -> PathBuf {
    PathBuf::from(".")
}
