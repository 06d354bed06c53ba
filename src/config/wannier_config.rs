use std::{fmt, path::PathBuf};

use serde::Deserialize;

use super::{band_config::default_kpoints, default_path, TaskProcess};
use crate::{
    error::{read_text, Result},
    parser::{
        kpoints::KpointPath,
        wannier90::{template, TemplateKind},
    },
};

/// `Kpoint_Path` block of `wannier90.win` from a line-mode `KPOINTS`.
#[derive(Deserialize, Debug)]
pub struct KpathTask {
    #[serde(default = "default_path")]
    path: PathBuf,
    #[serde(default = "default_kpoints")]
    kpoints: String,
    #[serde(default = "default_delimiter")]
    delimiter: String,
}

fn default_delimiter() -> String {
    "!".to_string()
}

impl TaskProcess for KpathTask {
    type Output = KpointPath;

    fn execute(&self) -> Result<Self::Output> {
        let text = read_text(self.path.join(&self.kpoints))?;
        KpointPath::parse(&text, &self.delimiter)
    }
}

#[derive(Deserialize, Debug)]
pub struct TemplateTask {
    #[serde(default = "default_kinds")]
    kinds: Vec<TemplateKind>,
}

fn default_kinds() -> Vec<TemplateKind> {
    vec![TemplateKind::Wann, TemplateKind::Band]
}

pub struct Templates(Vec<TemplateKind>);

impl fmt::Display for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for kind in &self.0 {
            writeln!(f, "{}", template(*kind))?;
        }
        Ok(())
    }
}

impl TaskProcess for TemplateTask {
    type Output = Templates;

    fn execute(&self) -> Result<Self::Output> {
        Ok(Templates(self.kinds.clone()))
    }
}
