use std::path::Path;

use nom::{
    bytes::complete::{tag, take_until},
    character::complete::multispace0,
    sequence::{delimited, preceded, tuple},
    IResult,
};
use tracing::info;

use super::general::float;
use crate::error::{read_text, Result, W90Error};

fn parse_efermi_tag(text: &str) -> IResult<&str, f64> {
    preceded(
        // Skip contents before the fermi energy entry
        tuple((take_until("name=\"efermi\""), take_until(">"), tag(">"))),
        delimited(multispace0, float, multispace0),
    )(text)
}

/// Fermi energy from the text of `vasprun.xml`, i.e. the value of
/// `<i name="efermi">`.
pub fn parse_efermi(text: &str) -> Option<f64> {
    parse_efermi_tag(text).ok().map(|(_, efermi)| efermi)
}

/// Fermi energy from `<dir>/vasprun.xml`.
pub fn read_efermi<P: AsRef<Path>>(dir: P) -> Result<f64> {
    let path = dir.as_ref().join("vasprun.xml");
    let text = read_text(&path)?;
    let efermi = parse_efermi(&text).ok_or(W90Error::MissingFermiLevel(path.clone()))?;
    info!("Fermi level {efermi} from {}", path.display());
    Ok(efermi)
}

/// Use the given Fermi level, or fall back to `vasprun.xml` in `dir`.
pub fn resolve_efermi<P: AsRef<Path>>(efermi: Option<f64>, dir: P) -> Result<f64> {
    match efermi {
        Some(e) => Ok(e),
        None => read_efermi(dir),
    }
}
