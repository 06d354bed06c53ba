use std::path::Path;

use nom::{
    bytes::complete::take_while1,
    character::complete::{one_of, space0},
    sequence::{delimited, tuple},
    IResult,
};
use tracing::{debug, info};

use super::general::{decimal, decimal_usize, float, float_row};
use crate::error::{read_text, Result, W90Error};

/// Parameters of `wannier90.win` that matter for choosing energy windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wannier90Input {
    num_wann: Option<usize>,
    num_bands: Option<usize>,
    dis_win_min: Option<f64>,
    dis_win_max: Option<f64>,
    dis_froz_min: Option<f64>,
    dis_froz_max: Option<f64>,
}

impl Wannier90Input {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(&path)?;
        debug!("Reading {}", path.as_ref().display());
        Ok(Self::parse(&text))
    }

    /// Pick `key = value` (or `key : value`) pairs out of the input.
    /// Keys are case-insensitive, `!` and `#` start comments, block
    /// contents and unknown keys are skipped.
    pub fn parse(text: &str) -> Self {
        let mut input = Self::default();
        for line in text.lines() {
            let line = line.split(['!', '#']).next().unwrap_or("").trim();
            let Ok((value, key)) = key_value(line) else {
                continue;
            };
            let key = key.to_ascii_lowercase();
            match key.as_str() {
                "num_wann" => input.num_wann = parse_whole(decimal_usize, value),
                "num_bands" => input.num_bands = parse_whole(decimal_usize, value),
                "dis_win_min" => input.dis_win_min = parse_whole(float, value),
                "dis_win_max" => input.dis_win_max = parse_whole(float, value),
                "dis_froz_min" => input.dis_froz_min = parse_whole(float, value),
                "dis_froz_max" => input.dis_froz_max = parse_whole(float, value),
                _ => {}
            }
        }
        input
    }

    pub fn num_wann(&self) -> Option<usize> {
        self.num_wann
    }

    pub fn num_bands(&self) -> Option<usize> {
        self.num_bands
    }

    pub fn dis_win_min(&self) -> Option<f64> {
        self.dis_win_min
    }

    pub fn dis_win_max(&self) -> Option<f64> {
        self.dis_win_max
    }

    pub fn dis_froz_min(&self) -> Option<f64> {
        self.dis_froz_min
    }

    pub fn dis_froz_max(&self) -> Option<f64> {
        self.dis_froz_max
    }
}

fn key_value(line: &str) -> IResult<&str, &str> {
    let (value, (key, _, _)) = tuple((
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        delimited(space0, one_of("=:"), space0),
        space0,
    ))(line)?;
    Ok((value, key))
}

fn parse_whole<T>(parser: fn(&str) -> IResult<&str, T>, value: &str) -> Option<T> {
    match parser(value.trim()) {
        Ok(("", v)) => Some(v),
        _ => None,
    }
}

/// Spread convergence of the Wannierisation, read from the `<-- CONV`
/// lines of `wannier90.wout`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadHistory {
    iterations: Vec<u32>,
    /// Total spread in Ang^2
    spreads: Vec<f64>,
}

impl SpreadHistory {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = read_text(&path)?;
        Self::parse(&text)
    }

    /// Rows look like
    /// `  12   -0.131E-03   0.0000052380   14.8913217380   0.05  <-- CONV`;
    /// the table frame lines carry the same marker and are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut iterations = Vec::new();
        let mut spreads = Vec::new();
        for line in text.lines().filter(|l| l.contains("<-- CONV")) {
            let Ok((rest, iter)) = delimited(space0, decimal, space0)(line) else {
                continue;
            };
            let Ok((_, values)) = float_row(rest) else {
                continue;
            };
            match values.get(2) {
                Some(spread) => {
                    iterations.push(iter);
                    spreads.push(*spread);
                }
                None => {
                    return Err(W90Error::parse(
                        "wannier90.wout",
                        format!("bad convergence line `{}`", line.trim()),
                    ))
                }
            }
        }
        Ok(Self {
            iterations,
            spreads,
        })
    }

    pub fn iterations(&self) -> &[u32] {
        self.iterations.as_ref()
    }

    pub fn spreads(&self) -> &[f64] {
        self.spreads.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.spreads.is_empty()
    }

    /// Iteration with the smallest total spread, a sensible `num_iter`.
    pub fn min_iteration(&self) -> Option<(u32, f64)> {
        let (idx, spread) = self
            .spreads
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        info!("MIN_NUM_ITER: {}   SPREAD: {}", self.iterations[idx], spread);
        Some((self.iterations[idx], *spread))
    }
}

/// Kinds of `wannier90.win` parameter templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Wann,
    Band,
}

pub fn template(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Wann => {
            "###############
#     W90     #
###############
dis_win_max       =  0.0
dis_froz_max      =  0.0
dis_froz_min      = -5.0
dis_win_min       = -5.0

num_iter          = 1000
num_print_cycles  =   40
dis_num_iter      = 5000
dis_mix_ratio     =  1.0
"
        }
        TemplateKind::Band => {
            "###############
#  Band Plot  #
###############   # restart = plot
write_hr          = true
bands_plot        = true
bands_num_points  = 151
bands_plot_format = gnuplot

Begin Kpoint_Path
End Kpoint_Path
"
        }
    }
}
