use std::fmt;

use super::general::{finish, float_line, float_row};
use crate::error::{Result, W90Error};

/// High-symmetry path of a line-mode VASP `KPOINTS`.
#[derive(Debug, Clone, PartialEq)]
pub struct KpointPath {
    points_per_segment: usize,
    labels: Vec<String>,
    /// Fractional coordinates of every segment end point
    nodes: Vec<[f64; 3]>,
}

impl KpointPath {
    /// `delimiter` separates the coordinates from the label, `!` in most
    /// files.
    pub fn parse(text: &str, delimiter: &str) -> Result<Self> {
        const FORMAT: &str = "KPOINTS";
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() < 4 {
            return Err(W90Error::InsufficientPoints {
                context: "KPOINTS header",
                needed: 4,
                actual: lines.len(),
            });
        }
        let density = float_line(FORMAT, lines[1])?;
        let points_per_segment = density.first().copied().unwrap_or(0.0) as usize;
        let mut labels = Vec::new();
        let mut nodes = Vec::new();
        for line in &lines[4..] {
            let (coords, label) = match line.split_once(delimiter) {
                Some((coords, label)) => (coords, label.trim()),
                None => (*line, ""),
            };
            let (_, values) = finish(FORMAT, float_row(coords))?;
            if values.len() < 3 {
                return Err(W90Error::parse(FORMAT, format!("bad path line `{line}`")));
            }
            labels.push(label.to_string());
            nodes.push([values[0], values[1], values[2]]);
        }
        if nodes.len() % 2 != 0 {
            return Err(W90Error::parse(
                FORMAT,
                format!("{} path points cannot be paired into segments", nodes.len()),
            ));
        }
        Ok(Self {
            points_per_segment,
            labels,
            nodes,
        })
    }

    pub fn points_per_segment(&self) -> usize {
        self.points_per_segment
    }

    pub fn labels(&self) -> &[String] {
        self.labels.as_ref()
    }

    pub fn nodes(&self) -> &[[f64; 3]] {
        self.nodes.as_ref()
    }

    pub fn num_segments(&self) -> usize {
        self.nodes.len() / 2
    }
}

fn signed(x: f64) -> String {
    if x.is_sign_negative() {
        format!("{x:.5}")
    } else {
        format!(" {x:.5}")
    }
}

fn node_string(label: &str, p: &[f64; 3]) -> String {
    format!(
        "{label:5} {}    {}    {}",
        signed(p[0]),
        signed(p[1]),
        signed(p[2])
    )
}

/// Body of a Wannier90 `Kpoint_Path` block, one segment per line.
impl fmt::Display for KpointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.nodes.len()).step_by(2) {
            writeln!(
                f,
                "{}  {}",
                node_string(&self.labels[i], &self.nodes[i]),
                node_string(&self.labels[i + 1], &self.nodes[i + 1])
            )?;
        }
        Ok(())
    }
}
