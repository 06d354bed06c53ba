//! Orbital character of the states inside an energy window, used to pick
//! Wannier90 projections and to compare candidate frozen windows.
use std::{collections::BTreeSet, fmt, str::FromStr};

use rayon::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use super::orbital::{Channel, Orbital};
use crate::{
    error::{Result, W90Error},
    numerics::{fixed_quad, gaussian_filter1d, CubicSpline},
    parser::{doscar::CompleteDos, poscar::Structure},
    util::{unique_in_order, ElementWiseAddAssign},
    window::dis_table::{DisWindowRow, DisWindowTable},
};

pub const PICK_RATE: f64 = 0.1;
pub const KEEP_RATE: f64 = 0.7;

/// States between `window.0` and `window.1` of a density sampled on
/// `energies`, from the interpolating spline of the density.
pub fn integrate_window(energies: &[f64], dos: &[f64], window: (f64, f64)) -> Result<f64> {
    let spline = CubicSpline::new(energies, dos)?;
    Ok(fixed_quad(|x| spline.eval(x), window.0, window.1))
}

/// Integrated DOS of one orbital of one site.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalWeight {
    pub species: String,
    pub site: usize,
    pub orbital: Orbital,
    pub weight: f64,
}

impl OrbitalWeight {
    /// `Species_site_orbital`, e.g. `Bi_4_px`.
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.species, self.site, self.orbital)
    }
}

#[derive(Debug, Clone)]
pub struct WeightTable {
    window: (f64, f64),
    /// Sites in structure order, orbitals in `Orbital` order within a site
    rows: Vec<OrbitalWeight>,
}

impl WeightTable {
    pub fn new(window: (f64, f64), rows: Vec<OrbitalWeight>) -> Self {
        Self { window, rows }
    }

    pub fn window(&self) -> (f64, f64) {
        self.window
    }

    pub fn rows(&self) -> &[OrbitalWeight] {
        self.rows.as_ref()
    }

    pub fn max_weight(&self) -> f64 {
        self.rows
            .iter()
            .map(|r| r.weight)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn above(&self, threshold: f64) -> impl Iterator<Item = &OrbitalWeight> {
        self.rows.iter().filter(move |r| r.weight > threshold)
    }
}

impl fmt::Display for WeightTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Calculated DOS Energy Range: {}, {}",
            self.window.0, self.window.1
        )?;
        for row in &self.rows {
            writeln!(f, "{:<16} {:12.6}", row.key(), row.weight)?;
        }
        Ok(())
    }
}

/// Integrate every site and orbital of `dos` over `window`, with energies
/// taken relative to the Fermi level.
pub fn orbital_weights(
    dos: &CompleteDos,
    structure: &Structure,
    window: (f64, f64),
) -> Result<WeightTable> {
    if dos.num_sites() < structure.num_sites() {
        return Err(W90Error::LengthMismatch {
            context: "projected sites of DOSCAR vs POSCAR",
            left: dos.num_sites(),
            right: structure.num_sites(),
        });
    }
    let energies = dos.shifted_energies();
    let per_site = structure
        .species()
        .par_iter()
        .enumerate()
        .map(|(site, species)| -> Result<Vec<OrbitalWeight>> {
            Orbital::ALL
                .iter()
                .map(|&orbital| -> Result<OrbitalWeight> {
                    let densities = dos.site_orbital_dos(site, orbital).ok_or(
                        W90Error::SiteOutOfRange {
                            site,
                            num_sites: dos.num_sites(),
                        },
                    )?;
                    Ok(OrbitalWeight {
                        species: species.clone(),
                        site,
                        orbital,
                        weight: integrate_window(&energies, densities, window)?,
                    })
                })
                .collect()
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "Integrated {} sites over [{}, {}]",
        per_site.len(),
        window.0,
        window.1
    );
    Ok(WeightTable::new(window, per_site.into_iter().flatten().collect()))
}

/// One Wannier90 projection line: a species (every site) or a single site.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub species: String,
    /// `None` when the projection applies to every site of `species`
    pub site: Option<usize>,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone)]
pub struct ProjectionSelection {
    selected: Vec<OrbitalWeight>,
    projections: Vec<Projection>,
}

impl ProjectionSelection {
    /// Individual (site, orbital) pairs above the threshold.
    pub fn selected(&self) -> &[OrbitalWeight] {
        self.selected.as_ref()
    }

    pub fn projections(&self) -> &[Projection] {
        self.projections.as_ref()
    }

    pub fn num_orbitals(&self) -> usize {
        self.selected.len()
    }

    /// Spin-orbit coupling doubles the number of Wannier functions.
    pub fn num_wann(&self, soc: bool) -> usize {
        if soc {
            2 * self.num_orbitals()
        } else {
            self.num_orbitals()
        }
    }
}

impl fmt::Display for ProjectionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<8} {:>5}  orb", "species", "site")?;
        for p in &self.projections {
            let site = p.site.map_or("all".to_string(), |s| s.to_string());
            let orbs: Vec<String> = p.channels.iter().map(Channel::to_string).collect();
            writeln!(f, "{:<8} {:>5}  [{}]", p.species, site, orbs.join(", "))?;
        }
        Ok(())
    }
}

/// Replace complete shells among `channels` by the shell itself, so that
/// `[s, px, py, pz, dx2]` becomes `[dx2, s, p]`.
fn merge_shells(mut channels: Vec<Channel>) -> Vec<Channel> {
    for shell in Channel::SHELLS {
        let members: Vec<Channel> = shell.orbitals().into_iter().map(Channel::Single).collect();
        if members.iter().all(|m| channels.contains(m)) {
            channels.retain(|c| !members.contains(c));
            channels.push(shell);
        }
    }
    channels
}

/**
Keep the orbitals whose weight exceeds `pick_rate` times the largest
weight and group them into projections.
# Notes:
  * Complete s, p or d shells of a site are merged into `l=` projections.
  * When every site of a species ends up with the same channels, the
    per-site projections are replaced by one species projection, placed
    after the remaining per-site ones.
*/
pub fn select_projections(table: &WeightTable, pick_rate: f64) -> ProjectionSelection {
    let threshold = pick_rate * table.max_weight();
    let selected: Vec<OrbitalWeight> = table.above(threshold).cloned().collect();

    let mut projections = Vec::new();
    for species in unique_in_order(selected.iter().map(|r| r.species.as_str())) {
        let sites = unique_in_order(
            selected
                .iter()
                .filter(|r| r.species == species)
                .map(|r| r.site),
        );
        for site in sites {
            let orbitals = unique_in_order(
                selected
                    .iter()
                    .filter(|r| r.site == site)
                    .map(|r| Channel::Single(r.orbital)),
            );
            projections.push(Projection {
                species: species.to_string(),
                site: Some(site),
                channels: merge_shells(orbitals),
            });
        }
    }

    let species_list = unique_in_order(projections.iter().map(|p| p.species.clone()));
    for species in species_list {
        let all_sites = unique_in_order(
            table
                .rows()
                .iter()
                .filter(|r| r.species == species)
                .map(|r| r.site),
        );
        let mut groups: Vec<Vec<Channel>> = projections
            .iter()
            .filter(|p| p.species == species)
            .map(|p| {
                let mut channels = p.channels.clone();
                channels.sort();
                channels
            })
            .collect();
        if groups.len() != all_sites.len() {
            continue;
        }
        groups.dedup();
        if groups.len() == 1 {
            let channels = projections
                .iter()
                .find(|p| p.species == species)
                .map(|p| p.channels.clone())
                .unwrap_or_default();
            projections.retain(|p| p.species != species);
            projections.push(Projection {
                species,
                site: None,
                channels,
            });
        }
    }
    info!(
        "Selected {} orbitals in {} projections",
        selected.len(),
        projections.len()
    );
    ProjectionSelection {
        selected,
        projections,
    }
}

/// `l=0;l=1;dxy` style list of channels.
pub fn orbital_string(channels: &[Channel]) -> String {
    channels
        .iter()
        .map(Channel::projection)
        .collect::<Vec<_>>()
        .join(";")
}

/// Body of the Wannier90 `projections` block. Single-site projections use
/// the fractional position of the site.
pub fn projection_lines(selection: &ProjectionSelection, structure: &Structure) -> Result<Vec<String>> {
    selection
        .projections()
        .iter()
        .map(|p| match p.site {
            None => Ok(format!("{}:{}", p.species, orbital_string(&p.channels))),
            Some(site) => {
                let pos = structure
                    .frac_coords()
                    .get(site)
                    .ok_or(W90Error::SiteOutOfRange {
                        site,
                        num_sites: structure.num_sites(),
                    })?;
                Ok(format!(
                    "c={:.6},{:.6},{:.6}:{}",
                    pos[0],
                    pos[1],
                    pos[2],
                    orbital_string(&p.channels)
                ))
            }
        })
        .collect()
}

fn index_range(s: &str, whole: &str) -> Result<Vec<usize>> {
    let invalid = || W90Error::InvalidSelection(whole.to_string());
    let parse = |n: &str| n.trim().parse::<usize>().map_err(|_| invalid());
    let (left, right) = match s.split_once('-') {
        Some((l, r)) => (parse(l)?, parse(r)?),
        None => {
            let n = parse(s)?;
            (n, n)
        }
    };
    Ok((left..=right).collect())
}

/**
Parse a manual orbital selection such as `Bi,4-7,0-3;F,8-23,1-3` into
`Species_site_orbital` keys. Each `;`-separated item is
`species,sites,orbitals` where sites and orbitals are an index or an
inclusive range, orbitals counted in `Orbital` order.
*/
pub fn parse_orbital_selection(s: &str) -> Result<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    for item in s.split(';').map(str::trim).filter(|i| !i.is_empty()) {
        let fields: Vec<&str> = item.split(',').map(str::trim).collect();
        let [species, sites, orbitals] = fields.as_slice() else {
            return Err(W90Error::InvalidSelection(item.to_string()));
        };
        let orbitals = index_range(orbitals, item)?
            .into_iter()
            .map(|i| Orbital::from_index(i).ok_or_else(|| W90Error::UnknownOrbital(i.to_string())))
            .collect::<Result<Vec<_>>>()?;
        for site in index_range(sites, item)? {
            for orbital in &orbitals {
                keys.insert(format!("{species}_{site}_{orbital}"));
            }
        }
    }
    Ok(keys)
}

/// Orbitals above a percentage of the largest weight, heaviest first,
/// flagged when they belong to a manual selection.
#[derive(Debug, Clone)]
pub struct RankedWeights {
    num_requested: usize,
    rows: Vec<(OrbitalWeight, bool)>,
}

impl RankedWeights {
    pub fn rows(&self) -> &[(OrbitalWeight, bool)] {
        self.rows.as_ref()
    }

    pub fn num_selected(&self) -> usize {
        self.rows.iter().filter(|(_, s)| *s).count()
    }
}

impl fmt::Display for RankedWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} orbitals selected", self.num_requested)?;
        writeln!(
            f,
            "Rank {} orbitals with {} selected",
            self.rows.len(),
            self.num_selected()
        )?;
        for (row, selected) in &self.rows {
            let mark = if *selected { "*" } else { "" };
            writeln!(f, "{:<16} {:12.6} {mark}", row.key(), row.weight)?;
        }
        Ok(())
    }
}

pub fn ranked_weights(table: &WeightTable, pct: f64, selected: &BTreeSet<String>) -> RankedWeights {
    let threshold = pct / 100.0 * table.max_weight();
    let mut rows: Vec<(OrbitalWeight, bool)> = table
        .above(threshold)
        .map(|r| (r.clone(), selected.contains(&r.key())))
        .collect();
    rows.sort_by(|a, b| b.0.weight.total_cmp(&a.0.weight));
    RankedWeights {
        num_requested: selected.len(),
        rows,
    }
}

/// Summed integrated DOS of the given orbitals over `window`.
pub fn window_dos(dos: &CompleteDos, rows: &[OrbitalWeight], window: (f64, f64)) -> Result<f64> {
    let energies = dos.shifted_energies();
    rows.iter()
        .map(|r| {
            let densities =
                dos.site_orbital_dos(r.site, r.orbital)
                    .ok_or(W90Error::SiteOutOfRange {
                        site: r.site,
                        num_sites: dos.num_sites(),
                    })?;
            integrate_window(&energies, densities, window)
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDos {
    pub window: DisWindowRow,
    pub dos: f64,
}

#[derive(Debug, Clone)]
pub struct WindowRanking {
    rows: Vec<WindowDos>,
}

impl WindowRanking {
    pub fn rows(&self) -> &[WindowDos] {
        self.rows.as_ref()
    }
}

impl fmt::Display for WindowRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "dis_win_max  dis_froz_max  dis_froz_min  dis_win_min  dos")?;
        for WindowDos { window: w, dos } in &self.rows {
            writeln!(
                f,
                "{:4.2}  {:4.2}  {:4.2}  {:4.2}  {:.4}",
                w.dis_win_max, w.dis_froz_max, w.dis_froz_min, w.dis_win_min, dos
            )?;
        }
        Ok(())
    }
}

/// Weight of the selected orbitals inside the frozen window of every
/// candidate, keeping candidates above `keep` times the best one.
pub fn rank_windows(
    table: &DisWindowTable,
    dos: &CompleteDos,
    rows: &[OrbitalWeight],
    keep: f64,
) -> Result<WindowRanking> {
    let scored = table
        .rows()
        .par_iter()
        .map(|w| -> Result<WindowDos> {
            Ok(WindowDos {
                window: *w,
                dos: window_dos(dos, rows, (w.dis_froz_min, w.dis_froz_max))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let best = scored.iter().map(|w| w.dos).fold(f64::NEG_INFINITY, f64::max);
    let threshold = keep * best;
    Ok(WindowRanking {
        rows: scored.into_iter().filter(|w| w.dos > threshold).collect(),
    })
}

/// Sites either by species symbol or by explicit indices (`"0,3,4"`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum SiteGroup {
    Species(String),
    Indices(Vec<usize>),
}

impl SiteGroup {
    pub fn sites(&self, structure: &Structure) -> Result<Vec<usize>> {
        match self {
            SiteGroup::Species(symbol) => {
                let sites: Vec<usize> = structure
                    .species()
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| *s == symbol)
                    .map(|(i, _)| i)
                    .collect();
                if sites.is_empty() {
                    return Err(W90Error::InvalidSelection(symbol.clone()));
                }
                Ok(sites)
            }
            SiteGroup::Indices(indices) => {
                match indices.iter().find(|&&i| i >= structure.num_sites()) {
                    Some(&site) => Err(W90Error::SiteOutOfRange {
                        site,
                        num_sites: structure.num_sites(),
                    }),
                    None => Ok(indices.clone()),
                }
            }
        }
    }
}

impl FromStr for SiteGroup {
    type Err = W90Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(W90Error::InvalidSelection(s.to_string()));
        }
        if s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ') {
            let indices = s
                .split(',')
                .map(|i| i.trim().parse::<usize>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| W90Error::InvalidSelection(s.to_string()))?;
            Ok(SiteGroup::Indices(indices))
        } else {
            Ok(SiteGroup::Species(s.to_string()))
        }
    }
}

impl TryFrom<String> for SiteGroup {
    type Error = W90Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for SiteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteGroup::Species(s) => f.write_str(s),
            SiteGroup::Indices(indices) => {
                let list: Vec<String> = indices.iter().map(usize::to_string).collect();
                f.write_str(&list.join(","))
            }
        }
    }
}

/// Projected DOS of `channel` summed over the sites of `group`.
pub fn channel_dos(
    dos: &CompleteDos,
    structure: &Structure,
    group: &SiteGroup,
    channel: Channel,
) -> Result<Vec<f64>> {
    let mut densities = vec![0.0; dos.energies().len()];
    for site in group.sites(structure)? {
        for orbital in channel.orbitals() {
            let column = dos
                .site_orbital_dos(site, orbital)
                .ok_or(W90Error::SiteOutOfRange {
                    site,
                    num_sites: dos.num_sites(),
                })?;
            densities.add_assign(column)?;
        }
    }
    Ok(densities)
}

/// Gaussian broadening with `sigma_ev` in eV, converted to grid points.
pub fn smooth(energies: &[f64], dos: &[f64], sigma_ev: f64) -> Result<Vec<f64>> {
    if energies.len() < 2 {
        return Err(W90Error::InsufficientPoints {
            context: "DOS smoothing",
            needed: 2,
            actual: energies.len(),
        });
    }
    let emin = energies.iter().copied().fold(f64::INFINITY, f64::min);
    let emax = energies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(emax > emin) {
        return Err(W90Error::DegenerateRange(emin, emax));
    }
    let sigma_points = sigma_ev * energies.len() as f64 / (emax - emin);
    Ok(gaussian_filter1d(dos, sigma_points))
}
