use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::W90Error;

pub const NUM_ORBITALS: usize = 9;

/// Real spherical-harmonic orbitals in the column order of `DOSCAR` and
/// `PROCAR` (`LORBIT = 11`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orbital {
    S,
    Py,
    Pz,
    Px,
    Dxy,
    Dyz,
    Dz2,
    Dxz,
    Dx2,
}

impl Orbital {
    pub const ALL: [Orbital; NUM_ORBITALS] = [
        Orbital::S,
        Orbital::Py,
        Orbital::Pz,
        Orbital::Px,
        Orbital::Dxy,
        Orbital::Dyz,
        Orbital::Dz2,
        Orbital::Dxz,
        Orbital::Dx2,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Orbital::S => "s",
            Orbital::Py => "py",
            Orbital::Pz => "pz",
            Orbital::Px => "px",
            Orbital::Dxy => "dxy",
            Orbital::Dyz => "dyz",
            Orbital::Dz2 => "dz2",
            Orbital::Dxz => "dxz",
            Orbital::Dx2 => "dx2",
        }
    }
}

impl FromStr for Orbital {
    type Err = W90Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|o| o.name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| W90Error::UnknownOrbital(s.to_string()))
    }
}

impl fmt::Display for Orbital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A whole angular-momentum shell or a single orbital of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Channel {
    S,
    P,
    D,
    Single(Orbital),
}

impl Channel {
    /// Shells in the order they are merged.
    pub const SHELLS: [Channel; 3] = [Channel::S, Channel::P, Channel::D];

    pub fn orbitals(&self) -> Vec<Orbital> {
        match self {
            Channel::S => vec![Orbital::S],
            Channel::P => vec![Orbital::Px, Orbital::Py, Orbital::Pz],
            Channel::D => vec![
                Orbital::Dxy,
                Orbital::Dyz,
                Orbital::Dxz,
                Orbital::Dx2,
                Orbital::Dz2,
            ],
            Channel::Single(o) => vec![*o],
        }
    }

    /// Wannier90 projection notation: `l=0..2` for shells, the orbital
    /// name otherwise.
    pub fn projection(&self) -> String {
        match self {
            Channel::S => "l=0".to_string(),
            Channel::P => "l=1".to_string(),
            Channel::D => "l=2".to_string(),
            Channel::Single(o) => o.name().to_string(),
        }
    }
}

impl FromStr for Channel {
    type Err = W90Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" => Ok(Channel::S),
            "p" => Ok(Channel::P),
            "d" => Ok(Channel::D),
            other => other.parse().map(Channel::Single),
        }
    }
}

impl TryFrom<String> for Channel {
    type Error = W90Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::S => f.write_str("s"),
            Channel::P => f.write_str("p"),
            Channel::D => f.write_str("d"),
            Channel::Single(o) => write!(f, "{o}"),
        }
    }
}
