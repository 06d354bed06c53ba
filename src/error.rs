use std::path::{Path, PathBuf};

use ndarray_stats::errors::MinMaxError;

/// Errors raised while reading VASP/Wannier90 outputs or deriving
/// diagnostics from them.
#[derive(Debug, thiserror::Error)]
pub enum W90Error {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("{context} requires at least {needed} points, got {actual}")]
    InsufficientPoints {
        context: &'static str,
        needed: usize,
        actual: usize,
    },
    #[error("length mismatch in {context}: {left} vs {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },
    #[error("grid must be strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingGrid {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("invalid number of Wannier functions: {0}")]
    InvalidNumWann(usize),
    #[error("{wannier} Wannier90 bands cannot be matched against {vasp} VASP bands")]
    BandCountMismatch { vasp: usize, wannier: usize },
    #[error("cannot build disentanglement windows: {nbands} bands, {num_wann} WFs, {n_excl} excluded")]
    NoWindowChoice {
        nbands: usize,
        num_wann: usize,
        n_excl: usize,
    },
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid kernel `{0}`, expected `type,mid,width` with type unit or gaussian")]
    InvalidKernel(String),
    #[error("invalid orbital selection `{0}`")]
    InvalidSelection(String),
    #[error("unknown orbital `{0}`")]
    UnknownOrbital(String),
    #[error("site {site} is out of range for a structure with {num_sites} sites")]
    SiteOutOfRange { site: usize, num_sites: usize },
    #[error("no Fermi level found in `{0}`")]
    MissingFermiLevel(PathBuf),
    #[error("degenerate energy range [{0}, {1}]")]
    DegenerateRange(f64, f64),
    #[error(transparent)]
    MinMax(#[from] MinMaxError),
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, W90Error>;

impl W90Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }
}

/// Read a whole text file, keeping the path in the error.
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    std::fs::read_to_string(path.as_ref()).map_err(|e| W90Error::io(path, e))
}
