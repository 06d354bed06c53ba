//! Post-processing of VASP and Wannier90 outputs: energy-window
//! suggestions for disentanglement, band-structure quality of the
//! Wannier interpolation, and orbital analysis of the density of states.
pub mod compare;
pub mod config;
pub mod dos;
pub mod error;
pub mod numerics;
pub mod parser;
pub mod util;
pub mod window;

#[cfg(test)]
mod test;

pub use error::{Result, W90Error};
