//! Readers for the text outputs of VASP and Wannier90.
pub mod band_dat;
pub mod doscar;
pub mod eigenval;
pub mod general;
pub mod kpoints;
pub mod poscar;
pub mod vasprun;
pub mod wannier90;
