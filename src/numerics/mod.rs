//! Numeric routines shared by the band comparison and DOS analysis.
pub mod filter;
pub mod quadrature;
pub mod spline;

pub use filter::{gaussian_filter1d, SavitzkyGolay};
pub use quadrature::fixed_quad;
pub use spline::CubicSpline;
