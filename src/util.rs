/**
Element-wise accumulation of densities sampled on the same energy grid,
and small ordering helpers used when grouping orbitals.
*/
use crate::error::{Result, W90Error};

pub trait ElementWiseAddAssign<Rhs: ?Sized = Self> {
    /// Add `rhs` element by element, failing when the lengths differ.
    fn add_assign(&mut self, rhs: &Rhs) -> Result<()>;
}

impl ElementWiseAddAssign<[f64]> for Vec<f64> {
    fn add_assign(&mut self, rhs: &[f64]) -> Result<()> {
        if self.len() != rhs.len() {
            return Err(W90Error::LengthMismatch {
                context: "element-wise addition",
                left: self.len(),
                right: rhs.len(),
            });
        }
        self.iter_mut().zip(rhs.iter()).for_each(|(a, b)| *a += *b);
        Ok(())
    }
}

/// Distinct items in order of first appearance.
pub fn unique_in_order<T, I>(items: I) -> Vec<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
