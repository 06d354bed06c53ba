use std::{fmt, str::FromStr};

use crate::error::W90Error;

/// Energy weighting used when scoring band agreement. `mid` and `width`
/// are in eV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// 1 inside `|E - mid| < width`, 0 elsewhere
    Unit { mid: f64, width: f64 },
    /// `exp(-((E - mid) / width)^2 / 2)`
    Gaussian { mid: f64, width: f64 },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Unit {
            mid: 2.0,
            width: 5.0,
        }
    }
}

impl Kernel {
    pub fn weight(&self, energy: f64) -> f64 {
        match *self {
            Kernel::Unit { mid, width } => {
                if (energy - mid).abs() < width {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::Gaussian { mid, width } => (-((energy - mid) / width).powi(2) / 2.0).exp(),
        }
    }
}

/// `type,mid,width`, where only the first letter of `type` matters
/// (`u`nit or `g`aussian).
impl FromStr for Kernel {
    type Err = W90Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || W90Error::InvalidKernel(s.to_string());
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        let [kind, mid, width] = fields.as_slice() else {
            return Err(invalid());
        };
        let mid: f64 = mid.parse().map_err(|_| invalid())?;
        let width: f64 = width.parse().map_err(|_| invalid())?;
        match kind.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('u') => Ok(Kernel::Unit { mid, width }),
            Some('g') => Ok(Kernel::Gaussian { mid, width }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kernel::Unit { mid, width } => write!(f, "unit,{mid},{width}"),
            Kernel::Gaussian { mid, width } => write!(f, "gaussian,{mid},{width}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_kernel() {
        assert_eq!("unit,2,5".parse::<Kernel>().unwrap(), Kernel::default());
        assert_eq!(
            "Gauss, -1.5, 0.5".parse::<Kernel>().unwrap(),
            Kernel::Gaussian {
                mid: -1.5,
                width: 0.5
            }
        );
        assert!("box,2,5".parse::<Kernel>().is_err());
        assert!("unit,2".parse::<Kernel>().is_err());
        assert!("unit,a,5".parse::<Kernel>().is_err());
    }

    #[test]
    fn test_kernel_weight() {
        let unit = Kernel::default();
        assert_eq!(unit.weight(2.0), 1.0);
        assert_eq!(unit.weight(-2.9), 1.0);
        assert_eq!(unit.weight(-3.0), 0.0);
        let gauss = Kernel::Gaussian {
            mid: 0.0,
            width: 1.0,
        };
        assert_eq!(gauss.weight(0.0), 1.0);
        assert!((gauss.weight(1.0) - (-0.5f64).exp()).abs() < 1e-15);
    }
}
