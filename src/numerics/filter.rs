use nalgebra::{DMatrix, DVector};

use crate::error::{Result, W90Error};

/// Savitzky–Golay smoothing filter with `interp` edge handling: interior
/// points get the usual convolution, the first and last `window / 2`
/// points are taken from the polynomial fitted to the first/last window.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    /// Projection onto polynomials of degree `order` over one window,
    /// dimension = (window, window). Row `window / 2` holds the
    /// convolution coefficients.
    hat: DMatrix<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self> {
        if window % 2 == 0 || window <= order {
            return Err(W90Error::InvalidFilter(format!(
                "window {window} must be odd and larger than order {order}"
            )));
        }
        let half = (window / 2) as f64;
        let vandermonde =
            DMatrix::from_fn(window, order + 1, |j, k| (j as f64 - half).powi(k as i32));
        let normal = vandermonde.transpose() * &vandermonde;
        let inverse = normal.try_inverse().ok_or_else(|| {
            W90Error::InvalidFilter(format!("singular fit for window {window}, order {order}"))
        })?;
        let hat = &vandermonde * inverse * vandermonde.transpose();
        Ok(Self { window, order, hat })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Convolution coefficients for interior points.
    pub fn coefficients(&self) -> Vec<f64> {
        self.hat.row(self.window / 2).iter().copied().collect()
    }

    pub fn apply(&self, data: &[f64]) -> Result<Vec<f64>> {
        let (n, w, half) = (data.len(), self.window, self.window / 2);
        if n < w {
            return Err(W90Error::InsufficientPoints {
                context: "Savitzky-Golay filter",
                needed: w,
                actual: n,
            });
        }
        let project = |row: usize, start: usize| -> f64 {
            self.hat
                .row(row)
                .iter()
                .zip(&data[start..start + w])
                .map(|(c, y)| c * y)
                .sum()
        };
        let mut out = Vec::with_capacity(n);
        for i in 0..half {
            out.push(project(i, 0));
        }
        for i in half..n - half {
            out.push(project(half, i - half));
        }
        for i in n - half..n {
            out.push(project(i - (n - w), n - w));
        }
        Ok(out)
    }
}

/// Gaussian smoothing of uniformly spaced data, `sigma` in points.
/// The kernel is cut at 4σ and the data is mirrored at the edges
/// (`d c b a | a b c d | d c b a`).
pub fn gaussian_filter1d(data: &[f64], sigma: f64) -> Vec<f64> {
    let n = data.len();
    if n == 0 || !(sigma > 0.0) {
        return data.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as i64;
    let kernel: DVector<f64> = DVector::from_fn(2 * radius as usize + 1, |i, _| {
        let x = i as f64 - radius as f64;
        (-0.5 * x * x / (sigma * sigma)).exp()
    });
    let kernel = &kernel / kernel.sum();
    let period = 2 * n as i64;
    let reflect = |i: i64| -> usize {
        let j = i.rem_euclid(period);
        if j >= n as i64 {
            (period - 1 - j) as usize
        } else {
            j as usize
        }
    };
    (0..n as i64)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * data[reflect(i + k as i64 - radius)])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_savgol_coefficients() {
        // Classic 5-point quadratic smoothing weights (-3, 12, 17, 12, -3) / 35
        let filter = SavitzkyGolay::new(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|c| c / 35.0);
        for (c, e) in filter.coefficients().iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_savgol_keeps_quadratics() {
        let data: Vec<f64> = (0..15).map(|i| 0.3 * (i * i) as f64 - 2.0 * i as f64 + 1.0).collect();
        let smoothed = SavitzkyGolay::new(9, 2).unwrap().apply(&data).unwrap();
        for (s, d) in smoothed.iter().zip(data.iter()) {
            assert!((s - d).abs() < 1e-9);
        }
    }

    #[test]
    fn test_savgol_removes_spike() {
        let mut data = vec![0.0; 21];
        data[10] = 1.0;
        let smoothed = SavitzkyGolay::new(9, 2).unwrap().apply(&data).unwrap();
        assert!(smoothed[10] < 0.5);
        assert!(SavitzkyGolay::new(9, 2).unwrap().apply(&data[..8]).is_err());
        assert!(SavitzkyGolay::new(8, 2).is_err());
    }

    #[test]
    fn test_gaussian_filter_preserves_constant_and_area() {
        let flat = gaussian_filter1d(&[2.0; 10], 3.0);
        assert!(flat.iter().all(|v| (v - 2.0).abs() < 1e-12));

        let mut spike = vec![0.0; 101];
        spike[50] = 1.0;
        let smoothed = gaussian_filter1d(&spike, 2.0);
        let area: f64 = smoothed.iter().sum();
        assert!((area - 1.0).abs() < 1e-12);
        assert!(smoothed[50] > smoothed[51] && smoothed[51] > smoothed[52]);
        assert!((smoothed[48] - smoothed[52]).abs() < 1e-15);
    }

    #[test]
    fn test_gaussian_filter_reflects_edges() {
        let smoothed = gaussian_filter1d(&[1.0, 0.0, 0.0], 0.5);
        // index -1 mirrors index 0, so the first point keeps more weight
        assert!(smoothed[0] > smoothed[1]);
        assert_eq!(gaussian_filter1d(&[1.0, 2.0], 0.0), vec![1.0, 2.0]);
    }
}
