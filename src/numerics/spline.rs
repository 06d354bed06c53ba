use crate::error::{Result, W90Error};

/// Interpolating cubic spline with not-a-knot end conditions. This is the
/// spline FITPACK builds for `s = 0`: the third derivative is continuous
/// across the second and the second-to-last knot.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(W90Error::LengthMismatch {
                context: "spline knots",
                left: x.len(),
                right: y.len(),
            });
        }
        let n = x.len();
        if n < 4 {
            return Err(W90Error::InsufficientPoints {
                context: "cubic spline",
                needed: 4,
                actual: n,
            });
        }
        if let Some(i) = (1..n).find(|&i| !(x[i] > x[i - 1])) {
            return Err(W90Error::NonIncreasingGrid {
                index: i,
                previous: x[i - 1],
                current: x[i],
            });
        }
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / h[i]).collect();

        // Unknowns M_1 .. M_{n-2}; M_0 and M_{n-1} are eliminated with the
        // not-a-knot conditions.
        let size = n - 2;
        let mut lower = vec![0.0; size];
        let mut diag = vec![0.0; size];
        let mut upper = vec![0.0; size];
        let mut rhs = vec![0.0; size];
        for row in 0..size {
            let i = row + 1;
            lower[row] = h[i - 1];
            diag[row] = 2.0 * (h[i - 1] + h[i]);
            upper[row] = h[i];
            rhs[row] = 6.0 * (slope[i] - slope[i - 1]);
        }
        // M_0 = ((h0 + h1) M_1 - h0 M_2) / h1
        let (h0, h1) = (h[0], h[1]);
        diag[0] += h0 * (h0 + h1) / h1;
        upper[0] -= h0 * h0 / h1;
        // M_{n-1} = ((ha + hb) M_{n-2} - hb M_{n-3}) / ha
        let (ha, hb) = (h[n - 3], h[n - 2]);
        diag[size - 1] += hb * (ha + hb) / ha;
        lower[size - 1] -= hb * hb / ha;

        let inner = solve_tridiagonal(&lower, &diag, &upper, &rhs);
        let mut m = Vec::with_capacity(n);
        m.push(((h0 + h1) * inner[0] - h0 * inner[1]) / h1);
        m.extend_from_slice(&inner);
        m.push(((ha + hb) * inner[size - 1] - hb * inner[size - 2]) / ha);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Value at `t`. Outside the knots the end pieces are extended.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        let i = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;
        let h = self.x[i + 1] - self.x[i];
        let (a, b) = (self.x[i + 1] - t, t - self.x[i]);
        self.m[i] * a.powi(3) / (6.0 * h)
            + self.m[i + 1] * b.powi(3) / (6.0 * h)
            + (self.y[i] / h - self.m[i] * h / 6.0) * a
            + (self.y[i + 1] / h - self.m[i + 1] * h / 6.0) * b
    }

    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Thomas algorithm. `lower[0]` and `upper[n-1]` are ignored.
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Vec<f64> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];
    c[0] = upper[0] / diag[0];
    d[0] = rhs[0] / diag[0];
    for i in 1..n {
        let denom = diag[i] - lower[i] * c[i - 1];
        c[i] = upper[i] / denom;
        d[i] = (rhs[i] - lower[i] * d[i - 1]) / denom;
    }
    let mut out = vec![0.0; n];
    out[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        out[i] = d[i] - c[i] * out[i + 1];
    }
    out
}
