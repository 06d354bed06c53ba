const GAUSS_LEGENDRE_5: [(f64, f64); 5] = [
    (-0.906_179_845_938_664, 0.236_926_885_056_189_1),
    (-0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (0.0, 0.568_888_888_888_888_9),
    (0.538_469_310_105_683_1, 0.478_628_670_499_366_5),
    (0.906_179_845_938_664, 0.236_926_885_056_189_1),
];

/// Fixed-order (5 point) Gauss–Legendre integral of `f` over `[a, b]`.
pub fn fixed_quad<F>(f: F, a: f64, b: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let half = (b - a) / 2.0;
    GAUSS_LEGENDRE_5
        .iter()
        .map(|&(x, w)| w * f(half * (x + 1.0) + a))
        .sum::<f64>()
        * half
}
