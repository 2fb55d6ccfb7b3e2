//! Random variates for Monte Carlo posterior simulation.
//!
//! Every generator takes the random source as a parameter so callers can
//! seed it; nothing here keeps state between calls.

use std::f64::consts::PI;

use rand::Rng;
use rand::distr::{Distribution, OpenClosed01};

/// Uniform draw on (0, 1]. Keeps `ln(u)` finite.
fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    OpenClosed01.sample(rng)
}

/// Box-Muller transform. Consumes two uniforms per call and discards the
/// paired sine variate.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = uniform(rng);
    let u2 = uniform(rng);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Gamma(shape, scale) via Marsaglia & Tsang (2000).
///
/// Shapes below 1 are boosted: draw Gamma(shape + 1) and multiply by
/// `U^(1/shape)`. The boosted shape is always >= 1, so a single pass suffices.
pub fn gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, scale: f64) -> f64 {
    if shape < 1.0 {
        let boosted = marsaglia_tsang(rng, shape + 1.0);
        let u = uniform(rng);
        return boosted * u.powf(1.0 / shape) * scale;
    }
    marsaglia_tsang(rng, shape) * scale
}

/// Unit-scale Marsaglia-Tsang sampler. Requires `shape >= 1`.
fn marsaglia_tsang<R: Rng + ?Sized>(rng: &mut R, shape: f64) -> f64 {
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    // Expected iterations are close to 1 for every shape >= 1.
    loop {
        let (x, v) = loop {
            let x = standard_normal(rng);
            let v = 1.0 + c * x;
            if v > 0.0 {
                break (x, v * v * v);
            }
        };
        let u = uniform(rng);

        // Squeeze
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Beta(alpha, beta) as the ratio of two unit-scale gamma draws.
pub fn beta<R: Rng + ?Sized>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    let g1 = gamma(rng, alpha, 1.0);
    let g2 = gamma(rng, beta, 1.0);
    g1 / (g2 + g1)
}
