mod normal;
mod variate;

pub use normal::{FALLBACK_Z, lookup_z, normal_cdf, z_score_for};
pub use variate::{beta, gamma, standard_normal};

pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

pub fn variance(data: &[f64]) -> f64 {
    let m = mean(data);
    data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Empirical percentile of an ascending slice: the element at
/// `floor(q * len)`, no interpolation. `q` is a fraction in [0, 1).
///
/// Panics on an empty slice.
pub fn percentile_at(sorted: &[f64], q: f64) -> f64 {
    let idx = (sorted.len() as f64 * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
