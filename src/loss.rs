//! Negative log-likelihood of a batch under the factorized model.
//!
//! For one example the model assigns
//! `log P(x) = Σ_d [x_d·log p_d + (1 − x_d)·log(1 − p_d)]`, where `p_d` are the
//! conditionals returned by `predict`. The training loss is the
//! batch mean of `−log P(x)`.

use crate::error::{check_batch, Result};
use crate::utils::sigmoid;

/// Probabilities are clamped to `[PROBABILITY_EPSILON, 1 − PROBABILITY_EPSILON]`
/// before any logarithm.
pub const PROBABILITY_EPSILON: f32 = 1e-6;

pub fn clamp_probability(p: f32) -> f32 {
    p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

/// Sigmoid followed by [`clamp_probability`]: a conditional strictly inside
/// (0, 1) even for saturated logits.
pub fn logit_to_probability(logit: f32) -> f32 {
    clamp_probability(sigmoid(logit))
}

/// [`logit_to_probability`] applied in place.
pub fn logits_to_probabilities(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = logit_to_probability(*v);
    }
}

/// Binary cross-entropy of a single 0/1 target.
pub fn bernoulli_nll(target: f32, p: f32) -> f32 {
    let p = clamp_probability(p);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

/// `−log P(x)` for every row of the batch.
///
/// # Errors
///
/// `DimensionMismatch` if either buffer is not `rows × dimension` long.
pub fn per_example_nll(
    targets: &[f32],
    probabilities: &[f32],
    rows: usize,
    dimension: usize,
) -> Result<Vec<f32>> {
    check_batch(targets, rows, dimension)?;
    check_batch(probabilities, rows, dimension)?;
    if dimension == 0 {
        return Ok(vec![0.0; rows]);
    }

    Ok(targets
        .chunks_exact(dimension)
        .zip(probabilities.chunks_exact(dimension))
        .map(|(x, p)| x.iter().zip(p).map(|(&xi, &pi)| bernoulli_nll(xi, pi)).sum())
        .collect())
}

/// Mean over rows of the summed per-dimension binary cross-entropy.
///
/// Returns `0.0` for an empty batch.
pub fn binary_cross_entropy(
    targets: &[f32],
    probabilities: &[f32],
    rows: usize,
    dimension: usize,
) -> Result<f32> {
    let per_example = per_example_nll(targets, probabilities, rows, dimension)?;
    if rows == 0 {
        return Ok(0.0);
    }
    Ok(per_example.iter().sum::<f32>() / rows as f32)
}

/// Gradient of [`binary_cross_entropy`] with respect to each logit,
/// `(p − x) / rows`. The clamp on `p` only bites on saturated logits, where
/// the error it introduces is at most [`PROBABILITY_EPSILON`] per entry.
pub fn output_deltas(targets: &[f32], probabilities: &[f32], rows: usize) -> Vec<f32> {
    let scale = if rows == 0 { 0.0 } else { 1.0 / rows as f32 };
    targets
        .iter()
        .zip(probabilities)
        .map(|(&x, &p)| (p - x) * scale)
        .collect()
}
