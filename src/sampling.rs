//! Ancestral sampling.
//!
//! Vectors are generated one dimension at a time in ordering order: the
//! model gives P(x_d = 1 | x_<d) for every row, a Bernoulli draw fixes x_d,
//! and the value is fed back before the next dimension. Rows are sampled
//! together, dimensions strictly in sequence.

use crate::error::Result;
use crate::models::AutoregressiveModel;
use crate::utils::SimpleRng;

/// Draws `count` independent vectors from `model`.
///
/// # Examples
///
/// ```
/// use rust_autoregressive_models::models::LinearModel;
/// use rust_autoregressive_models::sampling::sample;
/// use rust_autoregressive_models::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let model = LinearModel::new(8, &mut rng).unwrap();
/// let vectors = sample(&model, 3, &mut rng).unwrap();
/// assert_eq!(vectors.len(), 3);
/// assert!(vectors.iter().all(|v| v.len() == 8));
/// ```
pub fn sample(
    model: &dyn AutoregressiveModel,
    count: usize,
    rng: &mut SimpleRng,
) -> Result<Vec<Vec<u8>>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let d = model.dimension();
    let mut partial = vec![0.0f32; count * d];
    let mut state = model.begin_sequence(count);

    for &dim in model.ordering().as_slice() {
        let probabilities = model.predict_next_in(&state, &partial, dim)?;
        for (row, &p) in probabilities.iter().enumerate() {
            partial[row * d + dim] = f32::from(rng.bernoulli(p));
        }
        model.commit(&mut state, &partial, dim)?;
    }

    tracing::debug!(count, dimension = d, "sampled vectors");
    Ok(partial
        .chunks_exact(d)
        .map(|row| row.iter().map(|&v| v as u8).collect())
        .collect())
}
