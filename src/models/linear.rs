//! Fully visible sigmoid belief network (FVSBN).
//!
//! Each dimension is a logistic regression over the raw values of the
//! dimensions before it: `p = σ((W ⊙ M)·x + b)` with `M` the strict
//! autoregressive mask.

use crate::error::{check_batch, check_index, Result};
use crate::loss::{
    binary_cross_entropy, logit_to_probability, logits_to_probabilities, output_deltas,
};
use crate::masks::{autoregressive_mask, Mask, Ordering};
use crate::models::{check_dimension, xavier_uniform, AutoregressiveModel, ModelVariant};
use crate::utils::matrix::{
    accumulate_column_sums, accumulate_outer, add_bias, dot, hadamard, matmul_transposed,
};
use crate::utils::SimpleRng;

/// # Fields
///
/// * `weights` - `dimension × dimension`, row `i` holds the weights into output `i`
/// * `biases` - one per dimension
/// * `mask` - fixed at construction
pub struct LinearModel {
    ordering: Ordering,
    mask: Mask,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl LinearModel {
    /// Raster-ordered model.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_autoregressive_models::models::{AutoregressiveModel, LinearModel};
    /// use rust_autoregressive_models::utils::SimpleRng;
    ///
    /// let model = LinearModel::new(784, &mut SimpleRng::new(42)).unwrap();
    /// assert_eq!(model.parameter_count(), 784 * 784 + 784);
    /// ```
    pub fn new(dimension: usize, rng: &mut SimpleRng) -> Result<Self> {
        Self::with_ordering(Ordering::natural(dimension), rng)
    }

    pub fn with_ordering(ordering: Ordering, rng: &mut SimpleRng) -> Result<Self> {
        let d = ordering.dimension();
        check_dimension(d)?;
        Ok(Self {
            mask: autoregressive_mask(&ordering),
            weights: xavier_uniform(d * d, d, d, rng),
            biases: vec![0.0; d],
            ordering,
        })
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    fn logits(&self, batch: &[f32], rows: usize) -> Vec<f32> {
        let d = self.dimension();
        let masked = self.mask.apply(&self.weights);
        let mut logits = vec![0.0f32; rows * d];
        matmul_transposed(batch, &masked, &mut logits, rows, d, d);
        add_bias(&mut logits, d, &self.biases);
        logits
    }
}

impl AutoregressiveModel for LinearModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::Linear
    }

    fn dimension(&self) -> usize {
        self.biases.len()
    }

    fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    fn predict(&self, batch: &[f32], rows: usize) -> Result<Vec<f32>> {
        check_batch(batch, rows, self.dimension())?;
        let mut probabilities = self.logits(batch, rows);
        logits_to_probabilities(&mut probabilities);
        Ok(probabilities)
    }

    fn predict_next(&self, partial: &[f32], rows: usize, dim: usize) -> Result<Vec<f32>> {
        let d = self.dimension();
        check_batch(partial, rows, d)?;
        check_index(dim, d)?;

        let row_range = dim * d..(dim + 1) * d;
        let masked_row = hadamard(&self.weights[row_range.clone()], &self.mask.as_slice()[row_range]);
        Ok(partial
            .chunks_exact(d)
            .map(|x| logit_to_probability(dot(x, &masked_row) + self.biases[dim]))
            .collect())
    }

    fn loss_and_gradients(&self, batch: &[f32], rows: usize) -> Result<(f32, Vec<Vec<f32>>)> {
        let d = self.dimension();
        let probabilities = self.predict(batch, rows)?;
        let loss = binary_cross_entropy(batch, &probabilities, rows, d)?;
        let delta = output_deltas(batch, &probabilities, rows);

        let mut weight_grad = vec![0.0f32; d * d];
        accumulate_outer(&delta, batch, &mut weight_grad, rows, d, d);
        self.mask.apply_inplace(&mut weight_grad);

        let mut bias_grad = vec![0.0f32; d];
        accumulate_column_sums(&delta, d, &mut bias_grad);

        Ok((loss, vec![weight_grad, bias_grad]))
    }

    fn parameters_mut(&mut self) -> Vec<&mut [f32]> {
        vec![self.weights.as_mut_slice(), self.biases.as_mut_slice()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sigmoid;

    #[test]
    fn test_linear_creation() {
        let model = LinearModel::new(10, &mut SimpleRng::new(42)).unwrap();
        assert_eq!(model.dimension(), 10);
        assert_eq!(model.weights().len(), 100);
        assert!(model.biases().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_deterministic_initialization() {
        let a = LinearModel::new(5, &mut SimpleRng::new(7)).unwrap();
        let b = LinearModel::new(5, &mut SimpleRng::new(7)).unwrap();
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(LinearModel::new(0, &mut SimpleRng::new(1)).is_err());
    }

    #[test]
    fn test_first_dimension_is_bias_only() {
        let mut model = LinearModel::new(3, &mut SimpleRng::new(1)).unwrap();
        model.biases[0] = 2.0;
        let p_a = model.predict(&[0.0, 1.0, 1.0], 1).unwrap();
        let p_b = model.predict(&[1.0, 0.0, 1.0], 1).unwrap();
        assert_eq!(p_a[0], p_b[0]);
        assert!((p_a[0] - sigmoid(2.0)).abs() < 1e-6);
    }

    #[test]
    fn test_masked_gradient_entries_are_zero() {
        let model = LinearModel::new(4, &mut SimpleRng::new(3)).unwrap();
        let batch = [1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let (_, grads) = model.loss_and_gradients(&batch, 2).unwrap();
        for i in 0..4 {
            for j in i..4 {
                assert_eq!(grads[0][i * 4 + j], 0.0);
            }
        }
    }
}
