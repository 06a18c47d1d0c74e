//! Masked autoencoder for distribution estimation (MADE), one hidden layer.
//!
//! ```text
//! h = ReLU((W1 ⊙ M1) · x + b1)
//! p = σ((W2 ⊙ M2) · h + b2)
//! ```
//!
//! `M1`/`M2` come from [`DegreeMasks`]; all conditionals are produced in a
//! single pass.

use crate::error::{check_batch, check_index, Result};
use crate::loss::{
    binary_cross_entropy, logit_to_probability, logits_to_probabilities, output_deltas,
};
use crate::masks::{DegreeMasks, Ordering};
use crate::models::{
    check_dimension, check_hidden_units, xavier_uniform, AutoregressiveModel, ModelVariant,
};
use crate::utils::matrix::{
    accumulate_column_sums, accumulate_outer, add_bias, dot, matmul, matmul_transposed,
};
use crate::utils::{relu_inplace, SimpleRng};

/// Intermediate activations kept for the backward pass.
struct Activations {
    pre_hidden: Vec<f32>,
    hidden: Vec<f32>,
    probabilities: Vec<f32>,
}

pub struct MaskedMlpModel {
    ordering: Ordering,
    hidden_units: usize,
    seed: u64,
    masks: DegreeMasks,
    /// `hidden × dimension`
    hidden_weights: Vec<f32>,
    hidden_bias: Vec<f32>,
    /// `dimension × hidden`
    output_weights: Vec<f32>,
    output_bias: Vec<f32>,
}

impl MaskedMlpModel {
    /// `seed` drives the hidden degree assignment only; weights come from
    /// `rng`.
    pub fn new(
        dimension: usize,
        hidden_units: usize,
        seed: u64,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        Self::with_ordering(Ordering::natural(dimension), hidden_units, seed, rng)
    }

    pub fn with_ordering(
        ordering: Ordering,
        hidden_units: usize,
        seed: u64,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        let d = ordering.dimension();
        check_dimension(d)?;
        check_hidden_units(hidden_units)?;
        if d < 2 {
            tracing::debug!(dimension = d, "degenerate ordering, output is bias-only");
        }
        Ok(Self {
            masks: DegreeMasks::new(&ordering, hidden_units, seed),
            ordering,
            hidden_units,
            seed,
            hidden_weights: xavier_uniform(hidden_units * d, d, hidden_units, rng),
            hidden_bias: vec![0.0; hidden_units],
            output_weights: xavier_uniform(d * hidden_units, hidden_units, d, rng),
            output_bias: vec![0.0; d],
        })
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden_units
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn masks(&self) -> &DegreeMasks {
        &self.masks
    }

    /// Pre-activations and ReLU outputs of the hidden layer.
    fn hidden_layer(&self, batch: &[f32], rows: usize) -> (Vec<f32>, Vec<f32>) {
        let d = self.dimension();
        let masked = self.masks.input_to_hidden().apply(&self.hidden_weights);
        let mut pre_hidden = vec![0.0f32; rows * self.hidden_units];
        matmul_transposed(batch, &masked, &mut pre_hidden, rows, d, self.hidden_units);
        add_bias(&mut pre_hidden, self.hidden_units, &self.hidden_bias);

        let mut hidden = pre_hidden.clone();
        relu_inplace(&mut hidden);
        (pre_hidden, hidden)
    }

    fn forward(&self, batch: &[f32], rows: usize) -> Activations {
        let d = self.dimension();
        let (pre_hidden, hidden) = self.hidden_layer(batch, rows);

        let masked = self.masks.hidden_to_output().apply(&self.output_weights);
        let mut probabilities = vec![0.0f32; rows * d];
        matmul_transposed(&hidden, &masked, &mut probabilities, rows, self.hidden_units, d);
        add_bias(&mut probabilities, d, &self.output_bias);
        logits_to_probabilities(&mut probabilities);

        Activations {
            pre_hidden,
            hidden,
            probabilities,
        }
    }
}

impl AutoregressiveModel for MaskedMlpModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::MaskedMlp
    }

    fn dimension(&self) -> usize {
        self.output_bias.len()
    }

    fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    fn parameter_count(&self) -> usize {
        self.hidden_weights.len()
            + self.hidden_bias.len()
            + self.output_weights.len()
            + self.output_bias.len()
    }

    fn predict(&self, batch: &[f32], rows: usize) -> Result<Vec<f32>> {
        check_batch(batch, rows, self.dimension())?;
        Ok(self.forward(batch, rows).probabilities)
    }

    /// Computes the whole hidden layer but only the requested output unit.
    fn predict_next(&self, partial: &[f32], rows: usize, dim: usize) -> Result<Vec<f32>> {
        let d = self.dimension();
        check_batch(partial, rows, d)?;
        check_index(dim, d)?;

        let (_, hidden) = self.hidden_layer(partial, rows);
        let h_units = self.hidden_units;
        let row = dim * h_units..(dim + 1) * h_units;
        let mask_row = &self.masks.hidden_to_output().as_slice()[row.clone()];
        let masked_row: Vec<f32> = self.output_weights[row]
            .iter()
            .zip(mask_row)
            .map(|(w, m)| w * m)
            .collect();

        Ok(hidden
            .chunks_exact(h_units)
            .map(|h| logit_to_probability(dot(h, &masked_row) + self.output_bias[dim]))
            .collect())
    }

    fn loss_and_gradients(&self, batch: &[f32], rows: usize) -> Result<(f32, Vec<Vec<f32>>)> {
        let d = self.dimension();
        let h_units = self.hidden_units;
        check_batch(batch, rows, d)?;

        let acts = self.forward(batch, rows);
        let loss = binary_cross_entropy(batch, &acts.probabilities, rows, d)?;
        let delta_out = output_deltas(batch, &acts.probabilities, rows);

        // Output layer.
        let mut output_grad = vec![0.0f32; d * h_units];
        accumulate_outer(&delta_out, &acts.hidden, &mut output_grad, rows, d, h_units);
        self.masks.hidden_to_output().apply_inplace(&mut output_grad);
        let mut output_bias_grad = vec![0.0f32; d];
        accumulate_column_sums(&delta_out, d, &mut output_bias_grad);

        // Back through the masked output weights and the ReLU.
        let masked_out = self.masks.hidden_to_output().apply(&self.output_weights);
        let mut delta_hidden = vec![0.0f32; rows * h_units];
        matmul(&delta_out, &masked_out, &mut delta_hidden, rows, d, h_units);
        for (g, &z) in delta_hidden.iter_mut().zip(&acts.pre_hidden) {
            if z <= 0.0 {
                *g = 0.0;
            }
        }

        // Hidden layer.
        let mut hidden_grad = vec![0.0f32; h_units * d];
        accumulate_outer(&delta_hidden, batch, &mut hidden_grad, rows, h_units, d);
        self.masks.input_to_hidden().apply_inplace(&mut hidden_grad);
        let mut hidden_bias_grad = vec![0.0f32; h_units];
        accumulate_column_sums(&delta_hidden, h_units, &mut hidden_bias_grad);

        Ok((
            loss,
            vec![hidden_grad, hidden_bias_grad, output_grad, output_bias_grad],
        ))
    }

    fn parameters_mut(&mut self) -> Vec<&mut [f32]> {
        vec![
            self.hidden_weights.as_mut_slice(),
            self.hidden_bias.as_mut_slice(),
            self.output_weights.as_mut_slice(),
            self.output_bias.as_mut_slice(),
        ]
    }
}
