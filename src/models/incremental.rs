//! Neural autoregressive distribution estimator (NADE).
//!
//! A hidden pre-activation `a` starts at the hidden bias `c` and is threaded
//! through the dimensions in ordering order. At the step for dimension `d`:
//!
//! ```text
//! h   = σ(a)
//! p_d = σ(h · V_d + b_d)
//! a  += x_d · W_d
//! ```
//!
//! `a` has only seen earlier dimensions when `p_d` is computed, so no mask is
//! needed. Both `W` and `V` are stored `dimension × hidden`, one row per
//! dimension.

use crate::error::{check_batch, check_index, ModelError, Result};
use crate::loss::{bernoulli_nll, logit_to_probability};
use crate::masks::Ordering;
use crate::models::{
    check_dimension, check_hidden_units, xavier_uniform, AutoregressiveModel, ModelVariant,
    SequenceState,
};
use crate::utils::matrix::dot;
use crate::utils::{sigmoid, sigmoid_derivative, SimpleRng};

pub struct IncrementalHiddenModel {
    ordering: Ordering,
    hidden_units: usize,
    /// `W`: contribution of each observed dimension to the accumulator
    input_weights: Vec<f32>,
    /// `c`
    hidden_bias: Vec<f32>,
    /// `V`: hidden-to-output weights, row `d` feeds dimension `d`
    output_weights: Vec<f32>,
    /// `b`
    output_bias: Vec<f32>,
}

impl IncrementalHiddenModel {
    pub fn new(dimension: usize, hidden_units: usize, rng: &mut SimpleRng) -> Result<Self> {
        Self::with_ordering(Ordering::natural(dimension), hidden_units, rng)
    }

    pub fn with_ordering(
        ordering: Ordering,
        hidden_units: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        let d = ordering.dimension();
        check_dimension(d)?;
        check_hidden_units(hidden_units)?;
        Ok(Self {
            ordering,
            hidden_units,
            input_weights: xavier_uniform(d * hidden_units, hidden_units, d, rng),
            hidden_bias: vec![0.0; hidden_units],
            output_weights: xavier_uniform(d * hidden_units, hidden_units, d, rng),
            output_bias: vec![0.0; d],
        })
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden_units
    }

    fn input_row(&self, d: usize) -> &[f32] {
        &self.input_weights[d * self.hidden_units..(d + 1) * self.hidden_units]
    }

    fn output_row(&self, d: usize) -> &[f32] {
        &self.output_weights[d * self.hidden_units..(d + 1) * self.hidden_units]
    }

    /// p_d from an accumulator `a`, writing σ(a) into `hidden`.
    fn conditional(&self, accumulator: &[f32], hidden: &mut [f32], d: usize) -> f32 {
        for (h, &a) in hidden.iter_mut().zip(accumulator) {
            *h = sigmoid(a);
        }
        logit_to_probability(dot(hidden, self.output_row(d)) + self.output_bias[d])
    }

    fn accumulate(&self, accumulator: &mut [f32], value: f32, d: usize) {
        if value == 0.0 {
            return;
        }
        for (a, &w) in accumulator.iter_mut().zip(self.input_row(d)) {
            *a += value * w;
        }
    }

    /// Runs the full sequence for one row. When `hiddens` is given it
    /// receives σ(a) at every step (`dimension × hidden`, in ordering order).
    fn forward_row(&self, x: &[f32], probabilities: &mut [f32], mut hiddens: Option<&mut [f32]>) {
        let h_units = self.hidden_units;
        let mut accumulator = self.hidden_bias.clone();
        let mut hidden = vec![0.0f32; h_units];

        for (step, &d) in self.ordering.as_slice().iter().enumerate() {
            probabilities[d] = self.conditional(&accumulator, &mut hidden, d);
            if let Some(store) = hiddens.as_deref_mut() {
                store[step * h_units..(step + 1) * h_units].copy_from_slice(&hidden);
            }
            self.accumulate(&mut accumulator, x[d], d);
        }
    }
}

impl AutoregressiveModel for IncrementalHiddenModel {
    fn variant(&self) -> ModelVariant {
        ModelVariant::IncrementalHidden
    }

    fn dimension(&self) -> usize {
        self.output_bias.len()
    }

    fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    fn parameter_count(&self) -> usize {
        self.input_weights.len()
            + self.hidden_bias.len()
            + self.output_weights.len()
            + self.output_bias.len()
    }

    fn predict(&self, batch: &[f32], rows: usize) -> Result<Vec<f32>> {
        let d = self.dimension();
        check_batch(batch, rows, d)?;
        let mut probabilities = vec![0.0f32; rows * d];
        for (x, p) in batch.chunks_exact(d).zip(probabilities.chunks_exact_mut(d)) {
            self.forward_row(x, p, None);
        }
        Ok(probabilities)
    }

    /// Rebuilds the accumulator from the observed prefix of each row.
    fn predict_next(&self, partial: &[f32], rows: usize, dim: usize) -> Result<Vec<f32>> {
        let d = self.dimension();
        check_batch(partial, rows, d)?;
        check_index(dim, d)?;

        let prefix = &self.ordering.as_slice()[..self.ordering.rank(dim)];
        let mut hidden = vec![0.0f32; self.hidden_units];
        Ok(partial
            .chunks_exact(d)
            .map(|x| {
                let mut accumulator = self.hidden_bias.clone();
                for &prev in prefix {
                    self.accumulate(&mut accumulator, x[prev], prev);
                }
                self.conditional(&accumulator, &mut hidden, dim)
            })
            .collect())
    }

    fn begin_sequence(&self, rows: usize) -> SequenceState {
        let accumulator = self.hidden_bias.repeat(rows);
        SequenceState::with_accumulator(rows, accumulator)
    }

    fn predict_next_in(
        &self,
        state: &SequenceState,
        partial: &[f32],
        dim: usize,
    ) -> Result<Vec<f32>> {
        let d = self.dimension();
        let rows = state.rows();
        check_batch(partial, rows, d)?;
        check_index(dim, d)?;
        check_batch(state.accumulator(), rows, self.hidden_units)?;

        let mut hidden = vec![0.0f32; self.hidden_units];
        Ok(state
            .accumulator()
            .chunks_exact(self.hidden_units)
            .map(|a| self.conditional(a, &mut hidden, dim))
            .collect())
    }

    fn commit(&self, state: &mut SequenceState, partial: &[f32], dim: usize) -> Result<()> {
        let d = self.dimension();
        let rows = state.rows();
        check_batch(partial, rows, d)?;
        check_index(dim, d)?;
        if state.accumulator().len() != rows * self.hidden_units {
            return Err(ModelError::DimensionMismatch {
                expected: rows * self.hidden_units,
                got: state.accumulator().len(),
            });
        }

        let h_units = self.hidden_units;
        for (a, x) in state
            .accumulator_mut()
            .chunks_exact_mut(h_units)
            .zip(partial.chunks_exact(d))
        {
            self.accumulate(a, x[dim], dim);
        }
        Ok(())
    }

    /// Backpropagates through the sequence in reverse ordering. `carry` is
    /// the gradient with respect to the accumulator after the current step;
    /// since `a_next = a + x_d·W_d`, it feeds both `W_d` and the accumulator
    /// before the step.
    fn loss_and_gradients(&self, batch: &[f32], rows: usize) -> Result<(f32, Vec<Vec<f32>>)> {
        let d = self.dimension();
        let h_units = self.hidden_units;
        check_batch(batch, rows, d)?;

        let mut input_grad = vec![0.0f32; d * h_units];
        let mut hidden_bias_grad = vec![0.0f32; h_units];
        let mut output_grad = vec![0.0f32; d * h_units];
        let mut output_bias_grad = vec![0.0f32; d];

        if rows == 0 {
            return Ok((0.0, vec![input_grad, hidden_bias_grad, output_grad, output_bias_grad]));
        }

        let scale = 1.0 / rows as f32;
        let mut total_nll = 0.0f32;
        let mut probabilities = vec![0.0f32; d];
        let mut hiddens = vec![0.0f32; d * h_units];
        let mut carry = vec![0.0f32; h_units];

        for x in batch.chunks_exact(d) {
            self.forward_row(x, &mut probabilities, Some(hiddens.as_mut_slice()));
            total_nll += x
                .iter()
                .zip(&probabilities)
                .map(|(&xi, &pi)| bernoulli_nll(xi, pi))
                .sum::<f32>();

            carry.fill(0.0);
            for (step, &dim) in self.ordering.as_slice().iter().enumerate().rev() {
                let delta = (probabilities[dim] - x[dim]) * scale;
                let hidden = &hiddens[step * h_units..(step + 1) * h_units];
                let v_row = self.output_row(dim);
                let row = dim * h_units..(dim + 1) * h_units;

                output_bias_grad[dim] += delta;
                for (k, (g_w, g_v)) in input_grad[row.clone()]
                    .iter_mut()
                    .zip(output_grad[row].iter_mut())
                    .enumerate()
                {
                    *g_w += x[dim] * carry[k];
                    *g_v += delta * hidden[k];
                    carry[k] += delta * v_row[k] * sigmoid_derivative(hidden[k]);
                }
            }
            for (g, c) in hidden_bias_grad.iter_mut().zip(&carry) {
                *g += c;
            }
        }

        Ok((
            total_nll * scale,
            vec![input_grad, hidden_bias_grad, output_grad, output_bias_grad],
        ))
    }

    fn parameters_mut(&mut self) -> Vec<&mut [f32]> {
        vec![
            self.input_weights.as_mut_slice(),
            self.hidden_bias.as_mut_slice(),
            self.output_weights.as_mut_slice(),
            self.output_bias.as_mut_slice(),
        ]
    }
}
