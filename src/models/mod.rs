//! Conditional parameterizations of an autoregressive density.
//!
//! Every model factorizes P(x) = Π_d P(x_d | x_<d) over an [`Ordering`] and
//! exposes the same contract through [`AutoregressiveModel`]:
//!
//! - [`LinearModel`]: one masked logistic regression per dimension (FVSBN)
//! - [`IncrementalHiddenModel`]: a hidden accumulator threaded across the
//!   dimensions (NADE)
//! - [`MaskedMlpModel`]: a one-hidden-layer network with degree masks (MADE)
//!
//! Batches are flat row-major `rows × dimension` buffers of 0.0/1.0 values.

mod incremental;
mod linear;
mod masked_mlp;

pub use incremental::IncrementalHiddenModel;
pub use linear::LinearModel;
pub use masked_mlp::MaskedMlpModel;

use crate::config::ModelConfig;
use crate::error::{ModelError, Result};
use crate::loss::per_example_nll;
use crate::masks::Ordering;
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;

/// Which of the three conditional parameterizations a model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Linear,
    IncrementalHidden,
    MaskedMlp,
}

impl ModelVariant {
    pub const NAMES: [&'static str; 3] = ["fvsbn", "nade", "made"];

    /// Accepts the short names (`fvsbn`, `nade`, `made`) or the descriptive
    /// ones (`linear`, `incremental_hidden`, `masked_mlp`).
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "fvsbn" | "linear" => Ok(Self::Linear),
            "nade" | "incremental_hidden" => Ok(Self::IncrementalHidden),
            "made" | "masked_mlp" => Ok(Self::MaskedMlp),
            other => Err(ModelError::InvalidConfig(format!(
                "unknown model variant '{}'. Must be one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }

    pub fn needs_hidden_units(self) -> bool {
        !matches!(self, Self::Linear)
    }
}

/// Per-row state carried through one sequential sampling run.
///
/// Stateless models ignore everything but `rows`. The incremental model keeps
/// its running hidden accumulator here (`rows × hidden`), so the state must be
/// advanced with [`AutoregressiveModel::commit`] for each dimension in
/// ordering order.
#[derive(Debug, Clone)]
pub struct SequenceState {
    rows: usize,
    accumulator: Vec<f32>,
}

impl SequenceState {
    pub fn stateless(rows: usize) -> Self {
        Self {
            rows,
            accumulator: Vec::new(),
        }
    }

    pub(crate) fn with_accumulator(rows: usize, accumulator: Vec<f32>) -> Self {
        Self { rows, accumulator }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn accumulator(&self) -> &[f32] {
        &self.accumulator
    }

    pub(crate) fn accumulator_mut(&mut self) -> &mut [f32] {
        &mut self.accumulator
    }
}

/// Shared contract of the three conditional models.
pub trait AutoregressiveModel {
    fn variant(&self) -> ModelVariant;

    /// Number of binary dimensions D.
    fn dimension(&self) -> usize;

    fn ordering(&self) -> &Ordering;

    /// Total number of trainable scalars.
    fn parameter_count(&self) -> usize;

    /// P(x_d = 1 | x_<d) for every row and dimension, conditioning on the
    /// observed values in `batch`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `batch.len() != rows × dimension`.
    fn predict(&self, batch: &[f32], rows: usize) -> Result<Vec<f32>>;

    /// P(x_dim = 1 | dimensions before `dim`) for every row of `partial`.
    /// Entries of `partial` at `dim` or later in the ordering are placeholders
    /// and never affect the result.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` on a malformed buffer, `IndexOutOfRange` if
    /// `dim >= dimension`.
    fn predict_next(&self, partial: &[f32], rows: usize, dim: usize) -> Result<Vec<f32>>;

    /// Starts a sequential sampling run over `rows` vectors.
    fn begin_sequence(&self, rows: usize) -> SequenceState {
        SequenceState::stateless(rows)
    }

    /// Same as [`predict_next`](Self::predict_next) but may reuse the state of
    /// an ongoing sampling run.
    fn predict_next_in(
        &self,
        state: &SequenceState,
        partial: &[f32],
        dim: usize,
    ) -> Result<Vec<f32>> {
        self.predict_next(partial, state.rows(), dim)
    }

    /// Records that `partial[.., dim]` now holds its final value.
    fn commit(&self, state: &mut SequenceState, partial: &[f32], dim: usize) -> Result<()> {
        let _ = (state, partial, dim);
        Ok(())
    }

    /// Batch negative log-likelihood and its gradient with respect to every
    /// parameter tensor, in the order of [`parameters_mut`](Self::parameters_mut).
    fn loss_and_gradients(&self, batch: &[f32], rows: usize) -> Result<(f32, Vec<Vec<f32>>)>;

    /// Mutable views of every parameter tensor.
    fn parameters_mut(&mut self) -> Vec<&mut [f32]>;

    /// Applies one optimizer step per parameter tensor.
    ///
    /// Shapes are checked for every tensor before any of them is updated.
    fn apply_gradients(
        &mut self,
        gradients: &[Vec<f32>],
        optimizers: &mut [Box<dyn Optimizer>],
    ) -> Result<()> {
        let parameters = self.parameters_mut();
        if gradients.len() != parameters.len() || optimizers.len() != parameters.len() {
            return Err(ModelError::DimensionMismatch {
                expected: parameters.len(),
                got: gradients.len().min(optimizers.len()),
            });
        }
        for (param, grad) in parameters.iter().zip(gradients) {
            if param.len() != grad.len() {
                return Err(ModelError::DimensionMismatch {
                    expected: param.len(),
                    got: grad.len(),
                });
            }
        }

        for ((param, grad), optimizer) in parameters.into_iter().zip(gradients).zip(optimizers) {
            optimizer.update(param, grad);
        }
        Ok(())
    }

    /// log P(x) of a single complete vector.
    fn log_likelihood(&self, vector: &[f32]) -> Result<f32> {
        let probabilities = self.predict(vector, 1)?;
        let nll = per_example_nll(vector, &probabilities, 1, self.dimension())?;
        Ok(-nll[0])
    }
}

/// Xavier/Glorot uniform initialization in `[-limit, limit]` with
/// `limit = sqrt(6 / (fan_in + fan_out))`.
pub(crate) fn xavier_uniform(
    count: usize,
    fan_in: usize,
    fan_out: usize,
    rng: &mut SimpleRng,
) -> Vec<f32> {
    let limit = (6.0f32 / (fan_in + fan_out).max(1) as f32).sqrt();
    (0..count).map(|_| rng.gen_range_f32(-limit, limit)).collect()
}

pub(crate) fn check_dimension(dimension: usize) -> Result<()> {
    if dimension == 0 {
        return Err(ModelError::InvalidDimension(dimension));
    }
    Ok(())
}

pub(crate) fn check_hidden_units(hidden_units: usize) -> Result<()> {
    if hidden_units == 0 {
        return Err(ModelError::InvalidConfig(
            "hidden_units must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Builds a model from its configuration.
///
/// Weights are drawn from `rng`. The MADE degree assignment uses
/// `config.seed` when present so masks are reproducible independently of
/// the initialization stream.
///
/// # Examples
///
/// ```
/// use rust_autoregressive_models::config::ModelConfig;
/// use rust_autoregressive_models::models::build_model;
/// use rust_autoregressive_models::utils::SimpleRng;
///
/// let config = ModelConfig {
///     variant: "made".to_string(),
///     dimension: 16,
///     hidden_units: Some(32),
///     seed: Some(2),
///     ordering: None,
/// };
/// let model = build_model(&config, &mut SimpleRng::new(1)).unwrap();
/// assert_eq!(model.dimension(), 16);
/// ```
pub fn build_model(
    config: &ModelConfig,
    rng: &mut SimpleRng,
) -> Result<Box<dyn AutoregressiveModel>> {
    config.validate()?;
    let variant = ModelVariant::parse(&config.variant)?;
    let ordering = match &config.ordering {
        Some(order) => {
            if order.len() != config.dimension {
                return Err(ModelError::DimensionMismatch {
                    expected: config.dimension,
                    got: order.len(),
                });
            }
            Ordering::from_permutation(order.clone())?
        }
        None => Ordering::natural(config.dimension),
    };
    let hidden_units = config.hidden_units.unwrap_or(0);

    let model: Box<dyn AutoregressiveModel> = match variant {
        ModelVariant::Linear => Box::new(LinearModel::with_ordering(ordering, rng)?),
        ModelVariant::IncrementalHidden => Box::new(IncrementalHiddenModel::with_ordering(
            ordering,
            hidden_units,
            rng,
        )?),
        ModelVariant::MaskedMlp => {
            let seed = config.seed.unwrap_or_else(|| u64::from(rng.next_u32()));
            Box::new(MaskedMlpModel::with_ordering(ordering, hidden_units, seed, rng)?)
        }
    };

    tracing::debug!(
        variant = ?variant,
        dimension = model.dimension(),
        parameters = model.parameter_count(),
        "built model"
    );
    Ok(model)
}
