//! Mini-batch training loop.
//!
//! One epoch shuffles the row indices, partitions them into contiguous
//! batches of `batch_size` (the last batch may be shorter) and takes one
//! optimizer step per batch. A NaN or infinite batch loss aborts the run
//! before the offending gradients are applied.

use crate::config::TrainingConfig;
use crate::data::BinaryDataset;
use crate::error::{ModelError, Result};
use crate::loss::binary_cross_entropy;
use crate::models::AutoregressiveModel;
use crate::optimizers::{Optimizer, OptimizerKind};
use crate::utils::SimpleRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    /// Between epochs.
    Idle,
    /// Processing a mini-batch.
    Stepping,
}

/// Mean loss and wall time of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// 1-based
    pub epoch: usize,
    pub mean_loss: f32,
    pub seconds: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    epochs: Vec<EpochSummary>,
}

impl TrainingReport {
    pub fn epochs(&self) -> &[EpochSummary] {
        &self.epochs
    }

    pub fn epoch_losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.mean_loss).collect()
    }

    pub fn final_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.mean_loss)
    }

    /// Writes one `epoch,loss,seconds` line per epoch.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for e in &self.epochs {
            writeln!(writer, "{},{},{}", e.epoch, e.mean_loss, e.seconds)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Fits a model to a dataset.
///
/// Holds one optimizer per parameter tensor; they are created on the first
/// step, once the number of tensors is known.
pub struct Trainer {
    config: TrainingConfig,
    optimizer_kind: OptimizerKind,
    optimizers: Vec<Box<dyn Optimizer>>,
    rng: SimpleRng,
    state: TrainerState,
    epochs_completed: usize,
}

impl Trainer {
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration does not validate.
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            optimizer_kind: config.optimizer_kind()?,
            rng: SimpleRng::from_optional_seed(config.seed),
            config,
            optimizers: Vec::new(),
            state: TrainerState::Idle,
            epochs_completed: 0,
        })
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// One gradient step on a batch. Returns the batch loss.
    ///
    /// `epoch` and `batch` only label a [`ModelError::NonFiniteLoss`].
    pub fn step(
        &mut self,
        model: &mut dyn AutoregressiveModel,
        batch: &[f32],
        rows: usize,
        epoch: usize,
        batch_index: usize,
    ) -> Result<f32> {
        self.state = TrainerState::Stepping;
        let result = self.step_inner(model, batch, rows, epoch, batch_index);
        self.state = TrainerState::Idle;
        result
    }

    fn step_inner(
        &mut self,
        model: &mut dyn AutoregressiveModel,
        batch: &[f32],
        rows: usize,
        epoch: usize,
        batch_index: usize,
    ) -> Result<f32> {
        let (loss, gradients) = model.loss_and_gradients(batch, rows)?;
        if !loss.is_finite() {
            tracing::error!(epoch, batch = batch_index, loss, "non-finite loss, aborting");
            return Err(ModelError::NonFiniteLoss {
                epoch,
                batch: batch_index,
                loss,
            });
        }

        if self.optimizers.len() != gradients.len() {
            self.optimizers = gradients
                .iter()
                .map(|_| self.optimizer_kind.build(self.config.learning_rate))
                .collect();
            tracing::debug!(
                tensors = self.optimizers.len(),
                learning_rate = ?self.optimizers.first().map(|o| o.learning_rate()),
                "created optimizers"
            );
        }
        model.apply_gradients(&gradients, &mut self.optimizers)?;
        Ok(loss)
    }

    /// Runs one epoch and returns its summary.
    pub fn run_epoch(
        &mut self,
        model: &mut dyn AutoregressiveModel,
        dataset: &BinaryDataset,
    ) -> Result<EpochSummary> {
        check_dataset(model, dataset)?;
        let d = dataset.dimension();
        let epoch = self.epochs_completed + 1;
        let start_time = Instant::now();

        let mut indices: Vec<usize> = (0..dataset.len()).collect();
        self.rng.shuffle(&mut indices);

        let batch_size = self.config.batch_size;
        let mut batch = vec![0.0f32; batch_size.min(dataset.len()) * d];
        let mut total_loss = 0.0f32;

        for (batch_index, chunk) in indices.chunks(batch_size).enumerate() {
            let rows = chunk.len();
            let inputs = &mut batch[..rows * d];
            dataset.gather_batch(chunk, inputs);
            let loss = self.step(model, inputs, rows, epoch, batch_index)?;
            tracing::debug!(epoch, batch = batch_index, loss, "batch done");
            // Weight by rows so the epoch mean is per example.
            total_loss += loss * rows as f32;
        }

        let summary = EpochSummary {
            epoch,
            mean_loss: total_loss / dataset.len().max(1) as f32,
            seconds: start_time.elapsed().as_secs_f32(),
        };
        self.epochs_completed = epoch;
        tracing::info!(
            epoch,
            loss = summary.mean_loss,
            seconds = summary.seconds,
            "epoch done"
        );
        Ok(summary)
    }

    /// Trains for the configured number of epochs.
    pub fn fit(
        &mut self,
        model: &mut dyn AutoregressiveModel,
        dataset: &BinaryDataset,
    ) -> Result<TrainingReport> {
        check_dataset(model, dataset)?;
        if dataset.len() < self.config.batch_size {
            tracing::warn!(
                rows = dataset.len(),
                batch_size = self.config.batch_size,
                "dataset smaller than one batch"
            );
        }

        let mut report = TrainingReport::default();
        for _ in 0..self.config.epochs {
            report.epochs.push(self.run_epoch(model, dataset)?);
        }
        Ok(report)
    }
}

fn check_dataset(model: &dyn AutoregressiveModel, dataset: &BinaryDataset) -> Result<()> {
    if dataset.dimension() != model.dimension() {
        return Err(ModelError::DimensionMismatch {
            expected: model.dimension(),
            got: dataset.dimension(),
        });
    }
    Ok(())
}

/// Trains `model` with a fresh [`Trainer`].
pub fn train(
    model: &mut dyn AutoregressiveModel,
    dataset: &BinaryDataset,
    config: &TrainingConfig,
) -> Result<TrainingReport> {
    Trainer::new(config.clone())?.fit(model, dataset)
}

/// Mean negative log-likelihood of `dataset`, evaluated in batches without
/// touching the parameters.
pub fn evaluate(
    model: &dyn AutoregressiveModel,
    dataset: &BinaryDataset,
    batch_size: usize,
) -> Result<f32> {
    check_dataset(model, dataset)?;
    if batch_size == 0 {
        return Err(ModelError::InvalidConfig(
            "batch_size must be greater than 0".to_string(),
        ));
    }
    if dataset.is_empty() {
        return Ok(0.0);
    }

    let d = dataset.dimension();
    let mut total = 0.0f32;
    for batch in dataset.as_slice().chunks(batch_size * d) {
        let rows = batch.len() / d;
        let probabilities = model.predict(batch, rows)?;
        total += binary_cross_entropy(batch, &probabilities, rows, d)? * rows as f32;
    }
    Ok(total / dataset.len() as f32)
}
