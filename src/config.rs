//! Model and training configuration.
//!
//! An experiment file holds a `model` section (which conditional
//! parameterization to build) and a `training` section (how to fit it).
//!
//! # Example
//!
//! ```json
//! {
//!   "model": {
//!     "variant": "made",
//!     "dimension": 784,
//!     "hidden_units": 400,
//!     "seed": 2
//!   },
//!   "training": {
//!     "epochs": 200,
//!     "batch_size": 128,
//!     "learning_rate": 0.001,
//!     "optimizer": "adam"
//!   }
//! }
//! ```

use crate::error::{ModelError, Result};
use crate::models::ModelVariant;
use crate::optimizers::OptimizerKind;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Which model to build and its shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// "fvsbn", "nade" or "made" (or "linear", "incremental_hidden", "masked_mlp")
    pub variant: String,

    /// Length D of every observation vector
    pub dimension: usize,

    /// Hidden width H, required for "nade" and "made"
    pub hidden_units: Option<usize>,

    /// Seed of the MADE degree assignment
    pub seed: Option<u64>,

    /// Custom ordering as a permutation of `0..dimension` (default: raster order)
    pub ordering: Option<Vec<usize>>,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        let variant = ModelVariant::parse(&self.variant)?;
        if self.dimension == 0 {
            return Err(ModelError::InvalidDimension(0));
        }
        if variant.needs_hidden_units() {
            match self.hidden_units {
                None => {
                    return Err(ModelError::InvalidConfig(format!(
                        "{} model requires 'hidden_units'",
                        self.variant
                    )))
                }
                Some(0) => {
                    return Err(ModelError::InvalidConfig(
                        "hidden_units must be greater than 0".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn default_optimizer() -> String {
    "adam".to_string()
}

/// Hyperparameters of a training run.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the dataset
    pub epochs: usize,

    /// Rows per gradient step
    pub batch_size: usize,

    /// Step size passed to the optimizer
    pub learning_rate: f32,

    /// "adam" (default) or "sgd"
    #[serde(default = "default_optimizer")]
    pub optimizer: String,

    /// Seed for shuffling; clock-seeded when absent
    pub seed: Option<u64>,
}

impl TrainingConfig {
    /// Adam with no fixed seed.
    pub fn new(epochs: usize, batch_size: usize, learning_rate: f32) -> Self {
        Self {
            epochs,
            batch_size,
            learning_rate,
            optimizer: default_optimizer(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn optimizer_kind(&self) -> Result<OptimizerKind> {
        OptimizerKind::parse(&self.optimizer)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ModelError::InvalidConfig(
                "epochs must be greater than 0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ModelError::InvalidConfig(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig(
                "learning_rate must be positive".to_string(),
            ));
        }
        self.optimizer_kind()?;
        Ok(())
    }
}

/// A model together with the run that fits it.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub model: ModelConfig,
    pub training: TrainingConfig,
}

/// Loads and validates an experiment configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use rust_autoregressive_models::config::load_config;
///
/// let cfg = load_config("config/made.json").unwrap();
/// assert_eq!(cfg.model.variant, "made");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let contents = fs::read_to_string(path)?;
    let config: ExperimentConfig = serde_json::from_str(&contents)?;
    config.model.validate()?;
    config.training.validate()?;
    Ok(config)
}
