//! Gradient-based parameter updates.
//!
//! Every model exposes its parameters as a list of flat tensors (weight
//! matrices and bias vectors). The trainer keeps one optimizer instance per
//! tensor, so stateful optimizers such as Adam track moments for exactly one
//! tensor each.
//!
//! # Available Optimizers
//!
//! - [`Adam`]: adaptive per-parameter learning rates (default)
//! - [`SGD`]: plain gradient descent

pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::SGD;

use crate::error::{ModelError, Result};

/// Core trait for optimizers.
pub trait Optimizer {
    /// Update `parameters` in place from `gradients` of the same length.
    ///
    /// # Panics
    ///
    /// Implementations panic if the two slices have different lengths.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]);

    fn learning_rate(&self) -> f32;
}

/// Optimizer selected by name in a training config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub const NAMES: [&'static str; 2] = ["adam", "sgd"];

    /// Parses `"adam"` or `"sgd"` (case-insensitive).
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "adam" => Ok(Self::Adam),
            "sgd" => Ok(Self::Sgd),
            other => Err(ModelError::InvalidConfig(format!(
                "unknown optimizer '{}'. Must be one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }

    /// A fresh optimizer of this kind.
    pub fn build(self, learning_rate: f32) -> Box<dyn Optimizer> {
        match self {
            Self::Adam => Box::new(Adam::with_learning_rate(learning_rate)),
            Self::Sgd => Box::new(SGD::new(learning_rate)),
        }
    }
}
