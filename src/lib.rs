//! Autoregressive density estimators for binary vectors.
//!
//! Three conditional parameterizations (FVSBN, NADE and MADE) share one
//! contract, [`models::AutoregressiveModel`]: every conditional at once
//! from observed values, one dimension at a time for sampling, and loss
//! gradients for training.
//!
//! # Modules
//!
//! - `masks`: orderings, strict triangular masks and MADE degree masks
//! - `models`: the three model variants and `build_model`
//! - `loss`: clamped Bernoulli negative log-likelihood
//! - `training`: mini-batch trainer, training report and evaluation
//! - `sampling`: sequential sampler
//! - `data`: binary datasets
//! - `optimizers`: Adam and SGD
//! - `config`: JSON experiment configuration
//! - `error`: crate error type
//! - `utils`: RNG, activations and dense kernels

pub mod config;
pub mod data;
pub mod error;
pub mod loss;
pub mod masks;
pub mod models;
pub mod optimizers;
pub mod sampling;
pub mod training;
pub mod utils;

pub use error::{ModelError, Result};
