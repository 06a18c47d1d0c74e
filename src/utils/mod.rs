//! Shared utilities: random number generation, activation functions and the
//! small dense-matrix kernels the models are built from.

pub mod activations;
pub mod matrix;
pub mod rng;

pub use activations::{relu_inplace, sigmoid, sigmoid_derivative};
pub use rng::SimpleRng;
