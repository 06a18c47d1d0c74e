//! Vanilla stochastic gradient descent: `θ -= η * g`.

use crate::optimizers::Optimizer;

pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    /// # Examples
    ///
    /// ```
    /// use rust_autoregressive_models::optimizers::{Optimizer, SGD};
    ///
    /// let mut optimizer = SGD::new(0.1);
    /// let mut params = vec![1.0, 2.0];
    /// optimizer.update(&mut params, &[0.5, -1.0]);
    /// assert!((params[0] - 0.95).abs() < 1e-6);
    /// assert!((params[1] - 2.1).abs() < 1e-6);
    /// ```
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        for (param, grad) in parameters.iter_mut().zip(gradients) {
            *param -= self.learning_rate * grad;
        }
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
