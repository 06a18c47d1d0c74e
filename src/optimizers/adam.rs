//! Adam (Adaptive Moment Estimation) optimizer.

use crate::optimizers::Optimizer;

/// Adam with bias-corrected first and second moment estimates:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * g
/// v_t = β2 * v_{t-1} + (1 - β2) * g²
/// θ  -= α * (m_t / (1 - β1^t)) / (√(v_t / (1 - β2^t)) + ε)
/// ```
///
/// One instance tracks the moments of one parameter tensor.
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// First moment estimates
    m: Vec<f32>,
    /// Second moment estimates
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    pub const DEFAULT_BETA1: f32 = 0.9;
    pub const DEFAULT_BETA2: f32 = 0.999;
    pub const DEFAULT_EPSILON: f32 = 1e-8;

    /// # Examples
    ///
    /// ```
    /// use rust_autoregressive_models::optimizers::{Adam, Optimizer};
    ///
    /// let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
    /// assert_eq!(optimizer.learning_rate(), 0.001);
    /// ```
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Adam with the paper's default β1, β2 and ε.
    pub fn with_learning_rate(learning_rate: f32) -> Self {
        Self::new(
            learning_rate,
            Self::DEFAULT_BETA1,
            Self::DEFAULT_BETA2,
            Self::DEFAULT_EPSILON,
        )
    }
}

impl Optimizer for Adam {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        if self.m.len() != parameters.len() {
            self.m = vec![0.0; parameters.len()];
            self.v = vec![0.0; parameters.len()];
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t);

        for ((param, &grad), (m, v)) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;
            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}
