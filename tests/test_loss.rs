//! Tests for the Bernoulli negative log-likelihood
//!
//! - Non-negativity and near-zero loss for confident correct predictions
//! - Clamping of probabilities at exactly 0 and 1
//! - Agreement between the batch loss and per-example values

use approx::assert_relative_eq;
use rust_autoregressive_models::loss::{
    bernoulli_nll, binary_cross_entropy, clamp_probability, logit_to_probability,
    logits_to_probabilities, output_deltas, per_example_nll, PROBABILITY_EPSILON,
};
use rust_autoregressive_models::utils::SimpleRng;
use rust_autoregressive_models::ModelError;

// ============================================================================
// Value Tests
// ============================================================================

mod value_tests {
    use super::*;

    #[test]
    fn test_loss_is_non_negative() {
        let mut rng = SimpleRng::new(42);
        let rows = 16;
        let d = 10;
        let targets: Vec<f32> = (0..rows * d).map(|_| f32::from(rng.bernoulli(0.5))).collect();
        let probs: Vec<f32> = (0..rows * d).map(|_| rng.next_f32()).collect();
        let loss = binary_cross_entropy(&targets, &probs, rows, d).unwrap();
        assert!(loss >= 0.0);
        assert!(per_example_nll(&targets, &probs, rows, d)
            .unwrap()
            .iter()
            .all(|&v| v >= 0.0));
    }

    #[test]
    fn test_confident_correct_is_near_zero() {
        let targets = [1.0, 0.0, 1.0, 0.0];
        let probs = [0.9999, 0.0001, 0.9999, 0.0001];
        let loss = binary_cross_entropy(&targets, &probs, 1, 4).unwrap();
        assert!(loss < 1e-3);
    }

    #[test]
    fn test_uniform_prediction_costs_log_two_per_dimension() {
        let targets = [1.0, 0.0, 0.0];
        let probs = [0.5; 3];
        let loss = binary_cross_entropy(&targets, &probs, 1, 3).unwrap();
        assert_relative_eq!(loss, 3.0 * std::f32::consts::LN_2, epsilon = 1e-5);
    }

    #[test]
    fn test_batch_loss_is_mean_of_examples() {
        let targets = [1.0, 1.0, 0.0, 1.0];
        let probs = [0.8, 0.6, 0.3, 0.9];
        let per_example = per_example_nll(&targets, &probs, 2, 2).unwrap();
        let loss = binary_cross_entropy(&targets, &probs, 2, 2).unwrap();
        assert_relative_eq!(loss, (per_example[0] + per_example[1]) / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_batch_is_zero() {
        assert_eq!(binary_cross_entropy(&[], &[], 0, 5).unwrap(), 0.0);
    }
}

// ============================================================================
// Clamping Tests
// ============================================================================

mod clamping_tests {
    use super::*;

    #[test]
    fn test_certain_wrong_prediction_is_finite() {
        let nll = bernoulli_nll(1.0, 0.0);
        assert!(nll.is_finite());
        assert_relative_eq!(nll, -PROBABILITY_EPSILON.ln(), epsilon = 1e-3);

        let nll = bernoulli_nll(0.0, 1.0);
        assert!(nll.is_finite());
    }

    #[test]
    fn test_clamp_bounds() {
        assert_eq!(clamp_probability(0.0), PROBABILITY_EPSILON);
        assert_eq!(clamp_probability(1.0), 1.0 - PROBABILITY_EPSILON);
        assert_eq!(clamp_probability(0.25), 0.25);
    }

    #[test]
    fn test_saturated_logits_are_clamped() {
        assert_eq!(logit_to_probability(30.0), 1.0 - PROBABILITY_EPSILON);
        assert_eq!(logit_to_probability(-30.0), PROBABILITY_EPSILON);
        assert!(logit_to_probability(30.0) < 1.0);
        assert_relative_eq!(logit_to_probability(0.0), 0.5);

        let mut values = [100.0, 0.0, -100.0];
        logits_to_probabilities(&mut values);
        assert!(values.iter().all(|&p| p > 0.0 && p < 1.0));
    }
}

// ============================================================================
// Gradient and Shape Tests
// ============================================================================

mod delta_tests {
    use super::*;

    #[test]
    fn test_output_deltas_are_scaled_residuals() {
        let deltas = output_deltas(&[1.0, 0.0, 0.0, 1.0], &[0.25, 0.5, 0.75, 1.0], 2);
        assert_eq!(deltas, vec![-0.375, 0.25, 0.375, 0.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let result = binary_cross_entropy(&[1.0, 0.0], &[0.5], 1, 2);
        assert!(matches!(result, Err(ModelError::DimensionMismatch { .. })));
    }
}
