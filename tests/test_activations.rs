// Tests for the sigmoid and ReLU activations.

use approx::assert_relative_eq;
use rust_autoregressive_models::utils::{relu_inplace, sigmoid, sigmoid_derivative};

// ============================================================================
// Sigmoid Tests
// ============================================================================

mod sigmoid_tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for &x in &[0.1f32, 1.0, 2.5, 7.0] {
            assert_relative_eq!(sigmoid(x) + sigmoid(-x), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_sigmoid_extreme_inputs_are_finite() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!(sigmoid(-90.0).is_finite());
    }

    #[test]
    fn test_sigmoid_derivative_from_output() {
        let s = sigmoid(0.7);
        let numerical = (sigmoid(0.7 + 1e-3) - sigmoid(0.7 - 1e-3)) / 2e-3;
        assert_relative_eq!(sigmoid_derivative(s), numerical, epsilon = 1e-3);
        assert_relative_eq!(sigmoid_derivative(0.5), 0.25);
    }
}

// ============================================================================
// ReLU Tests
// ============================================================================

mod relu_tests {
    use super::*;

    #[test]
    fn test_relu_zeroes_negatives() {
        let mut data = [-1.0, 0.0, 2.0, -0.5];
        relu_inplace(&mut data);
        assert_eq!(data, [0.0, 0.0, 2.0, 0.0]);
    }
}
