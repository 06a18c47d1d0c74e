//! Tests for the three conditional models
//!
//! - Autoregressive property: P(x_d | ...) never depends on x_d or on any
//!   dimension after it in the ordering
//! - `predict_next` agrees with the matching column of `predict`
//! - Shape validation and the single-dimension edge case

use approx::assert_relative_eq;
use rust_autoregressive_models::masks::Ordering;
use rust_autoregressive_models::models::{
    AutoregressiveModel, IncrementalHiddenModel, LinearModel, MaskedMlpModel,
};
use rust_autoregressive_models::utils::SimpleRng;
use rust_autoregressive_models::ModelError;

fn all_variants(ordering: &Ordering, seed: u64) -> Vec<Box<dyn AutoregressiveModel>> {
    let mut rng = SimpleRng::new(seed);
    vec![
        Box::new(LinearModel::with_ordering(ordering.clone(), &mut rng).unwrap()),
        Box::new(IncrementalHiddenModel::with_ordering(ordering.clone(), 7, &mut rng).unwrap()),
        Box::new(MaskedMlpModel::with_ordering(ordering.clone(), 24, seed, &mut rng).unwrap()),
    ]
}

fn random_binary(count: usize, rng: &mut SimpleRng) -> Vec<f32> {
    (0..count).map(|_| f32::from(rng.bernoulli(0.5))).collect()
}

// ============================================================================
// Autoregressive Property Tests
// ============================================================================

mod autoregressive_tests {
    use super::*;

    fn check_independence(ordering: Ordering) {
        let d = ordering.dimension();
        let mut rng = SimpleRng::new(77);
        for model in all_variants(&ordering, 3) {
            for _ in 0..5 {
                let x = random_binary(d, &mut rng);
                let base = model.predict(&x, 1).unwrap();
                for j in 0..d {
                    let mut flipped = x.clone();
                    flipped[j] = 1.0 - flipped[j];
                    let changed = model.predict(&flipped, 1).unwrap();
                    for out in 0..d {
                        if ordering.rank(j) >= ordering.rank(out) {
                            assert_eq!(
                                base[out],
                                changed[out],
                                "{:?}: output {out} depends on input {j}",
                                model.variant()
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_natural_ordering_independence() {
        check_independence(Ordering::natural(8));
    }

    #[test]
    fn test_permuted_ordering_independence() {
        check_independence(Ordering::from_permutation(vec![4, 1, 6, 0, 7, 2, 5, 3]).unwrap());
    }

    #[test]
    fn test_later_dimensions_do_see_earlier_ones() {
        // With random weights the last linear conditional must react to some
        // earlier dimension.
        let mut rng = SimpleRng::new(5);
        let model = LinearModel::new(6, &mut rng).unwrap();
        let x = vec![0.0; 6];
        let base = model.predict(&x, 1).unwrap();
        let mut on = x.clone();
        on[0] = 1.0;
        let changed = model.predict(&on, 1).unwrap();
        assert_ne!(base[5], changed[5]);
    }
}

// ============================================================================
// Incremental Prediction Tests
// ============================================================================

mod predict_next_tests {
    use super::*;

    #[test]
    fn test_predict_next_matches_predict() {
        let ordering = Ordering::from_permutation(vec![2, 0, 4, 1, 3]).unwrap();
        let mut rng = SimpleRng::new(12);
        let rows = 3;
        let batch = random_binary(rows * 5, &mut rng);
        for model in all_variants(&ordering, 8) {
            let full = model.predict(&batch, rows).unwrap();
            for dim in 0..5 {
                let next = model.predict_next(&batch, rows, dim).unwrap();
                assert_eq!(next.len(), rows);
                for r in 0..rows {
                    assert_relative_eq!(next[r], full[r * 5 + dim], epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_placeholders_are_ignored() {
        let mut rng = SimpleRng::new(2);
        for model in all_variants(&Ordering::natural(6), 4) {
            let mut partial = vec![1.0, 0.0, 1.0, 0.0, 0.0, 0.0];
            let a = model.predict_next(&partial, 1, 3).unwrap();
            partial[3] = 1.0;
            partial[4] = 1.0;
            partial[5] = f32::from(rng.bernoulli(0.5));
            let b = model.predict_next(&partial, 1, 3).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_probabilities_in_open_unit_interval() {
        let mut rng = SimpleRng::new(9);
        let batch = random_binary(4 * 10, &mut rng);
        for model in all_variants(&Ordering::natural(10), 1) {
            let probs = model.predict(&batch, 4).unwrap();
            assert!(probs.iter().all(|&p| p > 0.0 && p < 1.0));
        }
    }

    #[test]
    fn test_saturated_logits_stay_inside_unit_interval() {
        let mut rng = SimpleRng::new(10);
        let batch = random_binary(2 * 5, &mut rng);
        for bias in [30.0, -30.0] {
            for mut model in all_variants(&Ordering::natural(5), 1) {
                // The output bias is the last parameter tensor of every variant.
                let mut parameters = model.parameters_mut();
                let last = parameters.len() - 1;
                parameters[last].fill(bias);
                drop(parameters);

                let probs = model.predict(&batch, 2).unwrap();
                assert!(
                    probs.iter().all(|&p| p > 0.0 && p < 1.0),
                    "{:?} bias {bias}: {probs:?}",
                    model.variant()
                );
                for dim in 0..5 {
                    let next = model.predict_next(&batch, 2, dim).unwrap();
                    assert!(next.iter().all(|&p| p > 0.0 && p < 1.0));
                }
                let (loss, _) = model.loss_and_gradients(&batch, 2).unwrap();
                assert!(loss.is_finite());
            }
        }
    }
}

// ============================================================================
// Validation and Edge Case Tests
// ============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_wrong_batch_length() {
        for model in all_variants(&Ordering::natural(4), 1) {
            let result = model.predict(&[0.0; 7], 2);
            assert!(matches!(
                result,
                Err(ModelError::DimensionMismatch { expected: 8, got: 7 })
            ));
            assert!(model.loss_and_gradients(&[0.0; 3], 1).is_err());
        }
    }

    #[test]
    fn test_predict_next_index_out_of_range() {
        for model in all_variants(&Ordering::natural(4), 1) {
            let result = model.predict_next(&[0.0; 4], 1, 4);
            assert!(matches!(result, Err(ModelError::IndexOutOfRange { .. })));
        }
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut rng = SimpleRng::new(1);
        assert!(matches!(
            LinearModel::new(0, &mut rng),
            Err(ModelError::InvalidDimension(0))
        ));
        assert!(IncrementalHiddenModel::new(0, 4, &mut rng).is_err());
        assert!(MaskedMlpModel::new(0, 4, 1, &mut rng).is_err());
    }

    #[test]
    fn test_single_dimension_is_bias_only() {
        for model in all_variants(&Ordering::natural(1), 6) {
            let p0 = model.predict(&[0.0], 1).unwrap();
            let p1 = model.predict(&[1.0], 1).unwrap();
            assert_eq!(p0, p1, "{:?}", model.variant());
            assert_eq!(p0.len(), 1);
        }
    }

    #[test]
    fn test_empty_batch() {
        for model in all_variants(&Ordering::natural(3), 1) {
            assert!(model.predict(&[], 0).unwrap().is_empty());
            let (loss, grads) = model.loss_and_gradients(&[], 0).unwrap();
            assert_eq!(loss, 0.0);
            assert!(grads.iter().flatten().all(|&g| g == 0.0));
        }
    }

    #[test]
    fn test_log_likelihood_is_negative() {
        let mut rng = SimpleRng::new(3);
        let x = random_binary(6, &mut rng);
        for model in all_variants(&Ordering::natural(6), 2) {
            let ll = model.log_likelihood(&x).unwrap();
            assert!(ll < 0.0);
            assert!(ll.is_finite());
        }
    }
}
