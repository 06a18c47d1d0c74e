//! Activation functions used by the conditional models.
//!
//! Everything is `f32`, matching the parameter precision of the models.

/// Logistic sigmoid, evaluated so that large negative inputs do not overflow
/// `exp`.
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Sigmoid derivative assuming `s = sigmoid(z)`.
pub fn sigmoid_derivative(s: f32) -> f32 {
    s * (1.0 - s)
}

/// ReLU applied in-place.
pub fn relu_inplace(data: &mut [f32]) {
    for value in data.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}
