//! Row-major dense kernels.
//!
//! All buffers are flat `f32` slices. A weight matrix that maps `inputs` to
//! `outputs` units is stored `outputs × inputs`, one row per output unit.

/// `out = x · wᵀ` for `x: rows × inputs` and `w: outputs × inputs`.
pub fn matmul_transposed(
    x: &[f32],
    w: &[f32],
    out: &mut [f32],
    rows: usize,
    inputs: usize,
    outputs: usize,
) {
    assert_eq!(x.len(), rows * inputs, "input length mismatch in matmul_transposed");
    assert_eq!(w.len(), outputs * inputs, "weight length mismatch in matmul_transposed");
    assert_eq!(out.len(), rows * outputs, "output length mismatch in matmul_transposed");
    if inputs == 0 {
        out.fill(0.0);
        return;
    }

    for (x_row, out_row) in x.chunks_exact(inputs).zip(out.chunks_exact_mut(outputs.max(1))) {
        for (value, w_row) in out_row.iter_mut().zip(w.chunks_exact(inputs)) {
            *value = dot(x_row, w_row);
        }
    }
}

/// `out = delta · w` for `delta: rows × outputs` and `w: outputs × inputs`.
/// Propagates output gradients back to the inputs of a layer.
pub fn matmul(
    delta: &[f32],
    w: &[f32],
    out: &mut [f32],
    rows: usize,
    outputs: usize,
    inputs: usize,
) {
    assert_eq!(delta.len(), rows * outputs, "delta length mismatch in matmul");
    assert_eq!(w.len(), outputs * inputs, "weight length mismatch in matmul");
    assert_eq!(out.len(), rows * inputs, "output length mismatch in matmul");
    out.fill(0.0);
    if inputs == 0 || outputs == 0 {
        return;
    }

    for (delta_row, out_row) in delta.chunks_exact(outputs).zip(out.chunks_exact_mut(inputs)) {
        for (&d, w_row) in delta_row.iter().zip(w.chunks_exact(inputs)) {
            if d == 0.0 {
                continue;
            }
            for (o, &wv) in out_row.iter_mut().zip(w_row) {
                *o += d * wv;
            }
        }
    }
}

/// `grad += deltaᵀ · x`, the weight gradient of a layer whose weights are
/// stored `outputs × inputs`.
pub fn accumulate_outer(
    delta: &[f32],
    x: &[f32],
    grad: &mut [f32],
    rows: usize,
    outputs: usize,
    inputs: usize,
) {
    assert_eq!(delta.len(), rows * outputs, "delta length mismatch in accumulate_outer");
    assert_eq!(x.len(), rows * inputs, "input length mismatch in accumulate_outer");
    assert_eq!(grad.len(), outputs * inputs, "gradient length mismatch in accumulate_outer");
    if inputs == 0 || outputs == 0 {
        return;
    }

    for (delta_row, x_row) in delta.chunks_exact(outputs).zip(x.chunks_exact(inputs)) {
        for (&d, grad_row) in delta_row.iter().zip(grad.chunks_exact_mut(inputs)) {
            if d == 0.0 {
                continue;
            }
            for (g, &xv) in grad_row.iter_mut().zip(x_row) {
                *g += d * xv;
            }
        }
    }
}

/// Adds `bias` to every row.
pub fn add_bias(data: &mut [f32], cols: usize, bias: &[f32]) {
    if cols == 0 {
        return;
    }
    for row in data.chunks_exact_mut(cols) {
        for (value, b) in row.iter_mut().zip(bias) {
            *value += *b;
        }
    }
}

/// `grad[c] += Σ_r data[r][c]`, the bias gradient.
pub fn accumulate_column_sums(data: &[f32], cols: usize, grad: &mut [f32]) {
    if cols == 0 {
        return;
    }
    for row in data.chunks_exact(cols) {
        for (g, v) in grad.iter_mut().zip(row) {
            *g += *v;
        }
    }
}

/// Elementwise product, used to mask weights before use.
pub fn hadamard(a: &[f32], b: &[f32]) -> Vec<f32> {
    assert_eq!(a.len(), b.len(), "length mismatch in hadamard");
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matmul_transposed_small() {
        // x: 2×3, w: 2×3 (two outputs)
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let w = [1.0, 0.0, -1.0, 0.5, 0.5, 0.5];
        let mut out = [0.0; 4];
        matmul_transposed(&x, &w, &mut out, 2, 3, 2);
        assert_eq!(out, [-2.0, 3.0, -2.0, 7.5]);
    }

    #[test]
    fn test_matmul_small() {
        // delta: 1×2, w: 2×3
        let delta = [1.0, 2.0];
        let w = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut out = [0.0; 3];
        matmul(&delta, &w, &mut out, 1, 2, 3);
        assert_eq!(out, [9.0, 12.0, 15.0]);
    }

    #[test]
    fn test_accumulate_outer() {
        let delta = [1.0, -1.0, 2.0, 0.0];
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut grad = [0.0; 4];
        accumulate_outer(&delta, &x, &mut grad, 2, 2, 2);
        // row0: [1, 2] * 1 + [3, 4] * 2 ; row1: [1, 2] * -1 + [3, 4] * 0
        assert_eq!(grad, [7.0, 10.0, -1.0, -2.0]);
    }

    #[test]
    fn test_bias_helpers() {
        let mut data = vec![0.0; 6];
        add_bias(&mut data, 3, &[1.0, 2.0, 3.0]);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);

        let mut grad = vec![0.0; 3];
        accumulate_column_sums(&data, 3, &mut grad);
        assert_eq!(grad, vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_zero_width_inputs() {
        let mut out = [5.0; 2];
        matmul_transposed(&[], &[], &mut out, 2, 0, 1);
        assert_eq!(out, [0.0, 0.0]);
    }
}
