//! Connectivity masks that enforce the autoregressive ordering.
//!
//! Every conditional model computes P(x_d | dimensions before d) where
//! "before" is defined by an [`Ordering`]. Masks zero the weights that would
//! let an output see its own value or a later one:
//!
//! - [`autoregressive_mask`] (and [`strict_lower_triangular`] for raster
//!   order) is the single-layer D×D mask used by the linear model.
//! - [`DegreeMasks`] assigns integer degrees to input, hidden and output
//!   units and derives the two masks of a one-hidden-layer MADE network.
//!
//! Masks are computed once at model construction and never change.

use crate::error::{ModelError, Result};
use crate::utils::SimpleRng;

/// A permutation of `0..dimension` giving the order in which dimensions are
/// predicted and sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    order: Vec<usize>,
    rank: Vec<usize>,
}

impl Ordering {
    /// Raster order `0, 1, ..., dimension - 1`.
    pub fn natural(dimension: usize) -> Self {
        let order: Vec<usize> = (0..dimension).collect();
        Self {
            rank: order.clone(),
            order,
        }
    }

    /// Builds an ordering from an explicit permutation.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `order` is not a permutation of `0..order.len()`.
    pub fn from_permutation(order: Vec<usize>) -> Result<Self> {
        let dimension = order.len();
        let mut rank = vec![usize::MAX; dimension];
        for (position, &dim) in order.iter().enumerate() {
            if dim >= dimension {
                return Err(ModelError::InvalidConfig(format!(
                    "ordering entry {dim} out of range for dimension {dimension}"
                )));
            }
            if rank[dim] != usize::MAX {
                return Err(ModelError::InvalidConfig(format!(
                    "ordering repeats dimension {dim}"
                )));
            }
            rank[dim] = position;
        }
        Ok(Self { order, rank })
    }

    /// A uniformly random permutation.
    pub fn random(dimension: usize, rng: &mut SimpleRng) -> Self {
        let mut order: Vec<usize> = (0..dimension).collect();
        rng.shuffle(&mut order);
        let mut rank = vec![0; dimension];
        for (position, &dim) in order.iter().enumerate() {
            rank[dim] = position;
        }
        Self { order, rank }
    }

    pub fn dimension(&self) -> usize {
        self.order.len()
    }

    /// Dimensions in prediction order.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }

    /// Position of `dim` in the ordering.
    pub fn rank(&self, dim: usize) -> usize {
        self.rank[dim]
    }

    pub fn is_natural(&self) -> bool {
        self.order.iter().enumerate().all(|(i, &d)| i == d)
    }
}

/// A 0/1 matrix stored row-major as `f32` so it can be multiplied straight
/// into a weight matrix of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Mask {
    fn from_fn(rows: usize, cols: usize, allowed: impl Fn(usize, usize) -> bool) -> Self {
        let mut data = vec![0.0f32; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                if allowed(r, c) {
                    data[r * cols + c] = 1.0;
                }
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Whether row unit `r` may depend on column unit `c`.
    pub fn allows(&self, r: usize, c: usize) -> bool {
        self.data[r * self.cols + c] != 0.0
    }

    /// Number of permitted connections.
    pub fn connections(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0.0).count()
    }

    /// Elementwise product with a weight matrix of the same shape.
    pub fn apply(&self, weights: &[f32]) -> Vec<f32> {
        crate::utils::matrix::hadamard(weights, &self.data)
    }

    /// Zeros the entries of a gradient buffer that the mask forbids.
    pub fn apply_inplace(&self, values: &mut [f32]) {
        for (v, m) in values.iter_mut().zip(&self.data) {
            *v *= m;
        }
    }
}

/// D×D mask with ones strictly below the diagonal.
pub fn strict_lower_triangular(dimension: usize) -> Mask {
    Mask::from_fn(dimension, dimension, |i, j| j < i)
}

/// D×D mask: output `i` may read input `j` iff `j` comes strictly before `i`
/// in `ordering`.
pub fn autoregressive_mask(ordering: &Ordering) -> Mask {
    let d = ordering.dimension();
    Mask::from_fn(d, d, |i, j| ordering.rank(j) < ordering.rank(i))
}

/// Degree assignment and masks of a single-hidden-layer MADE network.
///
/// Input and output units get degree `rank + 1` (1..=D). Hidden units draw
/// a degree uniformly from `[1, D - 1]`. A hidden unit of degree `k` may read
/// inputs of degree `<= k` and feed outputs of degree `> k`, so output `d`
/// only ever sees inputs with a strictly smaller degree.
///
/// With `D < 2` the hidden range is empty; all hidden units get degree 1,
/// which disconnects them from the single output and leaves it bias-only.
#[derive(Debug, Clone)]
pub struct DegreeMasks {
    input_degrees: Vec<usize>,
    hidden_degrees: Vec<usize>,
    output_degrees: Vec<usize>,
    input_to_hidden: Mask,
    hidden_to_output: Mask,
}

impl DegreeMasks {
    /// Deterministic in `(ordering, hidden_units, seed)`.
    pub fn new(ordering: &Ordering, hidden_units: usize, seed: u64) -> Self {
        let d = ordering.dimension();
        let input_degrees: Vec<usize> = (0..d).map(|dim| ordering.rank(dim) + 1).collect();
        let output_degrees = input_degrees.clone();

        let mut rng = SimpleRng::new(seed);
        let max_degree = d.saturating_sub(1).max(1);
        let hidden_degrees: Vec<usize> = (0..hidden_units)
            .map(|_| rng.gen_inclusive(1, max_degree))
            .collect();

        // hidden × input
        let input_to_hidden = Mask::from_fn(hidden_units, d, |k, i| {
            input_degrees[i] <= hidden_degrees[k]
        });
        // output × hidden
        let hidden_to_output = Mask::from_fn(d, hidden_units, |o, k| {
            hidden_degrees[k] < output_degrees[o]
        });

        Self {
            input_degrees,
            hidden_degrees,
            output_degrees,
            input_to_hidden,
            hidden_to_output,
        }
    }

    pub fn input_degrees(&self) -> &[usize] {
        &self.input_degrees
    }

    pub fn hidden_degrees(&self) -> &[usize] {
        &self.hidden_degrees
    }

    pub fn output_degrees(&self) -> &[usize] {
        &self.output_degrees
    }

    /// `hidden × dimension`.
    pub fn input_to_hidden(&self) -> &Mask {
        &self.input_to_hidden
    }

    /// `dimension × hidden`.
    pub fn hidden_to_output(&self) -> &Mask {
        &self.hidden_to_output
    }

    /// Whether output `out` is connected, through any hidden unit, to input
    /// `input`.
    pub fn path_exists(&self, input: usize, out: usize) -> bool {
        (0..self.hidden_degrees.len())
            .any(|k| self.input_to_hidden.allows(k, input) && self.hidden_to_output.allows(out, k))
    }
}
