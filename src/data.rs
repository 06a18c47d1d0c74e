//! In-memory collection of binary observation vectors.

use crate::error::{ModelError, Result};

/// Intensity above which a pixel is considered "on" by [`BinaryDataset::binarize`].
pub const BINARIZE_THRESHOLD: f32 = 0.5;

/// Immutable `rows × dimension` buffer of 0.0/1.0 values.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryDataset {
    dimension: usize,
    rows: usize,
    data: Vec<f32>,
}

impl BinaryDataset {
    /// Wraps a flat row-major buffer, checking that it is binary and that its
    /// length is a multiple of `dimension`.
    pub fn new(data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(ModelError::InvalidDimension(0));
        }
        if data.len() % dimension != 0 {
            return Err(ModelError::DimensionMismatch {
                expected: (data.len() / dimension + 1) * dimension,
                got: data.len(),
            });
        }
        for (i, &value) in data.iter().enumerate() {
            if value != 0.0 && value != 1.0 {
                return Err(ModelError::InvalidValue {
                    row: i / dimension,
                    column: i % dimension,
                    value,
                });
            }
        }
        Ok(Self {
            dimension,
            rows: data.len() / dimension,
            data,
        })
    }

    /// Builds a dataset from 0/1 rows. Every row must have the same length.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let dimension = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(ModelError::DimensionMismatch {
                    expected: dimension,
                    got: row.len(),
                });
            }
            data.extend(row.iter().map(|&v| v as f32));
        }
        Self::new(data, dimension)
    }

    /// Thresholds intensities in `[0, 1]` at [`BINARIZE_THRESHOLD`].
    pub fn binarize(intensities: &[f32], dimension: usize) -> Result<Self> {
        let data = intensities
            .iter()
            .map(|&v| if v > BINARIZE_THRESHOLD { 1.0 } else { 0.0 })
            .collect();
        Self::new(data, dimension)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Copies the rows named by `indices` into `out`, batch-major.
    ///
    /// `out` must hold `indices.len() × dimension` values.
    pub fn gather_batch(&self, indices: &[usize], out: &mut [f32]) {
        for (dst, &src_index) in out.chunks_exact_mut(self.dimension).zip(indices) {
            dst.copy_from_slice(self.row(src_index));
        }
    }
}
