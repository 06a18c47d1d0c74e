//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// A vector or batch buffer does not have the length the model expects.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A dimension index outside `0..dimension`.
    #[error("dimension index {index} out of range for a model of dimension {dimension}")]
    IndexOutOfRange { index: usize, dimension: usize },

    /// Models need at least one dimension.
    #[error("invalid model dimension: {0}")]
    InvalidDimension(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A dataset entry that is neither 0 nor 1.
    #[error("row {row}, column {column}: expected a binary value, got {value}")]
    InvalidValue { row: usize, column: usize, value: f32 },

    /// Training produced NaN or infinite loss; the run is aborted.
    #[error("non-finite loss {loss} at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: usize, batch: usize, loss: f32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Checks that a flat `rows × dimension` buffer has the right length.
pub(crate) fn check_batch(buffer: &[f32], rows: usize, dimension: usize) -> Result<()> {
    let expected = rows * dimension;
    if buffer.len() != expected {
        return Err(ModelError::DimensionMismatch {
            expected,
            got: buffer.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_index(index: usize, dimension: usize) -> Result<()> {
    if index >= dimension {
        return Err(ModelError::IndexOutOfRange { index, dimension });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_batch_accepts_exact_length() {
        assert!(check_batch(&[0.0; 12], 3, 4).is_ok());
    }

    #[test]
    fn test_check_batch_rejects_wrong_length() {
        let err = check_batch(&[0.0; 11], 3, 4).unwrap_err();
        match err {
            ModelError::DimensionMismatch { expected, got } => {
                assert_eq!(expected, 12);
                assert_eq!(got, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_index() {
        assert!(check_index(3, 4).is_ok());
        assert!(matches!(
            check_index(4, 4),
            Err(ModelError::IndexOutOfRange { index: 4, dimension: 4 })
        ));
    }

    #[test]
    fn test_error_messages_name_the_violation() {
        let err = ModelError::NonFiniteLoss {
            epoch: 2,
            batch: 7,
            loss: f32::NAN,
        };
        assert!(err.to_string().contains("non-finite loss"));

        let err = ModelError::DimensionMismatch { expected: 8, got: 6 };
        assert_eq!(err.to_string(), "dimension mismatch: expected 8 values, got 6");
    }
}
