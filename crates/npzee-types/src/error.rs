use thiserror::Error;

use crate::array::DType;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid array: shape {shape:?} of {dtype} needs {expected} bytes, buffer has {actual}")]
    InvalidArray {
        shape: Vec<usize>,
        dtype: DType,
        expected: usize,
        actual: usize,
    },

    #[error("array shape {0:?} overflows the addressable size")]
    ShapeOverflow(Vec<usize>),

    #[error("dtype mismatch: expected {expected}, got {actual}")]
    DTypeMismatch { expected: DType, actual: DType },

    #[error("not a decimal number: {0:?}")]
    InvalidScalar(String),
}
