use npzee_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid array magic: expected \\x93NUMPY, got {actual:?}")]
    InvalidMagic { actual: Vec<u8> },

    #[error("unsupported array format version: {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("truncated array data: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("malformed array header: {0}")]
    MalformedHeader(String),

    #[error("unsupported element type descriptor: {0:?}")]
    UnsupportedDescr(String),

    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("payload size mismatch: header implies {expected} bytes, found {actual}")]
    PayloadSize { expected: usize, actual: usize },

    #[error(transparent)]
    InvalidArray(#[from] TypeError),
}

pub type CodecResult<T> = Result<T, CodecError>;
