use std::path::PathBuf;

use npzee_codec::CodecError;
use npzee_types::TypeError;

/// Errors from workspace and document operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The workspace directory does not exist.
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(PathBuf),

    /// A composite root was null.
    #[error("cannot encode an empty value as a document")]
    EmptyValue,

    /// An array's buffer does not match its shape and dtype.
    #[error("invalid array: {0}")]
    InvalidArray(TypeError),

    /// An array blob could not be decoded.
    #[error("corrupt array data in {blob}: {source}")]
    CorruptArrayData {
        blob: String,
        #[source]
        source: CodecError,
    },

    /// The side-table references a blob that is not in the pool.
    #[error("missing array blob {file} for key {key}")]
    MissingArrayBlob { key: String, file: String },

    /// The structural document is malformed.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The value cannot be stored in the requested position.
    #[error("unsupported value: {0}")]
    UnsupportedValueKind(String),

    /// The variable name cannot be used as a file name.
    #[error("invalid variable name: {0:?}")]
    InvalidName(String),

    /// A root mapping uses a key the document format reserves.
    #[error("key {0:?} is reserved by the document format")]
    ReservedKey(String),

    /// A mapping holds the same key twice.
    #[error("duplicate mapping key: {0:?}")]
    DuplicateKey(String),

    /// A scalar file does not hold a decimal number.
    #[error("corrupt scalar in {file}: {source}")]
    CorruptScalar {
        file: String,
        #[source]
        source: TypeError,
    },

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Classify a codec failure on the blob named `blob`.
    ///
    /// Encoding an inconsistent array is the caller's fault
    /// (`InvalidArray`); everything else means the bytes are bad.
    pub fn from_codec(blob: impl Into<String>, err: CodecError) -> Self {
        match err {
            CodecError::InvalidArray(e) => Self::InvalidArray(e),
            source => Self::CorruptArrayData {
                blob: blob.into(),
                source,
            },
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
