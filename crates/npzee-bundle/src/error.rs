use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("source directory does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("target directory does not exist: {0}")]
    TargetMissing(PathBuf),

    /// An entry would land outside the target directory, or is not a
    /// plain file or directory.
    #[error("unsafe bundle entry: {0}")]
    UnsafeEntry(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundleError {
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn compression(msg: impl Into<String>) -> Self {
        Self::Compression(msg.into())
    }
}

pub type BundleResult<T> = Result<T, BundleError>;
