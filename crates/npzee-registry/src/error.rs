use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("workspace not registered: {0}")]
    NotRegistered(String),

    #[error("workspace already registered: {0}")]
    AlreadyRegistered(String),

    #[error("directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("invalid workspace name: {0:?}")]
    InvalidName(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] npzee_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
