//! Named workspace registry for npzee.
//!
//! The store itself only knows directories. The registry maps short names
//! to those directories and keeps the mapping in a TOML index file under a
//! configured root. Configuration is always passed in explicitly; nothing is
//! read from the environment.

pub mod config;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, RegistryResult};
pub use registry::{Registry, WorkspaceEntry};
