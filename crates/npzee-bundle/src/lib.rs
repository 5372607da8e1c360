//! Workspace bundles.
//!
//! A bundle is a zstd-compressed tar of every regular file in a workspace
//! directory, with paths relative to the workspace root. Entries carry a
//! zero mtime and mode `0o644`, so bundling the same directory twice gives
//! the same bytes.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{BundleError, BundleResult};
pub use reader::BundleReader;
pub use writer::{BundleInfo, BundleWriter, ExportOptions};

/// Conventional bundle file extension.
pub const BUNDLE_EXTENSION: &str = "npzee.tar.zst";
