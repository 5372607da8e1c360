//! Directory-backed variable store for npzee.
//!
//! A [`Workspace`] is a plain directory. Every variable stored in it is a
//! small set of files named after the variable:
//!
//! | Kind | Files |
//! |---|---|
//! | array | `name.npy` |
//! | mapping / sequence | `name.dict` / `name.list` + `name.data/` |
//! | scalar | `name.numeric` |
//! | text | `name.string` |
//!
//! Composite values (mappings and sequences) are split in two by the
//! [`document`] module: a JSON document with the shape of the value, in which
//! every array leaf is replaced by a reference key, and a pool of array blobs
//! (one file per leaf) behind the [`BlobPool`] trait.
//!
//! # Design Rules
//!
//! 1. One file set per variable name and kind; a re-store rewrites it whole.
//! 2. Array references are positional: identical arrays are never merged.
//! 3. Content digests are recorded, never used to locate blobs.
//! 4. No caching: every load reads from disk.
//! 5. No locking: one writer at a time.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod document;
pub mod error;
pub mod memory;
pub mod pool;
pub mod traits;
pub mod workspace;

pub use document::{
    decode_document, encode_document, ArrayMeta, BlobCheck, CompositeDocument, DocumentMeta,
    EncodedDocument,
    ARRAYS_KEY, LIST_KEY, META_KEY,
};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobPool;
pub use pool::DirectoryBlobPool;
pub use traits::BlobPool;
pub use workspace::Workspace;
