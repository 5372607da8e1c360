//! Content keys for npzee.
//!
//! Two independent derivations live here:
//!
//! - [`slot_key`]: the key an array leaf is stored under inside one
//!   composite variable. It depends only on the leaf's position in the
//!   encoding pass, never on content, so byte-identical arrays at different
//!   positions always get different keys.
//! - [`content_digest`]: a fingerprint over an encoded array blob plus its
//!   shape and dtype. It is recorded next to each blob and can be used to
//!   verify it, but nothing looks blobs up by it.
//!
//! Both are built on domain-separated BLAKE3 ([`ContentHasher`]).

pub mod digest;
pub mod hasher;
pub mod keys;

pub use digest::Digest;
pub use hasher::ContentHasher;
pub use keys::{content_digest, slot_key};
