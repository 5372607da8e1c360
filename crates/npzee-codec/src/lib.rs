//! Dense array codec for npzee.
//!
//! Arrays are stored in the NPY layout so that the files are readable by
//! the wider numeric ecosystem:
//!
//! ```text
//! \x93NUMPY  major minor  header_len  {'descr': '<i8', 'fortran_order': False, 'shape': (2, 2), }   \n  payload
//! ^ magic    ^ 1 byte ea. ^ u16/u32 LE ^ ASCII dict, space-padded so the payload starts on a 64-byte boundary
//! ```
//!
//! The payload is row-major and little-endian. Version 1.0 is written
//! (2.0 when the header outgrows a `u16`); 1.0, 2.0 and 3.0 are read.
//! Big-endian payloads are swapped to little-endian on read. Fortran order
//! is rejected for rank > 1.
//!
//! Decoding never returns a partial array: any inconsistency between the
//! header and the payload is a [`CodecError`].

pub mod codec;
pub mod error;
pub mod header;

pub use codec::{decode, encode, read_header, FILE_EXTENSION};
pub use error::{CodecError, CodecResult};
pub use header::{ArrayHeader, ByteOrder};
