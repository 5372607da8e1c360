//! Foundation types for npzee.
//!
//! npzee persists named, arbitrarily nested values into a directory-backed
//! workspace. This crate defines the in-memory side of that contract; every
//! other npzee crate depends on `npzee-types`.
//!
//! # Key Types
//!
//! - [`Value`]: Tagged union of everything a variable can hold
//! - [`Scalar`]: 64-bit integer or 64-bit float
//! - [`NdArray`]: Dense, row-major, little-endian numeric buffer with a shape
//! - [`DType`]: Element type of an [`NdArray`]
//! - [`VariableKind`]: On-disk representation chosen for a stored value

pub mod array;
pub mod error;
pub mod kind;
pub mod value;

pub use array::{DType, Element, NdArray};
pub use error::TypeError;
pub use kind::VariableKind;
pub use value::{Scalar, Value};
