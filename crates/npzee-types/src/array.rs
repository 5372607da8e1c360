use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Element type of a dense array.
///
/// Names follow the conventional numeric type names (`float64`, `int32`, ...)
/// both in `Display` and in serialized form, so they read naturally inside
/// a stored document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int8")]
    I8,
    #[serde(rename = "int16")]
    I16,
    #[serde(rename = "int32")]
    I32,
    #[serde(rename = "int64")]
    I64,
    #[serde(rename = "uint8")]
    U8,
    #[serde(rename = "uint16")]
    U16,
    #[serde(rename = "uint32")]
    U32,
    #[serde(rename = "uint64")]
    U64,
    #[serde(rename = "float32")]
    F32,
    #[serde(rename = "float64")]
    F64,
}

impl DType {
    pub const ALL: [DType; 11] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
    ];

    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Single-character kind code: `b` (bool), `i`, `u` or `f`.
    pub fn type_code(&self) -> char {
        match self {
            Self::Bool => 'b',
            Self::I8 | Self::I16 | Self::I32 | Self::I64 => 'i',
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 'u',
            Self::F32 | Self::F64 => 'f',
        }
    }

    /// Inverse of [`type_code`](Self::type_code) + [`size`](Self::size).
    pub fn from_type_code(code: char, size: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.type_code() == code && d.size() == size)
    }

    /// Parse a conventional name such as `"float64"`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|d| d.name() == name)
    }

    /// Conventional name such as `"float64"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust primitive that can live inside an [`NdArray`].
pub trait Element: Copy {
    const DTYPE: DType;

    /// Append the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decode from exactly `DTYPE.size()` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element! {
    i8 => DType::I8,
    i16 => DType::I16,
    i32 => DType::I32,
    i64 => DType::I64,
    u8 => DType::U8,
    u16 => DType::U16,
    u32 => DType::U32,
    u64 => DType::U64,
    f32 => DType::F32,
    f64 => DType::F64,
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Dense, row-major numeric array.
///
/// `data` always holds little-endian element bytes. Fields are public so
/// that callers can hand over buffers they already own; use
/// [`validate`](Self::validate) (or the typed constructors, which validate
/// for you) to check that `data` matches `shape` and `dtype`.
///
/// Equality is bit-for-bit: same dtype, same shape, same bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NdArray {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl NdArray {
    /// Build an array from raw parts without checking them.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Self {
        Self { dtype, shape, data }
    }

    /// Build a validated array from typed elements in row-major order.
    pub fn from_elements<T: Element>(shape: Vec<usize>, values: &[T]) -> Result<Self, TypeError> {
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.size());
        for v in values {
            v.write_le(&mut data);
        }
        let array = Self::new(T::DTYPE, shape, data);
        array.validate()?;
        Ok(array)
    }

    /// A one-dimensional array.
    pub fn vector<T: Element>(values: &[T]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::DTYPE.size());
        for v in values {
            v.write_le(&mut data);
        }
        Self::new(T::DTYPE, vec![values.len()], data)
    }

    /// A rank-0 array holding a single element.
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut data = Vec::with_capacity(T::DTYPE.size());
        value.write_le(&mut data);
        Self::new(T::DTYPE, Vec::new(), data)
    }

    /// A zero-filled array of the given shape.
    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Result<Self, TypeError> {
        let len = expected_len(dtype, &shape)?;
        Ok(Self::new(dtype, shape, vec![0u8; len]))
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements; a rank-0 array holds one.
    pub fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// Check the invariant `data.len() == product(shape) * dtype.size()`.
    pub fn validate(&self) -> Result<(), TypeError> {
        let expected = expected_len(self.dtype, &self.shape)?;
        if expected != self.data.len() {
            return Err(TypeError::InvalidArray {
                shape: self.shape.clone(),
                dtype: self.dtype,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Copy the elements out as `T`, which must match the array's dtype.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TypeError> {
        if T::DTYPE != self.dtype {
            return Err(TypeError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        self.validate()?;
        Ok(self
            .data
            .chunks_exact(self.dtype.size())
            .map(T::read_le)
            .collect())
    }
}

/// Byte length an array of `shape` and `dtype` must have.
pub fn expected_len(dtype: DType, shape: &[usize]) -> Result<usize, TypeError> {
    shape
        .iter()
        .try_fold(dtype.size(), |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| TypeError::ShapeOverflow(shape.to_vec()))
}
