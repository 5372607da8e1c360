use npzee_types::array::expected_len;
use npzee_types::NdArray;

use crate::error::{CodecError, CodecResult};
use crate::header::{ArrayHeader, ByteOrder};

/// Extension of array blob files, without the leading dot.
pub const FILE_EXTENSION: &str = "npy";

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Encode an array into a self-describing blob.
pub fn encode(array: &NdArray) -> CodecResult<Vec<u8>> {
    array.validate()?;
    let dict = ArrayHeader::new(array.dtype, array.shape.clone()).to_dict_text();

    let (major, len_width, header_len) = match padded_header_len(dict.len(), 2) {
        len if len <= u16::MAX as usize => (1u8, 2, len),
        _ => (2u8, 4, padded_header_len(dict.len(), 4)),
    };

    let mut out = Vec::with_capacity(MAGIC.len() + 2 + len_width + header_len + array.nbytes());
    out.extend_from_slice(MAGIC);
    out.push(major);
    out.push(0);
    if len_width == 2 {
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
    } else {
        out.extend_from_slice(&(header_len as u32).to_le_bytes());
    }
    out.extend_from_slice(dict.as_bytes());
    out.resize(out.len() + header_len - dict.len() - 1, b' ');
    out.push(b'\n');
    out.extend_from_slice(&array.data);

    tracing::trace!(
        dtype = %array.dtype,
        shape = ?array.shape,
        bytes = out.len(),
        "encoded array"
    );
    Ok(out)
}

/// Decode a blob produced by [`encode`] (or by any NPY writer).
pub fn decode(bytes: &[u8]) -> CodecResult<NdArray> {
    let (header, offset) = read_header(bytes)?;
    if header.fortran_order && header.shape.len() > 1 {
        return Err(CodecError::FortranOrder);
    }

    let expected = expected_len(header.dtype, &header.shape)
        .map_err(|e| CodecError::MalformedHeader(e.to_string()))?;
    let payload = &bytes[offset..];
    if payload.len() != expected {
        return Err(CodecError::PayloadSize {
            expected,
            actual: payload.len(),
        });
    }

    let mut data = payload.to_vec();
    if header.byte_order == ByteOrder::Big {
        for element in data.chunks_exact_mut(header.dtype.size()) {
            element.reverse();
        }
    }
    Ok(NdArray::new(header.dtype, header.shape, data))
}

/// Parse only the header of a blob.
///
/// Returns the header and the offset at which the payload starts.
pub fn read_header(bytes: &[u8]) -> CodecResult<(ArrayHeader, usize)> {
    require(bytes, 8)?;
    if &bytes[..6] != MAGIC {
        return Err(CodecError::InvalidMagic {
            actual: bytes[..6].to_vec(),
        });
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, start) = match (major, minor) {
        (1, 0) => {
            require(bytes, 10)?;
            (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10)
        }
        (2, 0) | (3, 0) => {
            require(bytes, 12)?;
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        _ => return Err(CodecError::UnsupportedVersion { major, minor }),
    };

    let end = start + header_len;
    require(bytes, end)?;
    let text = std::str::from_utf8(&bytes[start..end])
        .map_err(|_| CodecError::MalformedHeader("header is not valid text".into()))?;
    Ok((ArrayHeader::parse(text)?, end))
}

fn require(bytes: &[u8], needed: usize) -> CodecResult<()> {
    if bytes.len() < needed {
        return Err(CodecError::Truncated {
            needed,
            available: bytes.len(),
        });
    }
    Ok(())
}

/// Header length (dict + padding + newline) that puts the payload on an
/// `ALIGNMENT` boundary.
fn padded_header_len(dict_len: usize, len_width: usize) -> usize {
    let unpadded = MAGIC.len() + 2 + len_width + dict_len + 1;
    let pad = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    dict_len + pad + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use npzee_types::{DType, TypeError};
    use proptest::prelude::*;

    fn int_matrix() -> NdArray {
        NdArray::from_elements(vec![2, 2], &[1i64, 2, 3, 4]).unwrap()
    }

    #[test]
    fn payload_starts_on_alignment_boundary() {
        let bytes = encode(&int_matrix()).unwrap();
        let (_, offset) = read_header(&bytes).unwrap();
        assert_eq!(offset % ALIGNMENT, 0);
        assert_eq!(bytes[offset - 1], b'\n');
        assert_eq!(bytes.len(), offset + 32);
    }

    #[test]
    fn header_text_is_standard() {
        let bytes = encode(&int_matrix()).unwrap();
        assert_eq!(&bytes[..8], b"\x93NUMPY\x01\x00");
        let (_, offset) = read_header(&bytes).unwrap();
        let text = std::str::from_utf8(&bytes[10..offset]).unwrap();
        assert!(text.starts_with("{'descr': '<i8', 'fortran_order': False, 'shape': (2, 2), }"));
        assert!(text.ends_with(" \n"));
    }

    #[test]
    fn matrix_roundtrip() {
        let a = int_matrix();
        let decoded = decode(&encode(&a).unwrap()).unwrap();
        assert_eq!(decoded, a);
        assert_eq!(decoded.to_vec::<i64>().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn float_values_survive_exactly() {
        let values = [0.1f64, -0.0, f64::MIN_POSITIVE, f64::MAX, f64::NAN, 1.0 / 3.0];
        let a = NdArray::vector(&values);
        let decoded = decode(&encode(&a).unwrap()).unwrap();
        assert_eq!(decoded.data, a.data);
    }

    #[test]
    fn encode_rejects_inconsistent_array() {
        let bad = NdArray::new(DType::F64, vec![3], vec![0u8; 16]);
        let err = encode(&bad).unwrap_err();
        assert!(matches!(err, CodecError::InvalidArray(TypeError::InvalidArray { .. })));
    }

    #[test]
    fn bad_magic() {
        let mut bytes = encode(&int_matrix()).unwrap();
        bytes[1] = b'X';
        assert!(matches!(decode(&bytes), Err(CodecError::InvalidMagic { .. })));
    }

    #[test]
    fn unsupported_version() {
        let mut bytes = encode(&int_matrix()).unwrap();
        bytes[6] = 9;
        assert!(matches!(
            decode(&bytes),
            Err(CodecError::UnsupportedVersion { major: 9, minor: 0 })
        ));
    }

    #[test]
    fn truncated_everywhere() {
        let bytes = encode(&int_matrix()).unwrap();
        for cut in [0, 3, 9, 40] {
            assert!(
                matches!(decode(&bytes[..cut]), Err(CodecError::Truncated { .. })),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn short_and_long_payloads() {
        let bytes = encode(&int_matrix()).unwrap();
        let short = &bytes[..bytes.len() - 1];
        assert!(matches!(
            decode(short),
            Err(CodecError::PayloadSize { expected: 32, actual: 31 })
        ));
        let mut long = bytes.clone();
        long.push(0);
        assert!(matches!(decode(&long), Err(CodecError::PayloadSize { .. })));
    }

    fn handmade(dict: &str, payload: &[u8]) -> Vec<u8> {
        let header_len = padded_header_len(dict.len(), 2);
        let mut out = b"\x93NUMPY\x01\x00".to_vec();
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
        out.extend_from_slice(dict.as_bytes());
        out.resize(out.len() + header_len - dict.len() - 1, b' ');
        out.push(b'\n');
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn big_endian_payload_is_swapped() {
        let bytes = handmade(
            "{'descr': '>i4', 'fortran_order': False, 'shape': (2,), }",
            &[0, 0, 0, 1, 0, 0, 1, 0],
        );
        let a = decode(&bytes).unwrap();
        assert_eq!(a.to_vec::<i32>().unwrap(), vec![1, 256]);
    }

    #[test]
    fn fortran_order_is_rejected_for_matrices() {
        let bytes = handmade(
            "{'descr': '<f8', 'fortran_order': True, 'shape': (2, 2), }",
            &[0u8; 32],
        );
        assert!(matches!(decode(&bytes), Err(CodecError::FortranOrder)));
    }

    #[test]
    fn fortran_flag_is_harmless_for_vectors() {
        let bytes = handmade(
            "{'descr': '<f8', 'fortran_order': True, 'shape': (1,), }",
            &1.5f64.to_le_bytes(),
        );
        assert_eq!(decode(&bytes).unwrap().to_vec::<f64>().unwrap(), vec![1.5]);
    }

    #[test]
    fn version_two_header_is_read() {
        let dict = "{'descr': '<u2', 'fortran_order': False, 'shape': (1,), }";
        let header_len = padded_header_len(dict.len(), 4);
        let mut bytes = b"\x93NUMPY\x02\x00".to_vec();
        bytes.extend_from_slice(&(header_len as u32).to_le_bytes());
        bytes.extend_from_slice(dict.as_bytes());
        bytes.resize(bytes.len() + header_len - dict.len() - 1, b' ');
        bytes.push(b'\n');
        bytes.extend_from_slice(&7u16.to_le_bytes());
        assert_eq!(decode(&bytes).unwrap().to_vec::<u16>().unwrap(), vec![7]);
    }

    fn arb_array() -> impl Strategy<Value = NdArray> {
        (
            proptest::sample::select(DType::ALL.to_vec()),
            proptest::collection::vec(0usize..5, 0..=3),
        )
            .prop_flat_map(|(dtype, shape)| {
                let len = dtype.size() * shape.iter().product::<usize>();
                proptest::collection::vec(any::<u8>(), len)
                    .prop_map(move |data| NdArray::new(dtype, shape.clone(), data))
            })
    }

    proptest! {
        #[test]
        fn roundtrip_is_bit_exact(array in arb_array()) {
            let decoded = decode(&encode(&array).unwrap()).unwrap();
            prop_assert_eq!(decoded, array);
        }
    }
}
