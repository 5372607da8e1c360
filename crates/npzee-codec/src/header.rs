use npzee_types::DType;

use crate::error::{CodecError, CodecResult};

/// Byte order of the payload as declared by the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
    /// Single-byte elements (`|` in the descriptor).
    NotApplicable,
}

/// Parsed array header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayHeader {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub byte_order: ByteOrder,
    pub fortran_order: bool,
}

impl ArrayHeader {
    /// Header for a little-endian, C-ordered array.
    pub fn new(dtype: DType, shape: Vec<usize>) -> Self {
        let byte_order = if dtype.size() == 1 {
            ByteOrder::NotApplicable
        } else {
            ByteOrder::Little
        };
        Self {
            dtype,
            shape,
            byte_order,
            fortran_order: false,
        }
    }

    /// Type descriptor string, e.g. `<f8` or `|u1`.
    pub fn descr(&self) -> String {
        let order = match self.byte_order {
            ByteOrder::Little => '<',
            ByteOrder::Big => '>',
            ByteOrder::NotApplicable => '|',
        };
        format!("{order}{}{}", self.dtype.type_code(), self.dtype.size())
    }

    /// The dictionary text, without padding or terminating newline.
    pub fn to_dict_text(&self) -> String {
        let shape = match self.shape.as_slice() {
            [] => "()".to_string(),
            [only] => format!("({only},)"),
            dims => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                format!("({})", parts.join(", "))
            }
        };
        let fortran = if self.fortran_order { "True" } else { "False" };
        format!(
            "{{'descr': '{}', 'fortran_order': {fortran}, 'shape': {shape}, }}",
            self.descr()
        )
    }

    /// Parse the dictionary text (padding and newline allowed).
    pub fn parse(text: &str) -> CodecResult<Self> {
        let mut cursor = Cursor::new(text.as_bytes());
        let mut descr = None;
        let mut fortran_order = None;
        let mut shape = None;

        cursor.skip_ws();
        cursor.expect(b'{')?;
        loop {
            cursor.skip_ws();
            if cursor.peek() == Some(b'}') {
                break;
            }
            let key = cursor.string()?;
            cursor.skip_ws();
            cursor.expect(b':')?;
            cursor.skip_ws();
            let duplicate = match key.as_str() {
                "descr" => descr.replace(cursor.string()?).is_some(),
                "fortran_order" => fortran_order.replace(cursor.boolean()?).is_some(),
                "shape" => shape.replace(cursor.tuple()?).is_some(),
                other => return Err(malformed(format!("unexpected key {other:?}"))),
            };
            if duplicate {
                return Err(malformed(format!("duplicate key {key:?}")));
            }
            cursor.skip_ws();
            match cursor.peek() {
                Some(b',') => cursor.advance(),
                Some(b'}') => break,
                _ => return Err(malformed(format!("expected ',' or '}}' at {}", cursor.pos))),
            }
        }
        cursor.expect(b'}')?;
        cursor.skip_ws();
        if !cursor.at_end() {
            return Err(malformed("trailing characters after header dictionary"));
        }

        let descr = descr.ok_or_else(|| malformed("missing 'descr'"))?;
        let (dtype, byte_order) = parse_descr(&descr)?;
        Ok(Self {
            dtype,
            shape: shape.ok_or_else(|| malformed("missing 'shape'"))?,
            byte_order,
            fortran_order: fortran_order.ok_or_else(|| malformed("missing 'fortran_order'"))?,
        })
    }
}

fn parse_descr(descr: &str) -> CodecResult<(DType, ByteOrder)> {
    let unsupported = || CodecError::UnsupportedDescr(descr.to_string());
    let mut chars = descr.chars();
    let (order, code) = match chars.next() {
        Some('<') | Some('=') => (Some(ByteOrder::Little), chars.next()),
        Some('>') => (Some(ByteOrder::Big), chars.next()),
        Some('|') => (Some(ByteOrder::NotApplicable), chars.next()),
        other => (None, other),
    };
    let code = code.ok_or_else(unsupported)?;
    let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;
    let dtype = DType::from_type_code(code, size).ok_or_else(unsupported)?;
    let order = match order {
        _ if size == 1 => ByteOrder::NotApplicable,
        Some(ByteOrder::NotApplicable) | None => ByteOrder::Little,
        Some(o) => o,
    };
    Ok((dtype, order))
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedHeader(reason.into())
}

/// Byte cursor over the header dictionary.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> CodecResult<()> {
        if self.peek() != Some(byte) {
            return Err(malformed(format!(
                "expected {:?} at {}",
                byte as char, self.pos
            )));
        }
        self.pos += 1;
        Ok(())
    }

    fn string(&mut self) -> CodecResult<String> {
        let quote = match self.peek() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(malformed(format!("expected string at {}", self.pos))),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let s = std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| malformed("non-UTF-8 string"))?
                    .to_string();
                self.pos += 1;
                return Ok(s);
            }
            self.pos += 1;
        }
        Err(malformed("unterminated string"))
    }

    fn boolean(&mut self) -> CodecResult<bool> {
        let rest = &self.bytes[self.pos..];
        if rest.starts_with(b"True") {
            self.pos += 4;
            Ok(true)
        } else if rest.starts_with(b"False") {
            self.pos += 5;
            Ok(false)
        } else {
            Err(malformed(format!("expected True or False at {}", self.pos)))
        }
    }

    fn integer(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        // Python 2 era writers emit long literals such as `3L`.
        let digits = &self.bytes[start..self.pos];
        if self.peek() == Some(b'L') {
            self.pos += 1;
        }
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| malformed(format!("expected dimension at {start}")))
    }

    fn tuple(&mut self) -> CodecResult<Vec<usize>> {
        self.expect(b'(')?;
        let mut dims = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b')') {
                break;
            }
            dims.push(self.integer()?);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.advance(),
                Some(b')') => break,
                _ => return Err(malformed(format!("expected ',' or ')' at {}", self.pos))),
            }
        }
        self.expect(b')')?;
        Ok(dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dict_text_for_each_rank() {
        assert_eq!(
            ArrayHeader::new(DType::F64, vec![]).to_dict_text(),
            "{'descr': '<f8', 'fortran_order': False, 'shape': (), }"
        );
        assert_eq!(
            ArrayHeader::new(DType::I32, vec![3]).to_dict_text(),
            "{'descr': '<i4', 'fortran_order': False, 'shape': (3,), }"
        );
        assert_eq!(
            ArrayHeader::new(DType::U8, vec![2, 3, 4]).to_dict_text(),
            "{'descr': '|u1', 'fortran_order': False, 'shape': (2, 3, 4), }"
        );
    }

    #[test]
    fn parse_what_we_write() {
        let header = ArrayHeader::new(DType::I64, vec![2, 2]);
        let parsed = ArrayHeader::parse(&header.to_dict_text()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn parse_tolerates_reordering_padding_and_double_quotes() {
        let text = "{\"shape\": (5, ), 'fortran_order': False, 'descr': '<f4'}      \n";
        let parsed = ArrayHeader::parse(text).unwrap();
        assert_eq!(parsed.dtype, DType::F32);
        assert_eq!(parsed.shape, vec![5]);
    }

    #[test]
    fn parse_big_endian_descr() {
        let parsed =
            ArrayHeader::parse("{'descr': '>i8', 'fortran_order': False, 'shape': (1,), }")
                .unwrap();
        assert_eq!(parsed.byte_order, ByteOrder::Big);
        assert_eq!(parsed.dtype, DType::I64);
    }

    #[test]
    fn parse_bool_descr() {
        let parsed =
            ArrayHeader::parse("{'descr': '|b1', 'fortran_order': False, 'shape': (4,), }")
                .unwrap();
        assert_eq!(parsed.dtype, DType::Bool);
        assert_eq!(parsed.byte_order, ByteOrder::NotApplicable);
    }

    #[test]
    fn parse_long_literals() {
        let parsed =
            ArrayHeader::parse("{'descr': '<f8', 'fortran_order': False, 'shape': (3L, 4L), }")
                .unwrap();
        assert_eq!(parsed.shape, vec![3, 4]);
    }

    #[test]
    fn unsupported_descr() {
        let err = ArrayHeader::parse("{'descr': '<c16', 'fortran_order': False, 'shape': (), }")
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedDescr(d) if d == "<c16"));
    }

    #[test]
    fn missing_key() {
        let err = ArrayHeader::parse("{'descr': '<f8', 'shape': (), }").unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn unknown_key() {
        let err = ArrayHeader::parse(
            "{'descr': '<f8', 'fortran_order': False, 'shape': (), 'extra': 1}",
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn duplicate_key() {
        let err = ArrayHeader::parse(
            "{'descr': '<f8', 'descr': '<f8', 'fortran_order': False, 'shape': ()}",
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        for text in ["", "not a dict", "{'descr': '<f8'", "{'shape': (1, 2}"] {
            assert!(ArrayHeader::parse(text).is_err(), "accepted {text:?}");
        }
    }
}
