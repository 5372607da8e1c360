use std::fmt;

/// A 256-bit BLAKE3 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Lowercase hex form (64 characters), as written into documents and
    /// used for blob file names.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_full_length() {
        let d = Digest::from_hash([0xab; 32]);
        assert_eq!(d.to_hex(), "ab".repeat(32));
        assert_eq!(d.to_string(), d.to_hex());
    }

    #[test]
    fn debug_is_abbreviated() {
        let d = Digest::from_hash([0x01; 32]);
        assert_eq!(format!("{d:?}"), "Digest(01010101)");
    }
}
