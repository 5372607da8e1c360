use crate::digest::Digest;

/// BLAKE3 keyed by a domain tag.
///
/// The tag and a `:` are fed to the hasher ahead of the input. Slot keys,
/// blob digests and fingerprints each get their own tag and so live in
/// disjoint hash spaces.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for position-derived slot keys.
    pub const SLOT: Self = Self {
        domain: "npzee-slot-v1",
    };
    /// Hasher for encoded array blob bytes.
    pub const BLOB: Self = Self {
        domain: "npzee-blob-v1",
    };
    /// Hasher for the blob fingerprint (blob digest + shape + dtype).
    pub const FINGERPRINT: Self = Self {
        domain: "npzee-fingerprint-v1",
    };

    pub fn hash(&self, data: &[u8]) -> Digest {
        self.hash_parts(&[data])
    }

    /// Same as hashing the concatenation of `parts`.
    pub fn hash_parts(&self, parts: &[&[u8]]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        for part in parts {
            hasher.update(part);
        }
        Digest::from_hash(*hasher.finalize().as_bytes())
    }
}
