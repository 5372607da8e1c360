use npzee_types::DType;

use crate::hasher::ContentHasher;

/// Key for the array leaf at `position` within one encoding pass.
///
/// Derived from the position counter alone: deterministic across passes and
/// collision-free within one. The result is a 64-character lowercase hex
/// string, which is also the blob's file stem in the pool directory.
pub fn slot_key(position: usize) -> String {
    ContentHasher::SLOT
        .hash(position.to_string().as_bytes())
        .to_hex()
}

/// Fingerprint of an encoded array blob.
///
/// First the blob bytes are hashed, then the hex form of that digest is
/// hashed again together with the textual shape (e.g. `[2, 2]`) and dtype
/// (e.g. `int64`).
pub fn content_digest(blob: &[u8], shape: &[usize], dtype: DType) -> String {
    let blob_hex = ContentHasher::BLOB.hash(blob).to_hex();
    let shape_text = format!("{shape:?}");
    ContentHasher::FINGERPRINT
        .hash_parts(&[
            blob_hex.as_bytes(),
            shape_text.as_bytes(),
            dtype.name().as_bytes(),
        ])
        .to_hex()
}
