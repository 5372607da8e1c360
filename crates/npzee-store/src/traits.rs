use crate::error::StoreResult;

/// Flat storage for the array blobs of one composite variable.
///
/// Blobs are addressed by file name (`<slot_key>.npy`). Implementations:
/// - never interpret blob contents;
/// - treat a missing blob as `Ok(None)`, not an error;
/// - propagate all I/O errors.
pub trait BlobPool: Send + Sync {
    /// Read a blob by file name.
    fn read(&self, file: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write (or overwrite) a blob.
    fn write(&self, file: &str, bytes: &[u8]) -> StoreResult<()>;

    /// File names of all blobs, sorted.
    fn list(&self) -> StoreResult<Vec<String>>;

    /// Write several blobs in order.
    ///
    /// Not transactional: a failure part-way leaves the earlier blobs
    /// written.
    fn write_batch(&self, blobs: &[(String, Vec<u8>)]) -> StoreResult<()> {
        blobs
            .iter()
            .try_for_each(|(file, bytes)| self.write(file, bytes))
    }
}
