use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreResult;
use crate::traits::BlobPool;

/// In-memory blob pool.
///
/// Intended for tests and for encoding documents without touching disk.
/// Blobs are cloned on read and write.
pub struct InMemoryBlobPool {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryBlobPool {
    /// Create a new empty pool.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBlobPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobPool for InMemoryBlobPool {
    fn read(&self, file: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().expect("lock poisoned").get(file).cloned())
    }

    fn write(&self, file: &str, bytes: &[u8]) -> StoreResult<()> {
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(file.to_string(), bytes.to_vec());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.blobs.read().expect("lock poisoned").keys().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryBlobPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobPool")
            .field("blob_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let pool = InMemoryBlobPool::new();
        pool.write("a.npy", b"abc").unwrap();
        assert_eq!(pool.read("a.npy").unwrap(), Some(b"abc".to_vec()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn missing_blob_is_none() {
        let pool = InMemoryBlobPool::default();
        assert!(pool.read("nope.npy").unwrap().is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn overwrite_replaces() {
        let pool = InMemoryBlobPool::new();
        pool.write("a.npy", b"one").unwrap();
        pool.write("a.npy", b"two").unwrap();
        assert_eq!(pool.read("a.npy").unwrap(), Some(b"two".to_vec()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn batch_and_sorted_list() {
        let pool = InMemoryBlobPool::new();
        pool.write_batch(&[
            ("b.npy".to_string(), vec![2]),
            ("a.npy".to_string(), vec![1]),
        ])
        .unwrap();
        assert_eq!(pool.list().unwrap(), vec!["a.npy", "b.npy"]);
    }
}
