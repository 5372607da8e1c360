use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::traits::BlobPool;

/// Blob pool backed by one directory (`<name>.data/` in a workspace).
///
/// The directory is created on first write.
#[derive(Clone, Debug)]
pub struct DirectoryBlobPool {
    dir: PathBuf,
}

impl DirectoryBlobPool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl BlobPool for DirectoryBlobPool {
    fn read(&self, file: &str) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.blob_path(file)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &str, bytes: &[u8]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.blob_path(file), bytes)?;
        debug!(pool = %self.dir.display(), file, bytes = bytes.len(), "wrote blob");
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            } else {
                warn!(path = %entry.path().display(), "skipping non-file entry in blob pool");
            }
        }
        files.sort();
        Ok(files)
    }
}
