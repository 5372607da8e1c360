use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tar::{Builder, Header};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BundleError, BundleResult};

/// Options for [`BundleWriter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// zstd level, 1 (fast) to 22 (small).
    pub compression_level: i32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}

/// Summary of a written bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleInfo {
    pub file_count: usize,
    pub size_bytes: u64,
    /// BLAKE3 of the compressed bundle, hex.
    pub checksum: String,
}

/// Packs a workspace directory into a bundle.
pub struct BundleWriter {
    compression_level: i32,
}

impl BundleWriter {
    pub fn new(options: &ExportOptions) -> Self {
        Self {
            compression_level: options.compression_level,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ExportOptions::default())
    }

    /// Bundle `dir` into the file `out`.
    ///
    /// Either the complete bundle ends up at `out` or nothing does: the
    /// archive is written next to it and renamed into place.
    pub fn export(&self, dir: &Path, out: &Path) -> BundleResult<BundleInfo> {
        let files = collect_files(dir)?;
        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = out.with_extension("tmp");
        let result = File::create(&temp_path)
            .map_err(BundleError::from)
            .and_then(|file| self.write_archive(dir, &files, BufWriter::new(file)))
            .and_then(|mut sink| sink.flush().map_err(BundleError::from));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        fs::rename(&temp_path, out)?;

        let bytes = fs::read(out)?;
        let info = BundleInfo {
            file_count: files.len(),
            size_bytes: bytes.len() as u64,
            checksum: blake3::hash(&bytes).to_hex().to_string(),
        };
        info!(
            dir = %dir.display(),
            out = %out.display(),
            files = info.file_count,
            bytes = info.size_bytes,
            "exported bundle"
        );
        Ok(info)
    }

    /// Bundle `dir` into memory.
    pub fn write_to_vec(&self, dir: &Path) -> BundleResult<(Vec<u8>, BundleInfo)> {
        let files = collect_files(dir)?;
        let bytes = self.write_archive(dir, &files, Vec::new())?;
        let info = BundleInfo {
            file_count: files.len(),
            size_bytes: bytes.len() as u64,
            checksum: blake3::hash(&bytes).to_hex().to_string(),
        };
        Ok((bytes, info))
    }

    fn write_archive<W: Write>(&self, dir: &Path, files: &[PathBuf], sink: W) -> BundleResult<W> {
        let encoder = zstd::Encoder::new(sink, self.compression_level)
            .map_err(|e| BundleError::compression(format!("zstd encoder: {e}")))?;
        let mut builder = Builder::new(encoder);
        for rel in files {
            let data = fs::read(dir.join(rel))?;
            add_file(&mut builder, rel, &data)?;
        }
        let encoder = builder
            .into_inner()
            .map_err(|e| BundleError::archive(format!("tar finish: {e}")))?;
        encoder
            .finish()
            .map_err(|e| BundleError::compression(format!("zstd finish: {e}")))
    }
}

fn add_file<W: Write>(builder: &mut Builder<W>, rel: &Path, data: &[u8]) -> BundleResult<()> {
    let name = archive_name(rel);
    let mut header = Header::new_gnu();
    header
        .set_path(&name)
        .map_err(|e| BundleError::archive(format!("set path '{name}': {e}")))?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append(&header, data)
        .map_err(|e| BundleError::archive(format!("append '{name}': {e}")))?;
    debug!(entry = %name, bytes = data.len(), "bundled file");
    Ok(())
}

/// Regular files under `dir`, relative to it, in a stable order.
fn collect_files(dir: &Path) -> BundleResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BundleError::SourceMissing(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| BundleError::archive(format!("walk: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| BundleError::archive(e.to_string()))?;
        files.push(rel.to_path_buf());
    }
    Ok(files)
}

/// `/`-separated entry name, independent of the host separator.
fn archive_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dir() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.numeric"), "1").unwrap();
        fs::create_dir(tmp.path().join("m.data")).unwrap();
        fs::write(tmp.path().join("m.data").join("k.npy"), b"blob").unwrap();
        fs::create_dir(tmp.path().join("empty")).unwrap();
        tmp
    }

    #[test]
    fn collects_regular_files_in_order() {
        let tmp = sample_dir();
        let files = collect_files(tmp.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| archive_name(p)).collect();
        assert_eq!(names, vec!["a.numeric", "m.data/k.npy"]);
    }

    #[test]
    fn bundles_are_reproducible() {
        let tmp = sample_dir();
        let writer = BundleWriter::with_defaults();
        let (first, info1) = writer.write_to_vec(tmp.path()).unwrap();
        let (second, info2) = writer.write_to_vec(tmp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(info1, info2);
        assert_eq!(info1.file_count, 2);
        assert_eq!(info1.checksum.len(), 64);
    }

    #[test]
    fn export_matches_in_memory_bundle() {
        let tmp = sample_dir();
        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("nested").join("ws.npzee.tar.zst");

        let writer = BundleWriter::with_defaults();
        let info = writer.export(tmp.path(), &out).unwrap();
        let (bytes, mem_info) = writer.write_to_vec(tmp.path()).unwrap();

        assert_eq!(fs::read(&out).unwrap(), bytes);
        assert_eq!(info, mem_info);
        assert!(!out.with_extension("tmp").exists());
    }

    #[test]
    fn missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BundleWriter::with_defaults()
            .write_to_vec(&tmp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, BundleError::SourceMissing(_)));
    }

    #[test]
    fn compression_level_changes_nothing_but_size() {
        let tmp = sample_dir();
        let fast = BundleWriter::new(&ExportOptions {
            compression_level: 1,
        });
        let (_, info) = fast.write_to_vec(tmp.path()).unwrap();
        assert_eq!(info.file_count, 2);
    }
}
