use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tar::{Archive, EntryType};
use tracing::{debug, info};

use crate::error::{BundleError, BundleResult};

/// Unpacks bundles written by [`BundleWriter`](crate::BundleWriter).
pub struct BundleReader;

impl BundleReader {
    /// Unpack the bundle at `bundle` into the existing directory `target`.
    /// Files already present are overwritten. Returns the number of files
    /// written.
    pub fn import(bundle: &Path, target: &Path) -> BundleResult<usize> {
        let file = File::open(bundle)?;
        let count = Self::unpack(BufReader::new(file), target)?;
        info!(
            bundle = %bundle.display(),
            target = %target.display(),
            files = count,
            "imported bundle"
        );
        Ok(count)
    }

    pub fn import_from_slice(bytes: &[u8], target: &Path) -> BundleResult<usize> {
        Self::unpack(bytes, target)
    }

    /// Entry paths of a bundle, in archive order.
    pub fn list(bundle: &Path) -> BundleResult<Vec<PathBuf>> {
        let decoder = zstd::Decoder::new(BufReader::new(File::open(bundle)?))
            .map_err(|e| BundleError::compression(format!("zstd decoder: {e}")))?;
        let mut archive = Archive::new(decoder);
        let mut paths = Vec::new();
        for entry in archive.entries().map_err(archive_err)? {
            let entry = entry.map_err(archive_err)?;
            paths.push(entry.path().map_err(archive_err)?.into_owned());
        }
        Ok(paths)
    }

    fn unpack<R: Read>(reader: R, target: &Path) -> BundleResult<usize> {
        if !target.is_dir() {
            return Err(BundleError::TargetMissing(target.to_path_buf()));
        }
        let decoder = zstd::Decoder::new(reader)
            .map_err(|e| BundleError::compression(format!("zstd decoder: {e}")))?;
        let mut archive = Archive::new(decoder);

        let mut count = 0;
        for entry in archive.entries().map_err(archive_err)? {
            let mut entry = entry.map_err(archive_err)?;
            let rel = entry.path().map_err(archive_err)?.into_owned();
            check_relative(&rel)?;
            let dest = target.join(&rel);

            match entry.header().entry_type() {
                EntryType::Directory => {
                    fs::create_dir_all(&dest)?;
                }
                EntryType::Regular => {
                    if let Some(parent) = dest.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    entry.unpack(&dest).map_err(archive_err)?;
                    debug!(entry = %rel.display(), "unpacked file");
                    count += 1;
                }
                other => {
                    return Err(BundleError::UnsafeEntry(format!(
                        "{}: unsupported entry type {other:?}",
                        rel.display()
                    )))
                }
            }
        }
        Ok(count)
    }
}

/// Only plain relative paths may be unpacked.
fn check_relative(path: &Path) -> BundleResult<()> {
    let safe = !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(())
    } else {
        Err(BundleError::UnsafeEntry(path.display().to_string()))
    }
}

fn archive_err(e: std::io::Error) -> BundleError {
    BundleError::archive(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BundleWriter;
    use npzee_store::Workspace;
    use npzee_types::{NdArray, Value};

    /// A bundle holding one raw entry, bypassing the tar crate's own path
    /// checks so hostile names can be produced.
    fn raw_bundle(name: &[u8], entry_type: EntryType) -> Vec<u8> {
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_entry_type(entry_type);
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();

        let mut builder = tar::Builder::new(Vec::new());
        builder.append(&header, &b"bad"[..]).unwrap();
        let tar = builder.into_inner().unwrap();
        zstd::encode_all(&tar[..], 3).unwrap()
    }

    #[test]
    fn workspace_survives_a_round_trip() {
        let src = tempfile::tempdir().unwrap();
        let ws = Workspace::open(src.path()).unwrap();
        ws.store("n", &Value::from(7i64)).unwrap();
        ws.store("s", &Value::from("hello")).unwrap();
        let doc = Value::mapping(vec![
            ("w", Value::from(NdArray::vector(&[1.0f64, 2.0]))),
            ("label", Value::from("x")),
        ]);
        ws.store("doc", &doc).unwrap();

        let (bytes, info) = BundleWriter::with_defaults().write_to_vec(src.path()).unwrap();

        let dst = tempfile::tempdir().unwrap();
        let count = BundleReader::import_from_slice(&bytes, dst.path()).unwrap();
        assert_eq!(count, info.file_count);

        let copy = Workspace::open(dst.path()).unwrap();
        assert_eq!(copy.list().unwrap(), ws.list().unwrap());
        assert_eq!(copy.load("n").unwrap(), Some(Value::from(7i64)));
        assert_eq!(copy.load("s").unwrap(), Some(Value::from("hello")));
        assert_eq!(copy.load("doc").unwrap(), Some(doc));
    }

    #[test]
    fn import_from_file_and_list() {
        let src = tempfile::tempdir().unwrap();
        fs::write(src.path().join("x.string"), "hi").unwrap();
        let out = tempfile::tempdir().unwrap();
        let bundle = out.path().join("b.npzee.tar.zst");
        BundleWriter::with_defaults().export(src.path(), &bundle).unwrap();

        assert_eq!(BundleReader::list(&bundle).unwrap(), vec![PathBuf::from("x.string")]);

        let dst = tempfile::tempdir().unwrap();
        assert_eq!(BundleReader::import(&bundle, dst.path()).unwrap(), 1);
        assert_eq!(fs::read_to_string(dst.path().join("x.string")).unwrap(), "hi");
    }

    #[test]
    fn missing_target() {
        let src = tempfile::tempdir().unwrap();
        let (bytes, _) = BundleWriter::with_defaults().write_to_vec(src.path()).unwrap();
        let err = BundleReader::import_from_slice(&bytes, &src.path().join("nope")).unwrap_err();
        assert!(matches!(err, BundleError::TargetMissing(_)));
    }

    #[test]
    fn parent_components_are_rejected() {
        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("inner");
        fs::create_dir(&target).unwrap();
        let bytes = raw_bundle(b"../evil", EntryType::Regular);
        let err = BundleReader::import_from_slice(&bytes, &target).unwrap_err();
        assert!(matches!(err, BundleError::UnsafeEntry(_)));
        assert!(!dst.path().join("evil").exists());
    }

    #[test]
    fn absolute_paths_are_rejected() {
        let dst = tempfile::tempdir().unwrap();
        let bytes = raw_bundle(b"/tmp/npzee-evil", EntryType::Regular);
        let err = BundleReader::import_from_slice(&bytes, dst.path()).unwrap_err();
        assert!(matches!(err, BundleError::UnsafeEntry(_)));
    }

    #[test]
    fn links_are_rejected() {
        let dst = tempfile::tempdir().unwrap();
        let bytes = raw_bundle(b"link", EntryType::Symlink);
        let err = BundleReader::import_from_slice(&bytes, dst.path()).unwrap_err();
        assert!(matches!(err, BundleError::UnsafeEntry(_)));
    }

    #[test]
    fn garbage_is_not_a_bundle() {
        let dst = tempfile::tempdir().unwrap();
        assert!(BundleReader::import_from_slice(b"not zstd at all", dst.path()).is_err());
    }
}
