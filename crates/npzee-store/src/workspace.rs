use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use npzee_types::{Scalar, Value, VariableKind};
use tracing::{debug, info, warn};

use crate::document::{encode_document, BlobCheck, CompositeDocument, DocumentMeta};
use crate::error::{StoreError, StoreResult};
use crate::pool::DirectoryBlobPool;
use crate::traits::BlobPool;

/// A directory holding named variables.
///
/// `Workspace` keeps no state besides its path: every operation goes
/// straight to the file system, and loaded values are independent copies.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open an existing workspace directory.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = path.into();
        if !root.is_dir() {
            return Err(StoreError::WorkspaceNotFound(root));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Store `value` under `name`, replacing an earlier value of the same
    /// kind.
    ///
    /// Files left behind by an earlier value of a *different* kind are not
    /// touched, except that a mapping and a sequence under one name share a
    /// pool, so storing either deletes the other's document. Not atomic: a
    /// failure part-way may leave some blobs written.
    pub fn store(&self, name: &str, value: &Value) -> StoreResult<()> {
        validate_name(name)?;
        let Some(kind) = value.kind() else {
            return Err(StoreError::UnsupportedValueKind(
                "null cannot be stored as a variable".into(),
            ));
        };
        let path = self.file_path(name, kind);

        match value {
            Value::Array(array) => {
                let bytes = npzee_codec::encode(array)
                    .map_err(|e| StoreError::from_codec(path.display().to_string(), e))?;
                fs::write(&path, bytes)?;
            }
            Value::Scalar(scalar) => fs::write(&path, scalar.to_string())?,
            Value::Text(text) => fs::write(&path, text)?,
            Value::Mapping(_) | Value::Sequence(_) | Value::Null => {
                self.store_document(name, value, &path)?;
                let sibling = match kind {
                    VariableKind::Mapping => VariableKind::Sequence,
                    _ => VariableKind::Mapping,
                };
                remove_entry(&self.file_path(name, sibling))?;
            }
        }

        info!(name, %kind, path = %path.display(), "stored variable");
        Ok(())
    }

    fn store_document(&self, name: &str, value: &Value, path: &Path) -> StoreResult<()> {
        let meta = DocumentMeta {
            workspace: self.root.display().to_string(),
            pool: pool_name(name),
        };
        let encoded = encode_document(value, &meta)?;

        let pool_dir = self.root.join(&meta.pool);
        if pool_dir.exists() {
            debug!(pool = %pool_dir.display(), "replacing existing pool");
            fs::remove_dir_all(&pool_dir)?;
        }
        fs::create_dir_all(&pool_dir)?;
        let pool = DirectoryBlobPool::new(pool_dir);
        pool.write_batch(&encoded.blobs)?;

        fs::write(path, encoded.to_pretty_bytes()?)?;
        debug!(name, arrays = encoded.blobs.len(), "wrote document");
        Ok(())
    }

    /// Load the variable `name`, or `None` if nothing is stored under it.
    ///
    /// When files of several kinds share the name, document kinds win
    /// (see [`VariableKind::LOAD_PRECEDENCE`]).
    pub fn load(&self, name: &str) -> StoreResult<Option<Value>> {
        let Some(kind) = self.kind_of(name)? else {
            debug!(name, "variable not found");
            return Ok(None);
        };
        let path = self.file_path(name, kind);

        let value = match kind {
            VariableKind::Array => {
                let bytes = fs::read(&path)?;
                let array = npzee_codec::decode(&bytes)
                    .map_err(|e| StoreError::from_codec(path.display().to_string(), e))?;
                Value::Array(array)
            }
            VariableKind::Scalar => {
                let text = fs::read_to_string(&path)?;
                let scalar = Scalar::parse(&text).map_err(|source| StoreError::CorruptScalar {
                    file: path.display().to_string(),
                    source,
                })?;
                Value::Scalar(scalar)
            }
            VariableKind::Text => Value::Text(fs::read_to_string(&path)?),
            VariableKind::Mapping | VariableKind::Sequence => {
                let doc = CompositeDocument::parse(&fs::read(&path)?)?;
                let pool = DirectoryBlobPool::new(self.pool_dir(&doc.meta)?);
                doc.decode(kind, &pool)?
            }
        };

        info!(name, %kind, "loaded variable");
        Ok(Some(value))
    }

    /// The kind `load` would read for `name`, if any.
    pub fn kind_of(&self, name: &str) -> StoreResult<Option<VariableKind>> {
        validate_name(name)?;
        Ok(VariableKind::LOAD_PRECEDENCE
            .into_iter()
            .find(|kind| self.file_path(name, *kind).is_file()))
    }

    /// Check a composite variable's blobs against its side-table.
    ///
    /// `None` if nothing is stored under `name`. Non-composite variables
    /// have no pool and always check clean.
    pub fn verify(&self, name: &str) -> StoreResult<Option<BlobCheck>> {
        let Some(kind) = self.kind_of(name)? else {
            return Ok(None);
        };
        if !kind.is_composite() {
            return Ok(Some(BlobCheck::default()));
        }
        let doc = CompositeDocument::parse(&fs::read(self.file_path(name, kind))?)?;
        let pool = DirectoryBlobPool::new(self.pool_dir(&doc.meta)?);
        let check = doc.check_blobs(&pool)?;
        if !check.is_clean() {
            warn!(name, ?check, "pool does not match its side-table");
        }
        Ok(Some(check))
    }

    /// Whether anything is stored under `name`.
    pub fn contains(&self, name: &str) -> StoreResult<bool> {
        Ok(self.kind_of(name)?.is_some())
    }

    /// Delete every file and directory whose name, without its suffix, is
    /// `name`. Returns `true` if anything was removed.
    pub fn remove(&self, name: &str) -> StoreResult<bool> {
        validate_name(name)?;
        let mut removed = false;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) != Some(name) {
                continue;
            }
            remove_entry(&path)?;
            removed = true;
        }
        if removed {
            info!(name, "removed variable");
        }
        Ok(removed)
    }

    /// All stored variables as `(name, kind)`, sorted by name then kind.
    ///
    /// A name stored under several kinds appears once per kind.
    pub fn list(&self) -> StoreResult<Vec<(String, VariableKind)>> {
        let mut vars = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(var) = parse_file_name(&entry.file_name().to_string_lossy()) {
                vars.push(var);
            }
        }
        vars.sort();
        Ok(vars)
    }

    /// Remove every variable in the workspace, leaving unrelated files.
    /// Returns the number of entries deleted.
    pub fn clear(&self) -> StoreResult<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type()?.is_dir();
            let owned = if is_dir {
                name.ends_with(&format!(".{}", VariableKind::POOL_SUFFIX))
            } else {
                parse_file_name(&name).is_some()
            };
            if owned {
                remove_entry(&path)?;
                count += 1;
            }
        }
        info!(workspace = %self.root.display(), entries = count, "cleared workspace");
        Ok(count)
    }

    fn file_path(&self, name: &str, kind: VariableKind) -> PathBuf {
        self.root.join(format!("{name}.{}", kind.suffix()))
    }

    /// Resolve a document's pool relative to this workspace, so moved or
    /// unpacked workspaces keep loading.
    fn pool_dir(&self, meta: &DocumentMeta) -> StoreResult<PathBuf> {
        let mut components = Path::new(&meta.pool).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(&meta.pool)),
            _ => Err(StoreError::InvalidDocument(format!(
                "pool {:?} is not a plain directory name",
                meta.pool
            ))),
        }
    }
}

fn pool_name(name: &str) -> String {
    format!("{name}.{}", VariableKind::POOL_SUFFIX)
}

/// Split `name.suffix` into a variable entry if the suffix is a known kind.
fn parse_file_name(file_name: &str) -> Option<(String, VariableKind)> {
    let (stem, suffix) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    VariableKind::from_suffix(suffix).map(|kind| (stem.to_string(), kind))
}

fn remove_entry(path: &Path) -> StoreResult<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
