use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use npzee_store::Workspace;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};

/// One registered workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    #[serde(default)]
    workspaces: BTreeMap<String, WorkspaceEntry>,
}

/// Maps workspace names to directories.
///
/// Every mutation rewrites the index file before returning, so two
/// `Registry` values opened on the same root see each other's changes
/// after reopening.
#[derive(Debug)]
pub struct Registry {
    config: RegistryConfig,
    index: RegistryIndex,
}

impl Registry {
    /// Open the registry described by `config`, creating its root directory
    /// if needed. A missing index file means an empty registry.
    pub fn open(config: RegistryConfig) -> RegistryResult<Self> {
        fs::create_dir_all(&config.root)?;
        Self::open_existing(config)
    }

    /// Open without touching the file system beyond reading the index.
    ///
    /// Suitable for lookups; a missing root reads as an empty registry.
    /// Mutations still write the index, so they need the root to exist.
    pub fn open_existing(config: RegistryConfig) -> RegistryResult<Self> {
        let index_path = config.index_path();
        let index = if index_path.is_file() {
            let text = fs::read_to_string(&index_path)?;
            toml::from_str(&text).map_err(|e| RegistryError::Config(e.to_string()))?
        } else {
            RegistryIndex::default()
        };
        debug!(
            root = %config.root.display(),
            workspaces = index.workspaces.len(),
            "opened registry"
        );
        Ok(Self { config, index })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a fresh workspace directory under the root and register it.
    pub fn create(&mut self, name: &str) -> RegistryResult<Workspace> {
        self.check_new(name)?;
        let path = self.config.root.join(name);
        fs::create_dir_all(&path)?;
        let path = fs::canonicalize(&path)?;
        self.insert(name, path.clone())?;
        info!(name, path = %path.display(), "created workspace");
        Ok(Workspace::open(path)?)
    }

    /// Register an existing directory under `name`.
    pub fn register(&mut self, name: &str, path: &Path) -> RegistryResult<()> {
        self.check_new(name)?;
        if !path.is_dir() {
            return Err(RegistryError::DirectoryMissing(path.to_path_buf()));
        }
        let path = fs::canonicalize(path)?;
        info!(name, path = %path.display(), "registered workspace");
        self.insert(name, path)
    }

    /// Directory registered under `name`.
    pub fn resolve(&self, name: &str) -> RegistryResult<&Path> {
        self.index
            .workspaces
            .get(name)
            .map(|e| e.path.as_path())
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    pub fn open_workspace(&self, name: &str) -> RegistryResult<Workspace> {
        Ok(Workspace::open(self.resolve(name)?)?)
    }

    /// Forget `name`. With `delete_files` the directory goes too.
    pub fn unregister(&mut self, name: &str, delete_files: bool) -> RegistryResult<WorkspaceEntry> {
        let entry = self
            .index
            .workspaces
            .remove(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        self.save()?;
        if delete_files && entry.path.is_dir() {
            fs::remove_dir_all(&entry.path)?;
        }
        info!(name, delete_files, "unregistered workspace");
        Ok(entry)
    }

    /// Registered workspaces, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = (&str, &WorkspaceEntry)> {
        self.index.workspaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.index.workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.workspaces.is_empty()
    }

    fn check_new(&self, name: &str) -> RegistryResult<()> {
        validate_name(name)?;
        if self.index.workspaces.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, path: PathBuf) -> RegistryResult<()> {
        self.index.workspaces.insert(
            name.to_string(),
            WorkspaceEntry {
                path,
                created_at: Utc::now(),
            },
        );
        self.save()
    }

    /// Write the index to a temporary file and rename it into place.
    fn save(&self) -> RegistryResult<()> {
        let text = toml::to_string_pretty(&self.index)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        let path = self.config.index_path();
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> RegistryResult<()> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(RegistryError::InvalidName(name.to_string()))
    }
}
