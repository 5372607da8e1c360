use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Where the registry keeps its workspaces and index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directory new workspaces are created under.
    pub root: PathBuf,
    /// Index file name, relative to `root`.
    pub index_file: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("npzee"),
            index_file: "workspaces.toml".into(),
        }
    }
}

impl RegistryConfig {
    /// A default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Read a configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> RegistryResult<Self> {
        toml::from_str(text).map_err(|e| RegistryError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> RegistryResult<String> {
        toml::to_string_pretty(self).map_err(|e| RegistryError::Serialization(e.to_string()))
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }
}
