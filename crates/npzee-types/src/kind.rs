use std::fmt;

use serde::{Deserialize, Serialize};

/// The on-disk representation of a variable.
///
/// Each kind maps to one file suffix inside the workspace directory.
/// Composite kinds additionally own a pool directory named
/// `<name>.<POOL_SUFFIX>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Array,
    Mapping,
    Sequence,
    Scalar,
    Text,
}

impl VariableKind {
    /// Suffix of the directory holding a composite variable's array blobs.
    pub const POOL_SUFFIX: &'static str = "data";

    /// Lookup order used when several files share one name.
    /// Document kinds win over the rest.
    pub const LOAD_PRECEDENCE: [VariableKind; 5] = [
        VariableKind::Mapping,
        VariableKind::Sequence,
        VariableKind::Array,
        VariableKind::Scalar,
        VariableKind::Text,
    ];

    /// File suffix, without the leading dot.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Array => "npy",
            Self::Mapping => "dict",
            Self::Sequence => "list",
            Self::Scalar => "numeric",
            Self::Text => "string",
        }
    }

    /// Parse a file suffix (without the leading dot).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::LOAD_PRECEDENCE
            .iter()
            .copied()
            .find(|k| k.suffix() == suffix)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Mapping | Self::Sequence)
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => write!(f, "array"),
            Self::Mapping => write!(f, "mapping"),
            Self::Sequence => write!(f, "sequence"),
            Self::Scalar => write!(f, "scalar"),
            Self::Text => write!(f, "text"),
        }
    }
}
