//! Error types for registry operations.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while reading, writing or reconciling the registry.
///
/// All of these are recoverable: the caller reports them and keeps running.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Reading or writing the registry file (or listing the install directory) failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry file exists but does not contain a valid record list.
    #[error("Registry file {path} is corrupt: {source}")]
    Corrupt {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The registry could not be serialized.
    #[error("Failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
