use camino::{Utf8Path, Utf8PathBuf};

/// Directory layout under the application data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: Utf8PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// One archive per installed skin.
    pub fn install_dir(&self) -> Utf8PathBuf {
        self.root.join("installed")
    }

    /// Overlay profile built by the mod tool.
    pub fn profile_dir(&self) -> Utf8PathBuf {
        self.root.join("profiles").join("Default")
    }

    pub fn registry_file(&self) -> Utf8PathBuf {
        self.root.join("installed.json")
    }

    pub fn logs_dir(&self) -> Utf8PathBuf {
        self.root.join("logs")
    }
}
