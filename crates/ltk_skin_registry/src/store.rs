//! Persistence port for the registry.

use std::sync::{Arc, Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{RegistryError, Result};
use crate::naming::temp_file_name;
use crate::record::InstalledModRecord;

/// Durable storage for the full record list.
///
/// `load` returns an empty list when nothing has been stored yet and
/// [`RegistryError::Corrupt`] when stored data cannot be parsed.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<Vec<InstalledModRecord>>;
    fn save(&self, records: &[InstalledModRecord]) -> Result<()>;
}

/// Stores records as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn temp_path(&self) -> Utf8PathBuf {
        let file_name = self.path.file_name().unwrap_or("installed.json");
        self.path.with_file_name(temp_file_name(file_name))
    }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<Vec<InstalledModRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::io(&self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| RegistryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, records: &[InstalledModRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
            }
        }

        let contents = serde_json::to_string_pretty(records)?;
        let temp_path = self.temp_path();

        std::fs::write(&temp_path, contents).map_err(|e| RegistryError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            RegistryError::io(&self.path, e)
        })?;

        tracing::debug!(path = %self.path, count = records.len(), "Saved registry");
        Ok(())
    }
}

/// In-memory store. Clones share the same backing list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Vec<InstalledModRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<InstalledModRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Snapshot of what was last saved.
    pub fn snapshot(&self) -> Vec<InstalledModRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<Vec<InstalledModRecord>> {
        Ok(self.snapshot())
    }

    fn save(&self, records: &[InstalledModRecord]) -> Result<()> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("installed.json")).unwrap();
        JsonFileStore::new(path)
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "[{ not json").unwrap();

        assert!(matches!(store.load(), Err(RegistryError::Corrupt { .. })));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let records = vec![InstalledModRecord::new("Ahri", "103001", "ahri.fantome", "Ahri")];

        store.save(&records).unwrap();

        assert_eq!(store.load().unwrap(), records);
        assert!(!dir.path().join("installed.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path =
            Utf8PathBuf::from_path_buf(dir.path().join("nested/data/installed.json")).unwrap();
        let store = JsonFileStore::new(path.clone());

        store.save(&[]).unwrap();
        assert!(path.exists());
    }
}
