use std::collections::BTreeMap;

use camino::Utf8Path;

use crate::error::{RegistryError, Result};
use crate::naming::is_temp_file;
use crate::record::InstalledModRecord;
use crate::store::RegistryStore;

/// What [`Registry::reconcile_with_disk`] changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records dropped because their archive was missing.
    pub dropped: Vec<InstalledModRecord>,
    /// Temporary files deleted from the install directory.
    pub removed_temp_files: Vec<String>,
}

impl ReconcileReport {
    /// Whether the registry itself was modified and needs saving.
    pub fn registry_changed(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Installed skins keyed by champion, with an injected persistence port.
pub struct Registry {
    records: BTreeMap<String, InstalledModRecord>,
    store: Box<dyn RegistryStore>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry without reading the store.
    pub fn empty(store: Box<dyn RegistryStore>) -> Self {
        Self {
            records: BTreeMap::new(),
            store,
        }
    }

    /// Loads the registry from `store`.
    ///
    /// A corrupt store is logged and treated as empty. Other read failures
    /// are returned to the caller.
    pub fn load(store: Box<dyn RegistryStore>) -> Result<Self> {
        let records = match store.load() {
            Ok(records) => records,
            Err(RegistryError::Corrupt { path, source }) => {
                tracing::warn!(
                    %path,
                    error = %source,
                    "Registry file is corrupt, starting with an empty registry"
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut registry = Self::empty(store);
        for record in records {
            if let Some(previous) = registry.upsert(record) {
                tracing::warn!(
                    character_id = %previous.character_id,
                    file_name = %previous.file_name,
                    "Duplicate registry entry, keeping the last one"
                );
            }
        }

        tracing::info!(count = registry.len(), "Loaded installed skin registry");
        Ok(registry)
    }

    /// Persists the full record list through the store.
    pub fn save(&self) -> Result<()> {
        let records: Vec<InstalledModRecord> = self.records.values().cloned().collect();
        self.store.save(&records)
    }

    /// Inserts or replaces the record for its champion, returning the previous one.
    pub fn upsert(&mut self, record: InstalledModRecord) -> Option<InstalledModRecord> {
        self.records.insert(record.character_id.clone(), record)
    }

    pub fn remove(&mut self, character_id: &str) -> Option<InstalledModRecord> {
        self.records.remove(character_id)
    }

    /// Removes every listed champion that is present. Unknown ids are skipped.
    pub fn remove_many<I, S>(&mut self, character_ids: I) -> Vec<InstalledModRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        character_ids
            .into_iter()
            .filter_map(|id| self.records.remove(id.as_ref()))
            .collect()
    }

    pub fn get(&self, character_id: &str) -> Option<&InstalledModRecord> {
        self.records.get(character_id)
    }

    pub fn contains(&self, character_id: &str) -> bool {
        self.records.contains_key(character_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &InstalledModRecord> {
        self.records.values()
    }

    /// Archive file names of every record, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.values().map(|r| r.file_name.clone()).collect();
        names.sort();
        names
    }

    /// The record that owns `file_name`, if any.
    pub fn file_owner(&self, file_name: &str) -> Option<&InstalledModRecord> {
        self.records.values().find(|r| r.file_name == file_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Marks every record as loaded by overlay process `generation`.
    ///
    /// Returns how many records changed.
    pub fn stamp_generation(&mut self, generation: u64) -> usize {
        let mut changed = 0;
        for record in self.records.values_mut() {
            if record.process_generation != Some(generation) {
                record.process_generation = Some(generation);
                changed += 1;
            }
        }
        changed
    }

    /// Records that the overlay process `generation` has not loaded.
    pub fn stale_records(&self, generation: u64) -> Vec<&InstalledModRecord> {
        self.records
            .values()
            .filter(|r| r.process_generation != Some(generation))
            .collect()
    }

    /// Brings the registry in line with the install directory.
    ///
    /// Drops records whose archive is missing and deletes `*.tmp` leftovers.
    /// The registry is not saved; check [`ReconcileReport::registry_changed`].
    pub fn reconcile_with_disk(&mut self, install_dir: &Utf8Path) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let mut present = Vec::new();

        if install_dir.exists() {
            let entries = install_dir
                .read_dir_utf8()
                .map_err(|e| RegistryError::io(install_dir, e))?;

            for entry in entries {
                let entry = entry.map_err(|e| RegistryError::io(install_dir, e))?;
                if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    continue;
                }

                let name = entry.file_name().to_string();
                if is_temp_file(&name) {
                    match std::fs::remove_file(entry.path()) {
                        Ok(()) => report.removed_temp_files.push(name),
                        Err(e) => {
                            tracing::warn!(
                                path = %entry.path(),
                                error = %e,
                                "Failed to remove temp file"
                            )
                        }
                    }
                } else {
                    present.push(name);
                }
            }
        }

        let missing: Vec<String> = self
            .records
            .values()
            .filter(|r| !present.contains(&r.file_name))
            .map(|r| r.character_id.clone())
            .collect();

        for character_id in missing {
            if let Some(record) = self.records.remove(&character_id) {
                tracing::warn!(
                    character_id = %record.character_id,
                    file_name = %record.file_name,
                    "Dropping registry entry with missing archive"
                );
                report.dropped.push(record);
            }
        }

        if !report.removed_temp_files.is_empty() {
            tracing::info!(count = report.removed_temp_files.len(), "Removed leftover temp files");
        }

        Ok(report)
    }

    /// Deletes archives with `extension` that no record references.
    ///
    /// Returns the deleted file names.
    pub fn sweep_unreferenced(
        &self,
        install_dir: &Utf8Path,
        extension: &str,
    ) -> Result<Vec<String>> {
        let extension = extension.trim_start_matches('.');
        let mut removed = Vec::new();

        if !install_dir.exists() {
            return Ok(removed);
        }

        let entries = install_dir
            .read_dir_utf8()
            .map_err(|e| RegistryError::io(install_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(install_dir, e))?;
            let path = entry.path();
            if path.extension() != Some(extension) || self.file_owner(entry.file_name()).is_some() {
                continue;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::info!(%path, "Removed unreferenced archive");
                    removed.push(entry.file_name().to_string());
                }
                Err(e) => {
                    tracing::warn!(%path, error = %e, "Failed to remove unreferenced archive")
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(character_id: &str, file_name: &str) -> InstalledModRecord {
        InstalledModRecord::new(character_id, "1", file_name, character_id)
    }

    #[test]
    fn test_upsert_replaces_per_character() {
        let mut registry = Registry::empty(Box::new(MemoryStore::new()));
        assert!(registry.upsert(record("Ahri", "a.fantome")).is_none());

        let previous = registry.upsert(record("Ahri", "b.fantome")).unwrap();
        assert_eq!(previous.file_name, "a.fantome");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Ahri").unwrap().file_name, "b.fantome");
    }

    #[test]
    fn test_remove_many_skips_unknown() {
        let mut registry = Registry::empty(Box::new(MemoryStore::new()));
        registry.upsert(record("Ahri", "a.fantome"));
        registry.upsert(record("Zed", "z.fantome"));

        let removed = registry.remove_many(["Ahri", "Lux"]);
        assert_eq!(removed.len(), 1);
        assert!(registry.contains("Zed"));
        assert!(!registry.contains("Ahri"));
    }

    #[test]
    fn test_file_names_sorted() {
        let mut registry = Registry::empty(Box::new(MemoryStore::new()));
        registry.upsert(record("Zed", "b.fantome"));
        registry.upsert(record("Ahri", "c.fantome"));
        registry.upsert(record("Lux", "a.fantome"));

        assert_eq!(registry.file_names(), vec!["a.fantome", "b.fantome", "c.fantome"]);
        assert_eq!(registry.file_owner("c.fantome").unwrap().character_id, "Ahri");
    }

    #[test]
    fn test_generation_stamping() {
        let mut registry = Registry::empty(Box::new(MemoryStore::new()));
        registry.upsert(record("Ahri", "a.fantome"));
        registry.upsert(record("Zed", "z.fantome"));

        assert_eq!(registry.stale_records(1).len(), 2);
        assert_eq!(registry.stamp_generation(1), 2);
        assert_eq!(registry.stamp_generation(1), 0);
        assert!(registry.stale_records(1).is_empty());

        registry.upsert(record("Lux", "l.fantome"));
        let stale = registry.stale_records(1);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].character_id, "Lux");
    }

    #[test]
    fn test_save_goes_through_store() {
        let store = MemoryStore::new();
        let mut registry = Registry::empty(Box::new(store.clone()));
        registry.upsert(record("Ahri", "a.fantome"));
        registry.save().unwrap();

        assert_eq!(store.snapshot().len(), 1);
    }
}
