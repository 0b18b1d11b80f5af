use camino::{Utf8Path, Utf8PathBuf};
use ltk_skin_registry::{InstalledModRecord, JsonFileStore, Registry, RegistryStore};
use tempfile::TempDir;

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

fn json_store(root: &Utf8Path) -> Box<dyn RegistryStore> {
    Box::new(JsonFileStore::new(root.join("installed.json")))
}

fn sample(count: usize) -> Vec<InstalledModRecord> {
    (0..count)
        .map(|i| {
            let mut record = InstalledModRecord::new(
                format!("Champion{i}"),
                format!("{}", 1000 + i),
                format!("skin-{i}.fantome"),
                format!("Skin {i}"),
            );
            if i % 2 == 1 {
                record = record.with_chroma(format!("Chroma {i}")).with_thumbnail("thumb.png");
            }
            if i % 3 == 0 {
                record.process_generation = Some(i as u64);
            }
            record
        })
        .collect()
}

#[test]
fn save_then_load_yields_equal_registry() {
    for count in [0, 1, 7] {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);

        let mut registry = Registry::empty(json_store(&root));
        for record in sample(count) {
            registry.upsert(record);
        }
        registry.save().unwrap();

        let loaded = Registry::load(json_store(&root)).unwrap();
        assert_eq!(loaded.len(), count);
        assert!(registry.records().eq(loaded.records()), "mismatch for {count} records");
    }
}

#[test]
fn corrupt_registry_recovers_as_empty() {
    let dir = TempDir::new().unwrap();
    let root = utf8(&dir);
    std::fs::write(root.join("installed.json"), "{\"truncated\": [").unwrap();

    let registry = Registry::load(json_store(&root)).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn legacy_registry_file_is_readable() {
    let dir = TempDir::new().unwrap();
    let root = utf8(&dir);
    std::fs::write(
        root.join("installed.json"),
        r#"[{
            "championId": "Aatrox",
            "skinId": 266003,
            "fileName": "blood-moon-aatrox.fantome",
            "processId": 0,
            "chromaName": "",
            "skinName": "Blood Moon Aatrox",
            "imageUrl": ""
        }]"#,
    )
    .unwrap();

    let registry = Registry::load(json_store(&root)).unwrap();
    let record = registry.get("Aatrox").unwrap();
    assert_eq!(record.mod_id, "266003");
    assert_eq!(record.file_name, "blood-moon-aatrox.fantome");
    assert_eq!(record.chroma_name, None);
}

#[test]
fn reconcile_drops_only_missing_entries() {
    let dir = TempDir::new().unwrap();
    let install_dir = utf8(&dir).join("installed");
    std::fs::create_dir_all(&install_dir).unwrap();
    std::fs::write(install_dir.join("a.fantome"), b"a").unwrap();
    std::fs::write(install_dir.join("c.fantome"), b"c").unwrap();

    let mut registry = Registry::empty(json_store(&utf8(&dir)));
    registry.upsert(InstalledModRecord::new("Ahri", "1", "a.fantome", "A"));
    registry.upsert(InstalledModRecord::new("Braum", "2", "b.fantome", "B"));
    registry.upsert(InstalledModRecord::new("Caitlyn", "3", "c.fantome", "C"));
    let untouched_a = registry.get("Ahri").cloned();
    let untouched_c = registry.get("Caitlyn").cloned();

    let report = registry.reconcile_with_disk(&install_dir).unwrap();

    assert!(report.registry_changed());
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].character_id, "Braum");
    assert_eq!(registry.get("Ahri").cloned(), untouched_a);
    assert_eq!(registry.get("Caitlyn").cloned(), untouched_c);
}

#[test]
fn crash_recovery_keeps_existing_file_and_sweeps_temp() {
    let dir = TempDir::new().unwrap();
    let root = utf8(&dir);
    let install_dir = root.join("installed");
    std::fs::create_dir_all(&install_dir).unwrap();
    std::fs::write(install_dir.join("file-a.fantome"), b"a").unwrap();
    std::fs::write(install_dir.join("file-b.fantome.tmp"), b"half deleted").unwrap();

    let mut before = Registry::empty(json_store(&root));
    before.upsert(InstalledModRecord::new("Ahri", "1", "file-a.fantome", "A"));
    before.upsert(InstalledModRecord::new("Braum", "2", "file-b.fantome", "B"));
    before.save().unwrap();

    let mut registry = Registry::load(json_store(&root)).unwrap();
    let report = registry.reconcile_with_disk(&install_dir).unwrap();
    registry.save().unwrap();

    assert_eq!(registry.file_names(), vec!["file-a.fantome"]);
    assert_eq!(report.removed_temp_files, vec!["file-b.fantome.tmp"]);
    assert!(!install_dir.join("file-b.fantome.tmp").exists());

    let reloaded = Registry::load(json_store(&root)).unwrap();
    assert_eq!(reloaded.file_names(), vec!["file-a.fantome"]);
}

#[test]
fn sweep_removes_unreferenced_archives_only() {
    let dir = TempDir::new().unwrap();
    let root = utf8(&dir);
    let install_dir = root.join("installed");
    std::fs::create_dir_all(&install_dir).unwrap();
    std::fs::write(install_dir.join("kept.fantome"), b"k").unwrap();
    std::fs::write(install_dir.join("orphan.fantome"), b"o").unwrap();
    std::fs::write(install_dir.join("notes.txt"), b"n").unwrap();

    let mut registry = Registry::empty(json_store(&root));
    registry.upsert(InstalledModRecord::new("Ahri", "1", "kept.fantome", "K"));

    let removed = registry.sweep_unreferenced(&install_dir, "fantome").unwrap();

    assert_eq!(removed, vec!["orphan.fantome"]);
    assert!(install_dir.join("kept.fantome").exists());
    assert!(install_dir.join("notes.txt").exists());
}
