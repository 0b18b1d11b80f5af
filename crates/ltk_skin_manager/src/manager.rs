use std::sync::Arc;

use camino::Utf8PathBuf;
use ltk_overlay_supervisor::{
    EventHub, OverlayState, StartOutcome, StopOutcome, Supervisor, SupervisorConfig,
    SupervisorStatus,
};
use ltk_skin_registry::{archive_file_name, InstalledModRecord, Registry, RegistryStore};
use tokio::sync::{watch, Mutex, MutexGuard};

use crate::archive::{self, ArchiveSource, Removal};
use crate::credits::CreditLedger;
use crate::error::{ManagerError, Result};
use crate::layout::DataLayout;
use crate::tool::ModFormatTool;

/// Directories and settings used by [`SkinManager`].
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub install_dir: Utf8PathBuf,
    pub profile_dir: Utf8PathBuf,
    /// Passed to the credit ledger.
    pub user_id: String,
    /// Extension of archive files, without the dot.
    pub archive_extension: String,
    pub supervisor: SupervisorConfig,
}

impl ManagerConfig {
    pub fn new(layout: &DataLayout) -> Self {
        Self {
            install_dir: layout.install_dir(),
            profile_dir: layout.profile_dir(),
            user_id: "local".to_string(),
            archive_extension: "fantome".to_string(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

/// Presentation metadata for an installed skin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayMeta {
    pub display_name: String,
    pub chroma_name: Option<String>,
    pub thumbnail_ref: Option<String>,
}

impl DisplayMeta {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    pub fn with_chroma(mut self, chroma_name: impl Into<String>) -> Self {
        self.chroma_name = Some(chroma_name.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_ref: impl Into<String>) -> Self {
        self.thumbnail_ref = Some(thumbnail_ref.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub character_id: String,
    pub mod_id: String,
    pub archive: ArchiveSource,
    pub meta: DisplayMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub record: InstalledModRecord,
    /// Previous skin of the same character.
    pub replaced: Option<InstalledModRecord>,
    pub overlay: StartOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    pub removed: Vec<InstalledModRecord>,
    /// Archives that could not be deleted and were renamed for later cleanup.
    pub parked: Vec<Utf8PathBuf>,
    pub not_found: Vec<String>,
    /// Characters whose archive could be neither deleted nor parked.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub dropped: Vec<InstalledModRecord>,
    pub removed_temp_files: Vec<String>,
    pub removed_archives: Vec<String>,
}

fn normalize_chroma(chroma_name: Option<String>) -> Option<String> {
    chroma_name.filter(|chroma| {
        let chroma = chroma.trim();
        !chroma.is_empty() && !chroma.eq_ignore_ascii_case("null")
    })
}

/// Serializes install/uninstall/start/stop against the registry and the
/// overlay process.
///
/// Mutating operations never queue: while one is in flight, the others fail
/// with [`ManagerError::TransitionConflict`].
pub struct SkinManager<T, C> {
    config: ManagerConfig,
    registry: Mutex<Registry>,
    supervisor: Supervisor,
    tool: T,
    credits: C,
}

impl<T, C> std::fmt::Debug for SkinManager<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkinManager")
            .field("config", &self.config)
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

impl<T, C> SkinManager<T, C>
where
    T: ModFormatTool,
    C: CreditLedger,
{
    /// Loads and reconciles the registry, creating missing directories.
    pub fn open(
        config: ManagerConfig,
        store: Box<dyn RegistryStore>,
        tool: T,
        credits: C,
    ) -> Result<Self> {
        for dir in [&config.install_dir, &config.profile_dir] {
            std::fs::create_dir_all(dir).map_err(|e| ManagerError::file_io(dir, e))?;
        }

        let mut registry = Registry::load(store)?;
        let report = registry.reconcile_with_disk(&config.install_dir)?;
        if report.registry_changed() {
            registry.save()?;
        }

        tracing::info!(
            installed = registry.len(),
            dropped = report.dropped.len(),
            "Skin manager ready"
        );

        let supervisor = Supervisor::new(config.supervisor.clone());
        Ok(Self {
            config,
            registry: Mutex::new(registry),
            supervisor,
            tool,
            credits,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn status(&self) -> SupervisorStatus {
        self.supervisor.status()
    }

    pub fn watch(&self) -> watch::Receiver<SupervisorStatus> {
        self.supervisor.watch()
    }

    pub fn events(&self) -> Arc<EventHub> {
        self.supervisor.events()
    }

    pub fn log_history(&self) -> Vec<String> {
        self.supervisor.log_history()
    }

    /// Installed skins, ordered by character.
    pub async fn installed(&self) -> Vec<InstalledModRecord> {
        self.registry.lock().await.records().cloned().collect()
    }

    /// Installed skins the current overlay process has not loaded.
    pub async fn stale(&self) -> Vec<InstalledModRecord> {
        let generation = self.supervisor.status().generation;
        self.registry
            .lock()
            .await
            .stale_records(generation)
            .into_iter()
            .cloned()
            .collect()
    }

    fn begin(&self, operation: &str) -> Result<MutexGuard<'_, Registry>> {
        self.registry.try_lock().map_err(|_| {
            tracing::debug!(operation, "Rejected, another operation is in flight");
            ManagerError::TransitionConflict {
                reason: format!("cannot {operation} while another skin operation is running"),
            }
        })
    }

    /// Installs (or replaces) the skin of one character and restarts the overlay.
    ///
    /// The registry is saved before the overlay is rebuilt, so a failure in
    /// the last two steps leaves the skin installed but the overlay stopped.
    pub async fn install_mod(&self, request: InstallRequest) -> Result<InstallReport> {
        let mut registry = self.begin("install")?;
        let InstallRequest {
            character_id,
            mod_id,
            archive: source,
            meta,
        } = request;

        let chroma_name = normalize_chroma(meta.chroma_name);
        let file_name = archive_file_name(
            &meta.display_name,
            chroma_name.as_deref(),
            &self.config.archive_extension,
        );

        if let Some(owner) = registry
            .file_owner(&file_name)
            .filter(|owner| owner.character_id != character_id)
        {
            return Err(ManagerError::FileNameConflict {
                file_name,
                owner: owner.character_id.clone(),
            });
        }
        if let ArchiveSource::File(path) = &source {
            if !path.is_file() {
                return Err(ManagerError::file_io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "archive not found"),
                ));
            }
        }

        let decision = self.credits.try_consume_credit(&self.config.user_id).await?;
        if !decision.granted {
            tracing::info!(%character_id, "Install denied, no credits left");
            return Err(ManagerError::InsufficientCredit {
                user_id: self.config.user_id.clone(),
            });
        }

        tracing::info!(%character_id, %mod_id, %file_name, "Installing skin");
        self.supervisor.stop().await?;
        archive::clean_temp_files(&self.config.install_dir).await?;

        let path = self.config.install_dir.join(&file_name);
        archive::place_archive(&source, &path).await?;

        if let Err(e) = self.tool.import(&path).await {
            tracing::error!(%character_id, error = %e, "Import failed");
            if registry.file_owner(&file_name).is_none() {
                archive::discard_archive(&path).await;
            }
            return Err(e.into());
        }

        let mut record = InstalledModRecord::new(
            character_id.clone(),
            mod_id,
            file_name.clone(),
            meta.display_name,
        )
        .installed_now();
        record.chroma_name = chroma_name;
        record.thumbnail_ref = meta.thumbnail_ref;

        let replaced = registry.upsert(record.clone());
        if let Err(e) = registry.save() {
            match &replaced {
                Some(previous) => {
                    registry.upsert(previous.clone());
                }
                None => {
                    registry.remove(&character_id);
                }
            }
            if registry.file_owner(&file_name).is_none() {
                archive::discard_archive(&path).await;
            }
            return Err(e.into());
        }

        if let Some(previous) = replaced.as_ref().filter(|p| p.file_name != file_name) {
            let old = self.config.install_dir.join(&previous.file_name);
            match archive::remove_archive(&old).await {
                Ok(removal) => tracing::debug!(path = %old, ?removal, "Removed replaced archive"),
                Err(e) => {
                    tracing::warn!(path = %old, error = %e, "Failed to remove replaced archive")
                }
            }
        }

        self.rebuild_overlay(&registry).await?;
        let overlay = self.launch(&mut registry).await?;

        Ok(InstallReport {
            record,
            replaced,
            overlay,
        })
    }

    /// Uninstalls the skin of one character. The overlay stays stopped.
    ///
    /// An unknown character is reported as [`ManagerError::NotFound`] without
    /// touching the overlay or the disk.
    pub async fn uninstall_mod(&self, character_id: &str) -> Result<UninstallReport> {
        let mut registry = self.begin("uninstall")?;
        if !registry.contains(character_id) {
            return Err(ManagerError::NotFound {
                character_id: character_id.to_string(),
            });
        }

        let (report, mut errors) = self
            .uninstall_locked(&mut registry, vec![character_id.to_string()])
            .await?;
        match errors.pop() {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }

    /// Uninstalls several characters at once. Unknown ids are listed in
    /// [`UninstallReport::not_found`].
    pub async fn uninstall_many<S>(&self, character_ids: &[S]) -> Result<UninstallReport>
    where
        S: AsRef<str> + Sync,
    {
        let mut registry = self.begin("uninstall")?;

        let (targets, not_found): (Vec<String>, Vec<String>) = character_ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .partition(|id| registry.contains(id));

        if targets.is_empty() {
            return Ok(UninstallReport {
                not_found,
                ..UninstallReport::default()
            });
        }

        let (mut report, _errors) = self.uninstall_locked(&mut registry, targets).await?;
        report.not_found = not_found;
        Ok(report)
    }

    async fn uninstall_locked(
        &self,
        registry: &mut Registry,
        targets: Vec<String>,
    ) -> Result<(UninstallReport, Vec<ManagerError>)> {
        self.supervisor.stop().await?;

        let mut report = UninstallReport::default();
        let mut errors = Vec::new();
        let mut done = Vec::new();

        for character_id in targets {
            let Some(record) = registry.get(&character_id) else {
                report.not_found.push(character_id);
                continue;
            };
            let path = self.config.install_dir.join(&record.file_name);

            match archive::remove_archive(&path).await {
                Ok(Removal::Parked(parked)) => {
                    report.parked.push(parked);
                    done.push(character_id);
                }
                Ok(Removal::Deleted | Removal::Missing) => done.push(character_id),
                Err(e) => {
                    tracing::error!(%character_id, error = %e, "Failed to remove archive");
                    report.failed.push(character_id);
                    errors.push(e);
                }
            }
        }

        report.removed = registry.remove_many(&done);
        if !report.removed.is_empty() {
            registry.save()?;
            self.rebuild_overlay(registry).await?;
            tracing::info!(count = report.removed.len(), "Uninstalled skins");
        }

        Ok((report, errors))
    }

    /// Starts the overlay with the installed skins.
    pub async fn start_overlay(&self) -> Result<StartOutcome> {
        let mut registry = self.begin("start the overlay")?;

        let status = self.supervisor.status();
        if status.state == OverlayState::Running {
            return Ok(StartOutcome::AlreadyRunning {
                pid: status.pid,
                generation: status.generation,
            });
        }

        let stale = !registry.stale_records(status.generation).is_empty();
        if stale || !self.config.profile_dir.exists() {
            self.rebuild_overlay(&registry).await?;
        }
        self.launch(&mut registry).await
    }

    pub async fn stop_overlay(&self) -> Result<StopOutcome> {
        let _registry = self.begin("stop the overlay")?;
        Ok(self.supervisor.stop().await?)
    }

    /// Reconciles the registry with the install directory and deletes
    /// archives that no record references.
    ///
    /// If records had to be dropped the overlay is stopped and its profile
    /// rebuilt.
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let mut registry = self.begin("clean up")?;

        let reconcile = registry.reconcile_with_disk(&self.config.install_dir)?;
        let removed_archives = registry
            .sweep_unreferenced(&self.config.install_dir, &self.config.archive_extension)?;

        if reconcile.registry_changed() {
            self.supervisor.stop().await?;
            registry.save()?;
            self.rebuild_overlay(&registry).await?;
        }

        Ok(CleanupReport {
            dropped: reconcile.dropped,
            removed_temp_files: reconcile.removed_temp_files,
            removed_archives,
        })
    }

    /// Stops the overlay for application exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down skin manager");
        self.supervisor.shutdown().await;
    }

    async fn rebuild_overlay(&self, registry: &Registry) -> Result<()> {
        self.tool
            .make_overlay(
                &self.config.install_dir,
                &self.config.profile_dir,
                &registry.file_names(),
            )
            .await?;
        Ok(())
    }

    async fn launch(&self, registry: &mut Registry) -> Result<StartOutcome> {
        let status = self.supervisor.status();
        if status.state == OverlayState::Running {
            return Ok(StartOutcome::AlreadyRunning {
                pid: status.pid,
                generation: status.generation,
            });
        }

        let command = self.tool.prepare_overlay(&self.config.profile_dir).await;
        let outcome = self.supervisor.start(command).await?;

        if let StartOutcome::Started { generation, .. } = outcome {
            if registry.stamp_generation(generation) > 0 {
                if let Err(e) = registry.save() {
                    tracing::warn!(generation, error = %e, "Failed to save process generation");
                }
            }
        }
        Ok(outcome)
    }
}
