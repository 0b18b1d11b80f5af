//! Application configuration stored in config.toml.

use std::env;
use std::fs;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use directories_next::ProjectDirs;
use ltk_overlay_supervisor::SupervisorConfig;
use ltk_skin_manager::{DataLayout, ManagerConfig};
use serde::{Deserialize, Serialize};

use crate::errors::CliError;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[cfg(windows)]
const MOD_TOOLS_EXE: &str = "mod-tools.exe";
#[cfg(not(windows))]
const MOD_TOOLS_EXE: &str = "mod-tools";

/// Keys accepted by `config set`, in display order.
pub const KEYS: [&str; 10] = [
    "game_path",
    "mod_tools_path",
    "data_dir",
    "user_id",
    "credits_file",
    "archive_extension",
    "ready_timeout_ms",
    "grace_period_ms",
    "kill_timeout_ms",
    "liveness_interval_ms",
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// The `Game` directory containing the game executable.
    pub game_path: Option<Utf8PathBuf>,
    pub mod_tools_path: Option<Utf8PathBuf>,
    pub data_dir: Option<Utf8PathBuf>,
    pub user_id: String,
    /// JSON ledger of install credits. Installs are unlimited when unset.
    pub credits_file: Option<Utf8PathBuf>,
    pub archive_extension: String,
    pub ready_timeout_ms: u64,
    pub grace_period_ms: u64,
    pub kill_timeout_ms: u64,
    pub liveness_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game_path: None,
            mod_tools_path: None,
            data_dir: None,
            user_id: "local".to_string(),
            credits_file: None,
            archive_extension: "fantome".to_string(),
            ready_timeout_ms: 15_000,
            grace_period_ms: 5_000,
            kill_timeout_ms: 5_000,
            liveness_interval_ms: 3_000,
        }
    }
}

impl AppConfig {
    /// Loads the config, returning defaults when the file does not exist.
    ///
    /// Values are checked with the same rules as [`AppConfig::set`].
    pub fn load(path: &Utf8Path) -> Result<Self, CliError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self =
                    toml::from_str(&content).map_err(|source| CliError::ConfigParse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                config.validated()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(CliError::Io { source }),
        }
    }

    fn validated(&self) -> Result<Self, CliError> {
        let mut checked = self.clone();
        for (key, value) in self.entries() {
            if let Some(value) = value {
                checked.set(key, &value)?;
            }
        }
        Ok(checked)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), CliError> {
        let write_err = |source| CliError::ConfigWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(std::io::Error::other)
            .map_err(write_err)?;
        fs::write(path, content).map_err(write_err)
    }

    /// Updates one key from its string form. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CliError> {
        let value = value.trim();
        let path = || (!value.is_empty()).then(|| Utf8PathBuf::from(value));

        match key {
            "game_path" => self.game_path = path(),
            "mod_tools_path" => self.mod_tools_path = path(),
            "data_dir" => self.data_dir = path(),
            "credits_file" => self.credits_file = path(),
            "user_id" => {
                if value.is_empty() {
                    return Err(CliError::invalid_value(key, value, "must not be empty"));
                }
                self.user_id = value.to_string();
            }
            "archive_extension" => {
                let extension = value.trim_start_matches('.');
                if extension.is_empty() || extension.contains(['/', '\\']) {
                    return Err(CliError::invalid_value(key, value, "expected a file extension"));
                }
                self.archive_extension = extension.to_string();
            }
            "ready_timeout_ms" => self.ready_timeout_ms = parse_millis(key, value)?,
            "grace_period_ms" => self.grace_period_ms = parse_millis(key, value)?,
            "kill_timeout_ms" => self.kill_timeout_ms = parse_millis(key, value)?,
            "liveness_interval_ms" => self.liveness_interval_ms = parse_millis(key, value)?,
            _ => {
                return Err(CliError::UnknownConfigKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Current value of every key, formatted for display.
    pub fn entries(&self) -> Vec<(&'static str, Option<String>)> {
        let path = |p: &Option<Utf8PathBuf>| p.as_ref().map(ToString::to_string);
        KEYS.iter()
            .map(|&key| {
                let value = match key {
                    "game_path" => path(&self.game_path),
                    "mod_tools_path" => path(&self.mod_tools_path),
                    "data_dir" => path(&self.data_dir),
                    "credits_file" => path(&self.credits_file),
                    "user_id" => Some(self.user_id.clone()),
                    "archive_extension" => Some(self.archive_extension.clone()),
                    "ready_timeout_ms" => Some(self.ready_timeout_ms.to_string()),
                    "grace_period_ms" => Some(self.grace_period_ms.to_string()),
                    "kill_timeout_ms" => Some(self.kill_timeout_ms.to_string()),
                    _ => Some(self.liveness_interval_ms.to_string()),
                };
                (key, value)
            })
            .collect()
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            ready_timeout: Duration::from_millis(self.ready_timeout_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
            kill_timeout: Duration::from_millis(self.kill_timeout_ms),
            liveness_interval: Duration::from_millis(self.liveness_interval_ms),
            ..SupervisorConfig::default()
        }
    }

    /// Configured data directory, or the platform default.
    pub fn data_dir(&self) -> Option<Utf8PathBuf> {
        self.data_dir.clone().or_else(default_data_dir)
    }

    pub fn layout(&self) -> Result<DataLayout, CliError> {
        self.data_dir()
            .map(DataLayout::new)
            .ok_or(CliError::DataDirUnknown)
    }

    pub fn manager_config(&self) -> Result<ManagerConfig, CliError> {
        let layout = self.layout()?;
        Ok(ManagerConfig {
            user_id: self.user_id.clone(),
            archive_extension: self.archive_extension.clone(),
            supervisor: self.supervisor_config(),
            ..ManagerConfig::new(&layout)
        })
    }

    /// Configured mod-tools executable, or the one shipped next to skin-hunter.
    pub fn mod_tools_path(&self) -> Option<Utf8PathBuf> {
        self.mod_tools_path
            .clone()
            .or_else(|| install_dir().map(|dir| dir.join(MOD_TOOLS_EXE)))
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64, CliError> {
    match value.parse::<u64>() {
        Ok(0) => Err(CliError::invalid_value(key, value, "must be greater than zero")),
        Ok(millis) => Ok(millis),
        Err(e) => Err(CliError::invalid_value(key, value, e.to_string())),
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "LeagueToolkit", "skin-hunter")
}

fn utf8(path: &std::path::Path) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path.to_path_buf()).ok()
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    exe.parent().and_then(utf8)
}

pub fn default_data_dir() -> Option<Utf8PathBuf> {
    project_dirs()
        .and_then(|dirs| utf8(dirs.data_dir()))
        .or_else(|| install_dir().map(|dir| dir.join("data")))
}

/// config.toml next to the executable when present, otherwise in the
/// platform config directory.
pub fn default_config_path() -> Option<Utf8PathBuf> {
    let portable = install_dir().map(|dir| dir.join(CONFIG_FILE_NAME));
    if portable.as_ref().is_some_and(|p| p.is_file()) {
        return portable;
    }

    project_dirs()
        .and_then(|dirs| utf8(dirs.config_dir()))
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .or(portable)
}
