//! Game directory detection.
//!
//! The overlay needs the `Game` directory that contains the game executable.

use camino::{Utf8Path, Utf8PathBuf};
use sysinfo::{Disks, System};

pub const GAME_EXE: &str = "League of Legends.exe";

/// Install location used when nothing else is configured or detected.
pub const DEFAULT_GAME_DIR: &str = "C:\\Riot Games\\League of Legends\\Game";

/// Whether `dir` contains the game executable.
pub fn is_game_dir(dir: &Utf8Path) -> bool {
    dir.join(GAME_EXE).is_file()
}

fn mount_points() -> Vec<Utf8PathBuf> {
    let disks = Disks::new_with_refreshed_list();
    let mut roots: Vec<Utf8PathBuf> = disks
        .iter()
        .filter_map(|disk| disk.mount_point().to_str().map(Utf8PathBuf::from))
        .collect();

    if roots.is_empty() && cfg!(target_os = "windows") {
        roots = ["C:", "D:", "E:", "F:"].into_iter().map(Utf8PathBuf::from).collect();
    }
    roots
}

/// Reads `RiotClientInstalls.json` for a regular (non-PBE) install.
fn from_riot_client_installs() -> Option<Utf8PathBuf> {
    let system_drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    let installs = Utf8PathBuf::from(format!("{system_drive}\\"))
        .join("ProgramData")
        .join("Riot Games")
        .join("RiotClientInstalls.json");

    let contents = std::fs::read_to_string(&installs).ok()?;
    game_dir_from_installs(&contents)
}

fn game_dir_from_installs(contents: &str) -> Option<Utf8PathBuf> {
    let data: serde_json::Value = serde_json::from_str(contents).ok()?;
    let clients = data.get("associated_client")?.as_object()?;

    clients.keys().find_map(|install| {
        let root = Utf8PathBuf::from(install.trim_end_matches(['/', '\\']));
        (root.file_name() == Some("League of Legends"))
            .then(|| root.join("Game"))
            .filter(|dir| is_game_dir(dir))
    })
}

/// Looks at running client or game processes.
fn from_running_process() -> Option<Utf8PathBuf> {
    let mut system = System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

    for name in ["LeagueClientUx.exe", "LeagueClient.exe", GAME_EXE] {
        for process in system.processes_by_name(name.as_ref()) {
            let Some(exe) = process
                .exe()
                .and_then(|p| Utf8PathBuf::from_path_buf(p.to_path_buf()).ok())
            else {
                continue;
            };
            let Some(parent) = exe.parent() else {
                continue;
            };

            let candidate = if name == GAME_EXE {
                parent.to_path_buf()
            } else {
                parent.join("Game")
            };
            if is_game_dir(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn from_common_paths() -> Option<Utf8PathBuf> {
    mount_points().into_iter().find_map(|root| {
        let root = Utf8PathBuf::from(root.as_str().trim_end_matches(['\\', '/']));
        ["", "Program Files", "Program Files (x86)"]
            .into_iter()
            .map(|prefix| {
                let base = if prefix.is_empty() { root.clone() } else { root.join(prefix) };
                base.join("Riot Games").join("League of Legends").join("Game")
            })
            .find(|dir| is_game_dir(dir))
    })
}

/// Auto-detects the game directory.
///
/// Tries, in order: `RiotClientInstalls.json`, running game processes,
/// common install roots on every mounted drive.
pub fn detect_game_dir() -> Option<Utf8PathBuf> {
    let detected = from_riot_client_installs()
        .or_else(from_running_process)
        .or_else(from_common_paths);

    match &detected {
        Some(dir) => tracing::info!(%dir, "Detected game directory"),
        None => tracing::debug!("Game directory not detected"),
    }
    detected
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_installs_file_skips_pbe() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        for install in ["League of Legends (PBE)", "League of Legends"] {
            let game = root.join(install).join("Game");
            std::fs::create_dir_all(&game).unwrap();
            std::fs::write(game.join(GAME_EXE), b"").unwrap();
        }

        let contents = serde_json::json!({
            "associated_client": {
                format!("{root}/League of Legends (PBE)/"): "pbe",
                format!("{root}/League of Legends/"): "live",
            }
        })
        .to_string();

        assert_eq!(
            game_dir_from_installs(&contents),
            Some(root.join("League of Legends").join("Game"))
        );
    }

    #[test]
    fn test_missing_executable_is_not_a_game_dir() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(!is_game_dir(&root));
    }
}
