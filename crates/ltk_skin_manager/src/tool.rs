//! Adapter for the external mod-format tool (`mod-tools`).

use std::future::Future;
use std::process::Stdio;

use camino::{Utf8Path, Utf8PathBuf};
use ltk_overlay_supervisor::{classify, kill_orphans, OverlayCommand};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to launch mod tool {path}: {source}")]
    Launch {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Mod tool '{subcommand}' failed{}: {output}", describe_exit_code(.exit_code))]
    Failed {
        subcommand: String,
        exit_code: Option<i32>,
        output: String,
    },
}

fn describe_exit_code(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| format!(" with exit code {code}"))
        .unwrap_or_default()
}

/// The three operations required of the external mod tool.
pub trait ModFormatTool: Send + Sync {
    /// Imports (validates and registers) an archive that is already in place.
    fn import(&self, archive: &Utf8Path) -> impl Future<Output = Result<(), ToolError>> + Send;

    /// Rebuilds the overlay profile from `mods`, file names inside `install_dir`.
    ///
    /// An empty list clears the profile.
    fn make_overlay(
        &self,
        install_dir: &Utf8Path,
        profile_dir: &Utf8Path,
        mods: &[String],
    ) -> impl Future<Output = Result<(), ToolError>> + Send;

    /// Command for the long-running overlay process.
    ///
    /// Called right before the supervisor spawns it, while no overlay is
    /// supervised.
    fn prepare_overlay(
        &self,
        profile_dir: &Utf8Path,
    ) -> impl Future<Output = OverlayCommand> + Send;
}

/// The `mod-tools` executable shipped with the application.
#[derive(Debug, Clone)]
pub struct ModTools {
    exe: Utf8PathBuf,
    game_dir: Utf8PathBuf,
}

impl ModTools {
    pub fn new(exe: impl Into<Utf8PathBuf>, game_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            game_dir: game_dir.into(),
        }
    }

    pub fn exe(&self) -> &Utf8Path {
        &self.exe
    }

    pub fn game_dir(&self) -> &Utf8Path {
        &self.game_dir
    }

    fn command(&self, subcommand: &str, args: Vec<String>) -> OverlayCommand {
        let command = OverlayCommand::new(self.exe.clone()).arg(subcommand).args(args);
        match self.exe.parent().filter(|dir| !dir.as_str().is_empty()) {
            Some(dir) => command.current_dir(dir),
            None => command,
        }
    }

    async fn run(&self, subcommand: &str, args: Vec<String>) -> Result<(), ToolError> {
        let command = self.command(subcommand, args);
        tracing::debug!(%command, "Running mod tool");

        let output = command
            .to_command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ToolError::Launch {
                path: self.exe.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in classify(&stdout).into_iter().chain(classify(&stderr)) {
            tracing::debug!(subcommand, "{}", line.text);
        }

        if output.status.success() {
            return Ok(());
        }

        let detail = if stderr.trim().is_empty() { stdout } else { stderr };
        Err(ToolError::Failed {
            subcommand: subcommand.to_string(),
            exit_code: output.status.code(),
            output: detail.trim().to_string(),
        })
    }
}

pub(crate) fn import_args(archive: &Utf8Path) -> Vec<String> {
    vec![archive.to_string(), archive.to_string(), "--noTFT".to_string()]
}

pub(crate) fn mkoverlay_args(
    install_dir: &Utf8Path,
    profile_dir: &Utf8Path,
    game_dir: &Utf8Path,
    mods: &[String],
) -> Vec<String> {
    let mut args = vec![
        install_dir.to_string(),
        profile_dir.to_string(),
        format!("--game:{game_dir}"),
    ];
    if !mods.is_empty() {
        args.push(format!("--mods:{}", mods.join("/")));
    }
    args
}

pub(crate) fn runoverlay_args(profile_dir: &Utf8Path, game_dir: &Utf8Path) -> Vec<String> {
    vec![
        profile_dir.to_string(),
        format!("--game:{game_dir}"),
        "configless".to_string(),
    ]
}

impl ModFormatTool for ModTools {
    async fn import(&self, archive: &Utf8Path) -> Result<(), ToolError> {
        self.run("import", import_args(archive)).await
    }

    async fn make_overlay(
        &self,
        install_dir: &Utf8Path,
        profile_dir: &Utf8Path,
        mods: &[String],
    ) -> Result<(), ToolError> {
        tracing::info!(count = mods.len(), "Rebuilding overlay profile");
        self.run(
            "mkoverlay",
            mkoverlay_args(install_dir, profile_dir, &self.game_dir, mods),
        )
        .await
    }

    async fn prepare_overlay(&self, profile_dir: &Utf8Path) -> OverlayCommand {
        // Scanning the process table blocks.
        let exe = self.exe.clone();
        match tokio::task::spawn_blocking(move || kill_orphans(&exe, &[])).await {
            Ok(0) => {}
            Ok(killed) => tracing::info!(killed, "Cleared stale overlay processes"),
            Err(e) => tracing::warn!(error = %e, "Failed to clear stale overlay processes"),
        }
        self.command("runoverlay", runoverlay_args(profile_dir, &self.game_dir))
    }
}
