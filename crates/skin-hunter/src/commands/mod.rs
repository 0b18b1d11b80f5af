use camino::Utf8PathBuf;
use colored::Colorize;
use ltk_overlay_supervisor::{EventKind, OverlayEvent};
use ltk_skin_manager::{
    game_path, CreditLedger, CreditSource, ModFormatTool, ModTools, SkinManager,
};
use ltk_skin_registry::JsonFileStore;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;

mod cleanup;
mod config;
mod install;
mod list;
mod run;
mod uninstall;

pub use cleanup::cleanup_skins;
pub use config::{detect_game, reset_config, set_config_value, show_config};
pub use install::{install_skin, InstallSkinArgs};
pub use list::{list_skins, ListSkinsArgs};
pub use run::run_overlay;
pub use uninstall::{uninstall_skins, UninstallSkinsArgs};

/// Loaded configuration and where it came from.
pub struct Context {
    pub config: AppConfig,
    pub config_path: Utf8PathBuf,
}

pub type Manager = SkinManager<ModTools, CreditSource>;

/// Configured game directory, auto-detected when unset.
fn resolve_game_dir(config: &AppConfig) -> Result<Utf8PathBuf, CliError> {
    match &config.game_path {
        Some(path) if game_path::is_game_dir(path) => Ok(path.clone()),
        Some(path) => Err(CliError::InvalidGamePath { path: path.clone() }),
        None => game_path::detect_game_dir().ok_or(CliError::GameNotFound),
    }
}

fn resolve_mod_tools(config: &AppConfig) -> Result<Utf8PathBuf, CliError> {
    let path = config.mod_tools_path().ok_or(CliError::ConfigPathUnknown)?;
    if !path.is_file() {
        return Err(CliError::ModToolsNotFound { path });
    }
    Ok(path)
}

pub(crate) fn open_manager(ctx: &Context) -> Result<Manager, CliError> {
    let game_dir = resolve_game_dir(&ctx.config)?;
    let tools = ModTools::new(resolve_mod_tools(&ctx.config)?, game_dir);
    let layout = ctx.config.layout()?;
    let credits = CreditSource::from_file(ctx.config.credits_file.clone());

    tracing::debug!(
        data_dir = %layout.root(),
        game_dir = %tools.game_dir(),
        "Opening skin manager"
    );
    let store = JsonFileStore::new(layout.registry_file());
    Ok(SkinManager::open(
        ctx.config.manager_config()?,
        Box::new(store),
        tools,
        credits,
    )?)
}

/// Prints overlay events until the overlay stops or Ctrl-C is pressed,
/// then shuts the overlay down.
pub(crate) async fn follow_overlay<T, C>(manager: &SkinManager<T, C>)
where
    T: ModFormatTool,
    C: CreditLedger,
{
    let mut events = manager.events().subscribe(&EventKind::ALL);
    if !manager.status().state.has_process() {
        manager.events().unsubscribe(events.id());
        manager.shutdown().await;
        return;
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println_pad!("{}", "Overlay running, press Ctrl-C to stop".bright_cyan());
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                println!();
                println_pad!("{}", "Stopping overlay...".bright_yellow());
                break;
            }
            event = events.recv() => match event {
                Some(OverlayEvent::StdoutLine { content, .. }) => println_pad!("{}", content),
                Some(OverlayEvent::StderrLine { content, .. }) => {
                    println_pad!("{}", content.bright_red())
                }
                Some(OverlayEvent::OverlayStarted { pid, generation, .. }) => println_pad!(
                    "{} pid {} (generation {})",
                    "✓ Overlay started".bright_green(),
                    pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                    generation
                ),
                Some(OverlayEvent::OverlayStopped { exit_error, message, exit_code, .. }) => {
                    let detail = message
                        .or_else(|| exit_code.map(|code| format!("exit code {code}")))
                        .unwrap_or_default();
                    if exit_error {
                        println_pad!("{} {}", "✗ Overlay stopped:".bright_red().bold(), detail);
                    } else {
                        println_pad!("{} {}", "Overlay stopped".bright_white(), detail);
                    }
                    break;
                }
                None => break,
            },
        }
    }

    manager.events().unsubscribe(events.id());
    manager.shutdown().await;
}
