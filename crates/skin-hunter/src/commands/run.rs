use colored::Colorize;
use ltk_overlay_supervisor::StartOutcome;

use super::{follow_overlay, open_manager, Context};
use crate::errors::CliError;
use crate::println_pad;

pub async fn run_overlay(ctx: &Context) -> miette::Result<()> {
    let manager = open_manager(ctx)?;
    let installed = manager.installed().await;
    if installed.is_empty() {
        println_pad!(
            "{}",
            "No skins installed, the overlay will not change anything".bright_yellow()
        );
    }

    let outcome = manager.start_overlay().await.map_err(CliError::from)?;
    if let StartOutcome::Started { pid, generation } = outcome {
        tracing::info!(?pid, generation, skins = installed.len(), "Overlay started");
    }
    println_pad!(
        "{} with {} skin(s)",
        "✓ Overlay ready".bright_green().bold(),
        installed.len()
    );

    follow_overlay(&manager).await;
    Ok(())
}
