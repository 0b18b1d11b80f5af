use colored::Colorize;

use super::{open_manager, Context};
use crate::errors::CliError;
use crate::println_pad;

pub struct UninstallSkinsArgs {
    pub character_ids: Vec<String>,
}

pub async fn uninstall_skins(ctx: &Context, args: UninstallSkinsArgs) -> miette::Result<()> {
    let manager = open_manager(ctx)?;

    let result = match args.character_ids.as_slice() {
        [single] => manager.uninstall_mod(single).await,
        many => manager.uninstall_many(many).await,
    };
    manager.shutdown().await;
    let report = result.map_err(CliError::from)?;

    for record in &report.removed {
        println_pad!(
            "{} {} ({})",
            "✓ Removed".bright_green(),
            record.display_name.bright_white(),
            record.character_id
        );
    }
    for path in &report.parked {
        println_pad!(
            "{} {} is in use and will be deleted by 'skin-hunter cleanup'",
            "•".bright_yellow(),
            path
        );
    }
    for character_id in &report.not_found {
        println_pad!("{} no skin installed for {}", "•".bright_yellow(), character_id);
    }
    for character_id in &report.failed {
        println_pad!("{} could not remove the skin of {}", "✗".bright_red(), character_id);
    }

    if !report.removed.is_empty() {
        println_pad!(
            "{}",
            "The overlay is stopped, run 'skin-hunter run' to start it again".bright_cyan()
        );
    }
    Ok(())
}
