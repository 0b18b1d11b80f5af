use camino::Utf8PathBuf;
use colored::Colorize;
use ltk_skin_manager::game_path;

use super::Context;
use crate::errors::CliError;
use crate::utils::config::AppConfig;

/// Print a config path entry with status indicator
fn print_path_config(
    name: &str,
    path: Option<&Utf8PathBuf>,
    validator: impl Fn(&Utf8PathBuf) -> bool,
) {
    match path {
        Some(p) => {
            let status = if validator(p) {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

pub fn show_config(ctx: &Context) -> miette::Result<()> {
    let cfg = &ctx.config;

    println!();
    println!("  {} {}", "config_file:".bright_white(), ctx.config_path);

    print_path_config("game_path", cfg.game_path.as_ref(), |p| game_path::is_game_dir(p));
    print_path_config("mod_tools_path", cfg.mod_tools_path().as_ref(), |p| p.is_file());
    print_path_config("data_dir", cfg.data_dir().as_ref(), |p| p.is_dir());
    print_path_config("credits_file", cfg.credits_file.as_ref(), |p| p.is_file());

    for (key, value) in cfg.entries() {
        if key.ends_with("_path") || key.ends_with("_dir") || key.ends_with("_file") {
            continue;
        }
        println!(
            "  {} {}",
            format!("{}:", key).bright_white(),
            value.unwrap_or_default()
        );
    }

    println!();
    Ok(())
}

pub fn set_config_value(ctx: &Context, key: &str, value: &str) -> miette::Result<()> {
    let mut cfg = ctx.config.clone();
    cfg.set(key, value)?;

    if key == "game_path" {
        if let Some(path) = cfg.game_path.as_ref().filter(|p| !game_path::is_game_dir(p)) {
            return Err(CliError::InvalidGamePath { path: path.clone() }.into());
        }
    }

    cfg.save(&ctx.config_path)?;

    println!("{}", format!("✓ {key} updated").bright_green().bold());
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), ctx.config_path);
    Ok(())
}

pub fn detect_game(ctx: &Context) -> miette::Result<()> {
    println!("{}", "Searching for the game installation...".bright_cyan());
    println!();

    let Some(detected) = game_path::detect_game_dir() else {
        println!(
            "{}",
            "✗ Could not automatically detect the game installation"
                .bright_red()
                .bold()
        );
        println!();
        println!(
            "  {} Use 'skin-hunter config set game_path <dir>' to set the path manually",
            "•".bright_cyan()
        );
        println!(
            "  {} {}",
            "Example:".bright_white().bold(),
            game_path::DEFAULT_GAME_DIR
        );
        return Err(CliError::GameNotFound.into());
    };

    println!("{}", "✓ Found the game!".bright_green().bold());
    println!();
    println!(
        "  {} {}",
        "Path:".bright_white().bold(),
        detected.as_str().bright_green()
    );

    let mut cfg = ctx.config.clone();
    cfg.game_path = Some(detected);
    cfg.save(&ctx.config_path)?;

    println!();
    println!(
        "{}",
        "✓ Configuration updated successfully!"
            .bright_green()
            .bold()
    );
    Ok(())
}

pub fn reset_config(ctx: &Context) -> miette::Result<()> {
    AppConfig::default().save(&ctx.config_path)?;

    println!(
        "{}",
        "✓ Configuration reset to defaults".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), ctx.config_path);
    println!();
    println!(
        "  {}",
        "Run 'skin-hunter config detect-game' to find your game installation".bright_cyan()
    );
    Ok(())
}
