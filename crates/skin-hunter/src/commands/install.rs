use camino::Utf8PathBuf;
use colored::Colorize;
use ltk_skin_manager::{ArchiveSource, DisplayMeta, InstallRequest};

use super::{follow_overlay, open_manager, Context};
use crate::errors::CliError;
use crate::println_pad;

pub struct InstallSkinArgs {
    pub archive: Utf8PathBuf,
    pub character_id: String,
    pub mod_id: String,
    pub name: String,
    pub chroma: Option<String>,
    pub thumbnail: Option<String>,
    /// Stop the overlay right after the install instead of following it.
    pub no_run: bool,
}

pub async fn install_skin(ctx: &Context, args: InstallSkinArgs) -> miette::Result<()> {
    if !args.archive.is_file() {
        return Err(CliError::ArchiveNotFound { path: args.archive }.into());
    }

    let manager = open_manager(ctx)?;

    let mut meta = DisplayMeta::new(args.name);
    if let Some(chroma) = args.chroma {
        meta = meta.with_chroma(chroma);
    }
    if let Some(thumbnail) = args.thumbnail {
        meta = meta.with_thumbnail(thumbnail);
    }

    println_pad!(
        "{} {} for {}",
        "Installing".bright_cyan(),
        meta.display_name.bright_white().bold(),
        args.character_id.bright_white()
    );

    let result = manager
        .install_mod(InstallRequest {
            character_id: args.character_id,
            mod_id: args.mod_id,
            archive: ArchiveSource::File(args.archive),
            meta,
        })
        .await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            manager.shutdown().await;
            return Err(CliError::from(e).into());
        }
    };

    if let Some(previous) = &report.replaced {
        println_pad!(
            "{} {}",
            "Replaced".bright_yellow(),
            previous.display_name.bright_white()
        );
    }
    println_pad!(
        "{} {}",
        "✓ Installed".bright_green().bold(),
        report.record.file_name.bright_white()
    );

    if args.no_run {
        manager.shutdown().await;
        return Ok(());
    }
    follow_overlay(&manager).await;
    Ok(())
}
