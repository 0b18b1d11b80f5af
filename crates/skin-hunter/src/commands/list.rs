use colored::Colorize;
use ltk_skin_registry::{InstalledModRecord, JsonFileStore, Registry};
use miette::IntoDiagnostic;

use super::Context;
use crate::println_pad;

pub struct ListSkinsArgs {
    pub json: bool,
}

pub fn list_skins(ctx: &Context, args: ListSkinsArgs) -> miette::Result<()> {
    let layout = ctx.config.layout()?;
    let store = JsonFileStore::new(layout.registry_file());
    let registry = Registry::load(Box::new(store)).map_err(crate::errors::CliError::from)?;
    let records: Vec<&InstalledModRecord> = registry.records().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&records).into_diagnostic()?);
        return Ok(());
    }

    if records.is_empty() {
        println_pad!("{}", "No skins installed".bright_yellow());
        return Ok(());
    }

    let install_dir = layout.install_dir();
    for record in records {
        let present = if install_dir.join(&record.file_name).is_file() {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        let name = match &record.chroma_name {
            Some(chroma) => format!("{} ({chroma})", record.display_name),
            None => record.display_name.clone(),
        };
        println_pad!(
            "{} {} {} {}",
            present,
            format!("{}:", record.character_id).bright_white().bold(),
            name.bright_cyan(),
            record.file_name.dimmed()
        );
    }
    Ok(())
}
