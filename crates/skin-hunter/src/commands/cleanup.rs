use colored::Colorize;

use super::{open_manager, Context};
use crate::errors::CliError;
use crate::println_pad;

fn plural(count: usize, noun: &str) -> String {
    match count {
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

pub async fn cleanup_skins(ctx: &Context) -> miette::Result<()> {
    let manager = open_manager(ctx)?;
    let result = manager.cleanup().await;
    manager.shutdown().await;
    let report = result.map_err(CliError::from)?;

    for record in &report.dropped {
        println_pad!(
            "{} {} (archive missing)",
            "• Dropped".bright_yellow(),
            record.character_id
        );
    }
    for file in report.removed_archives.iter().chain(&report.removed_temp_files) {
        println_pad!("{} {}", "• Deleted".bright_yellow(), file);
    }

    println_pad!(
        "{} {}, {}",
        "✓ Cleanup finished:".bright_green().bold(),
        plural(report.dropped.len(), "dropped record"),
        plural(
            report.removed_archives.len() + report.removed_temp_files.len(),
            "deleted file"
        )
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::plural;

    #[test]
    fn plural_counts() {
        assert_eq!(plural(0, "deleted file"), "0 deleted files");
        assert_eq!(plural(1, "dropped record"), "1 dropped record");
    }
}
