use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    cleanup_skins, detect_game, install_skin, list_skins, reset_config, run_overlay,
    set_config_value, show_config, uninstall_skins, Context, InstallSkinArgs, ListSkinsArgs,
    UninstallSkinsArgs,
};
use errors::CliError;
use miette::Result;
use utils::config::{self, AppConfig};

mod commands;
mod errors;
mod logging;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config.toml (defaults to the file next to the executable)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the overlay with the installed skins and follow its output
    Run,
    /// Install a skin archive for a character and restart the overlay
    Install {
        /// The path to the skin archive
        archive: Utf8PathBuf,

        /// The character the skin belongs to
        #[arg(short, long)]
        character: String,

        /// The id of the skin
        #[arg(short = 'i', long)]
        mod_id: String,

        /// Display name of the skin, also used for the archive file name
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        chroma: Option<String>,

        /// Thumbnail URL or path shown in listings
        #[arg(long)]
        thumbnail: Option<String>,

        /// Stop the overlay after installing instead of following it
        #[arg(long)]
        no_run: bool,
    },
    /// Uninstall the skins of one or more characters
    Uninstall {
        #[arg(required = true)]
        characters: Vec<String>,
    },
    /// List installed skins
    List {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop records without an archive and delete unreferenced archives
    Cleanup,
    /// Show or edit config.toml
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set { key: String, value: String },
    /// Auto-detect the game directory and save it
    DetectGame,
    /// Reset the configuration to defaults
    Reset,
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn load_context(config_path: Option<Utf8PathBuf>) -> Result<Context> {
    let config_path = config_path
        .or_else(config::default_config_path)
        .ok_or(CliError::ConfigPathUnknown)?;
    let config = AppConfig::load(&config_path)?;
    Ok(Context {
        config,
        config_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();
    let ctx = load_context(args.config)?;

    let log_dir = ctx.config.layout().ok().map(|layout| layout.logs_dir());
    let _log_guard = logging::init_logging(log_dir.as_deref(), args.verbose);
    if let Some(dir) = &log_dir {
        tracing::debug!(%dir, "Log directory");
        logging::cleanup_old_logs(dir, 7);
    }

    match args.command {
        Commands::Run => run_overlay(&ctx).await,
        Commands::Install {
            archive,
            character,
            mod_id,
            name,
            chroma,
            thumbnail,
            no_run,
        } => {
            install_skin(
                &ctx,
                InstallSkinArgs {
                    archive,
                    character_id: character,
                    mod_id,
                    name,
                    chroma,
                    thumbnail,
                    no_run,
                },
            )
            .await
        }
        Commands::Uninstall { characters } => {
            uninstall_skins(
                &ctx,
                UninstallSkinsArgs {
                    character_ids: characters,
                },
            )
            .await
        }
        Commands::List { json } => list_skins(&ctx, ListSkinsArgs { json }),
        Commands::Cleanup => cleanup_skins(&ctx).await,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => show_config(&ctx),
            ConfigAction::Set { key, value } => set_config_value(&ctx, &key, &value),
            ConfigAction::DetectGame => detect_game(&ctx),
            ConfigAction::Reset => reset_config(&ctx),
        },
    }
}
