use camino::Utf8PathBuf;
use ltk_skin_manager::{ErrorCode, ErrorResponse, ManagerError};
use ltk_skin_registry::RegistryError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Could not determine where to store config.toml")]
    #[diagnostic(
        code(config::path_unknown),
        help("Pass the config file explicitly with --config <path>")
    )]
    ConfigPathUnknown,

    #[error("Failed to parse {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Fix the syntax error or run 'skin-hunter config reset'")
    )]
    ConfigParse {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write {path}")]
    #[diagnostic(code(config::write_failed), help("Check file permissions"))]
    ConfigWrite {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown config key: {key}")]
    #[diagnostic(
        code(config::unknown_key),
        help("Run 'skin-hunter config show' to list the available keys")
    )]
    UnknownConfigKey { key: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Game directory is not configured")]
    #[diagnostic(
        code(game::not_found),
        help("Run 'skin-hunter config detect-game' or 'skin-hunter config set game_path <dir>'")
    )]
    GameNotFound,

    #[error("Not a game directory: {path}")]
    #[diagnostic(
        code(game::invalid_path),
        help("The directory must contain 'League of Legends.exe', usually League of Legends\\Game")
    )]
    InvalidGamePath { path: Utf8PathBuf },

    #[error("mod-tools executable not found: {path}")]
    #[diagnostic(
        code(tools::not_found),
        help("Place mod-tools next to skin-hunter or set mod_tools_path in config.toml")
    )]
    ModToolsNotFound { path: Utf8PathBuf },

    #[error("Archive not found: {path}")]
    #[diagnostic(code(file::not_found), help("Make sure the file exists and the path is correct"))]
    ArchiveNotFound { path: Utf8PathBuf },

    #[error("Could not determine the data directory")]
    #[diagnostic(code(config::data_dir), help("Set data_dir in config.toml"))]
    DataDirUnknown,

    #[error("Failed to read the skin registry")]
    #[diagnostic(code(registry::read_failed))]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error("{message}")]
    #[diagnostic(code(skin::operation_failed))]
    Operation {
        code: ErrorCode,
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn invalid_value(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

fn help_for(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::InsufficientCredit => Some("No install credits left for this user"),
        ErrorCode::ModNotFound => Some("Run 'skin-hunter list' to see installed skins"),
        ErrorCode::TransitionConflict => Some("Wait for the running operation to finish and retry"),
        ErrorCode::FileNameConflict => {
            Some("Another character already uses a skin with this name, pass a different --name")
        }
        ErrorCode::ProcessSpawnFailure => Some("Check mod_tools_path in config.toml"),
        ErrorCode::ProcessTimeout => {
            Some("The overlay did not report ready in time, check game_path and retry")
        }
        ErrorCode::ToolFailure | ErrorCode::EmptyArchive => {
            Some("The archive could not be imported, make sure it is a valid skin archive")
        }
        _ => None,
    }
}

impl From<ManagerError> for CliError {
    fn from(error: ManagerError) -> Self {
        let ErrorResponse { code, message, .. } = ErrorResponse::from(&error);
        Self::Operation {
            code,
            message,
            help: help_for(code).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_errors_keep_their_code() {
        let error = CliError::from(ManagerError::NotFound {
            character_id: "Ahri".to_string(),
        });

        match error {
            CliError::Operation { code, message, help } => {
                assert_eq!(code, ErrorCode::ModNotFound);
                assert!(message.contains("Ahri"));
                assert!(help.is_some());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
