//! Error types for pact-cli

use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from pact-extensions
    #[error(transparent)]
    Extensions(#[from] pact_extensions::Error),

    /// Error from pact-fs
    #[error(transparent)]
    Fs(#[from] pact_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "unknown command '{0}'\n\nRun 'pact --help' for the available commands, or 'pact extension list' for installable extensions."
    )]
    UnknownCommand(String),

    /// A registered alias whose entry or binary is gone
    #[error(
        "alias '{alias}' of extension '{extension}' is broken: {} is missing\n\nReinstall with 'pact extension install {extension} --force'.",
        path.display()
    )]
    BrokenAlias {
        alias: String,
        extension: String,
        path: PathBuf,
    },

    /// A built-in command's program is not installed
    #[error("'{program}' was not found on PATH; install it to use 'pact {command}'")]
    ToolNotFound { command: String, program: String },

    /// Some items of an `--all` operation failed; exit code follows the first failure
    #[error("{operation} failed for: {}", failed.join(", "))]
    Partial {
        operation: &'static str,
        failed: Vec<String>,
        first: Box<CliError>,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        use pact_extensions::Error as E;
        match self {
            CliError::Extensions(e) => match e {
                E::UnsupportedPlatform { .. } => 3,
                E::Network { .. } => 4,
                E::AssetNotFound { .. } => 5,
                E::CorruptArchive { .. } => 6,
                E::Filesystem(_) => 7,
                E::AlreadyInstalled(_) => 8,
                E::AliasConflict { .. } => 9,
                _ => 1,
            },
            CliError::Fs(_) | CliError::Io(_) => 7,
            CliError::UnknownCommand(_) | CliError::ToolNotFound { .. } => 127,
            CliError::Partial { first, .. } => first.exit_code(),
            CliError::Json(_) | CliError::BrokenAlias { .. } | CliError::User { .. } => 1,
        }
    }
}
