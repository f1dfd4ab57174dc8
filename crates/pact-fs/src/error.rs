//! Error types for pact-fs

use std::path::PathBuf;

/// Result type for pact-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pact-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition failed for {}", path.display())]
    LockFailed { path: PathBuf },

    #[error(
        "Could not determine the home directory; set {} to choose a storage root",
        crate::HOME_ENV_VAR
    )]
    HomeNotFound,

    #[error("Alias '{alias}' is not a valid file name")]
    InvalidAlias { alias: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the error is attached to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } | Self::LockFailed { path } => Some(path),
            Self::HomeNotFound | Self::InvalidAlias { .. } => None,
        }
    }
}
