//! Constants and enums for storage-root paths.

use std::path::Path;

/// Environment variable overriding the storage root.
pub const HOME_ENV_VAR: &str = "PACT_CLI_EXTENSIONS_HOME";

/// Default storage root, relative to the user's home directory.
pub const DEFAULT_ROOT: &str = ".pact/extensions";

/// Well-known entries directly under the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePath {
    /// The `config.json` manifest holding the serialized registry
    Manifest,
    /// The optional `extensions.toml` catalog overrides
    Catalog,
    /// The `.lock` advisory lock file
    Lock,
    /// The `.staging` directory for in-flight installs
    Staging,
    /// The `bin` directory holding alias entries
    Bin,
}

impl StoragePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manifest => "config.json",
            Self::Catalog => "extensions.toml",
            Self::Lock => ".lock",
            Self::Staging => ".staging",
            Self::Bin => "bin",
        }
    }
}

impl AsRef<Path> for StoragePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
