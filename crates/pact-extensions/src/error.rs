use std::path::PathBuf;

/// Errors that can occur while managing extensions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The running OS/architecture pair is outside the supported matrix.
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// A fetch failed at the transport level or returned a non-success status.
    #[error("network error fetching {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// An upstream response could not be interpreted.
    #[error("failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// No asset is published for this version and platform.
    #[error("asset '{asset}' for version {version} is not available for {platform}")]
    AssetNotFound {
        asset: String,
        version: String,
        platform: String,
    },

    /// A downloaded archive could not be extracted or lacks a declared binary.
    #[error("corrupt archive '{asset}': {reason}")]
    CorruptArchive { asset: String, reason: String },

    /// Storage-root filesystem failure.
    #[error(transparent)]
    Filesystem(#[from] pact_fs::Error),

    #[error("extension '{0}' is already installed (use --force to reinstall)")]
    AlreadyInstalled(String),

    /// An alias is already provided by another installed extension.
    #[error("alias '{alias}' is already provided by extension '{owner}'")]
    AliasConflict { alias: String, owner: String },

    #[error("extension '{0}' is not installed")]
    NotInstalled(String),

    #[error("unknown extension: {0}")]
    UnknownExtension(String),

    /// The registry manifest exists but cannot be read back.
    #[error("registry manifest {} is corrupt: {message}", path.display())]
    RegistryCorrupt { path: PathBuf, message: String },

    /// Failed to parse the user catalog file.
    #[error("failed to parse extension catalog {}: {message}", path.display())]
    CatalogParse { path: PathBuf, message: String },

    /// A catalog entry violates a descriptor rule.
    #[error("invalid extension descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// A child process could not be started.
    #[error("failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Whether this is an HTTP 404 from the upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Network { status: Some(404), .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem(pact_fs::Error::io(path, source))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
