//! Storage-root layout
//!
//! ```text
//! <root>/
//!   config.json            serialized registry
//!   extensions.toml        optional catalog overrides
//!   .lock                  advisory lock for mutating commands
//!   .staging/<name>/       in-flight install area
//!   bin/<alias>            alias entries
//!   <kind>/<name>/         placed binaries, one directory per extension kind
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_ROOT, HOME_ENV_VAR, StoragePath};
use crate::{Error, Result};

/// Resolved paths under one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// Use an explicit storage root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the storage root from [`HOME_ENV_VAR`], falling back to
    /// `~/.pact/extensions`.
    pub fn from_env() -> Result<Self> {
        Self::resolve(std::env::var_os(HOME_ENV_VAR).map(PathBuf::from))
    }

    /// Resolve the storage root from an optional override.
    ///
    /// An empty override is treated as absent.
    pub fn resolve(override_root: Option<PathBuf>) -> Result<Self> {
        match override_root {
            Some(root) if !root.as_os_str().is_empty() => {
                // Recorded binary paths must stay valid from any working directory
                let root = std::path::absolute(&root).map_err(|e| Error::io(&root, e))?;
                tracing::debug!(root = %root.display(), "Using storage root override");
                Ok(Self::new(root))
            }
            _ => {
                let home = dirs::home_dir().ok_or(Error::HomeNotFound)?;
                Ok(Self::new(home.join(DEFAULT_ROOT)))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root path for display, without Windows verbatim prefixes.
    pub fn display_root(&self) -> &Path {
        dunce::simplified(&self.root)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(StoragePath::Manifest)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(StoragePath::Catalog)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(StoragePath::Lock)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(StoragePath::Staging)
    }

    /// Staging area for one extension's install.
    pub fn staging_for(&self, name: &str) -> PathBuf {
        self.staging_dir().join(name)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(StoragePath::Bin)
    }

    /// Directory holding every installation of one extension kind.
    pub fn kind_dir(&self, kind_dir: &str) -> PathBuf {
        self.root.join(kind_dir)
    }

    /// Final installation directory of an extension.
    pub fn install_dir(&self, kind_dir: &str, name: &str) -> PathBuf {
        self.kind_dir(kind_dir).join(name)
    }

    /// Path of the alias entry for `alias` under `bin/`.
    ///
    /// Windows aliases are `.cmd` shims; everywhere else they are symlinks
    /// named exactly like the alias.
    pub fn alias_path(&self, alias: &str) -> PathBuf {
        if cfg!(windows) {
            self.bin_dir().join(format!("{alias}.cmd"))
        } else {
            self.bin_dir().join(alias)
        }
    }

    /// Create the root and `bin/` directories if missing.
    pub fn ensure(&self) -> Result<()> {
        for dir in [self.root.clone(), self.bin_dir()] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }
        Ok(())
    }
}
