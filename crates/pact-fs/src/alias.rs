//! Alias entries under `bin/`.
//!
//! On Unix an alias is a symlink to the placed binary. Windows symlinks need
//! elevated privileges, so there an alias is a `.cmd` shim that forwards its
//! arguments to the binary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

#[cfg(windows)]
const SHIM_PREFIX: &str = "@\"";
#[cfg(windows)]
const SHIM_SUFFIX: &str = "\" %*";

/// Reject alias names that would escape `bin/` or are not plain file names.
pub fn validate_alias(alias: &str) -> Result<()> {
    let invalid = alias.is_empty()
        || alias == "."
        || alias == ".."
        || alias.starts_with('.')
        || alias.contains(['/', '\\', ':'])
        || alias.chars().any(char::is_whitespace);
    if invalid {
        return Err(Error::InvalidAlias {
            alias: alias.to_string(),
        });
    }
    Ok(())
}

/// Create or atomically replace the alias entry at `alias_path` so that it
/// points to `target`.
///
/// The entry is built under a temporary name in the same directory and then
/// renamed over the old one; a reader never sees a missing alias mid-update.
pub fn replace_alias(alias_path: &Path, target: &Path) -> Result<()> {
    let dir = alias_path
        .parent()
        .ok_or_else(|| Error::io(alias_path, std::io::ErrorKind::InvalidInput.into()))?;
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let temp_path = crate::io::temp_sibling(alias_path);
    remove_entry(&temp_path)?;

    write_entry(&temp_path, target)?;

    if let Err(e) = fs::rename(&temp_path, alias_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(alias_path, e));
    }
    tracing::debug!(
        alias = %alias_path.display(),
        target = %target.display(),
        "Alias entry written"
    );
    Ok(())
}

#[cfg(unix)]
fn write_entry(path: &Path, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, path).map_err(|e| Error::io(path, e))
}

#[cfg(windows)]
fn write_entry(path: &Path, target: &Path) -> Result<()> {
    let shim = format!(
        "{SHIM_PREFIX}{}{SHIM_SUFFIX}\r\n",
        dunce::simplified(target).display()
    );
    fs::write(path, shim).map_err(|e| Error::io(path, e))
}

/// Remove the alias entry. Returns whether anything was removed.
pub fn remove_alias(alias_path: &Path) -> Result<bool> {
    remove_entry(alias_path)
}

fn remove_entry(path: &Path) -> Result<bool> {
    // symlink_metadata so that a dangling symlink is still seen
    match fs::symlink_metadata(path) {
        Ok(_) => {
            fs::remove_file(path).map_err(|e| Error::io(path, e))?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// The binary an alias entry points to, if the entry exists.
pub fn alias_target(alias_path: &Path) -> Option<PathBuf> {
    #[cfg(unix)]
    {
        fs::read_link(alias_path).ok()
    }
    #[cfg(windows)]
    {
        let content = fs::read_to_string(alias_path).ok()?;
        let line = content.lines().next()?;
        let inner = line.strip_prefix(SHIM_PREFIX)?.strip_suffix(SHIM_SUFFIX)?;
        Some(PathBuf::from(inner))
    }
}

/// Whether the alias entry exists and its target is present on disk.
pub fn alias_resolves(alias_path: &Path) -> bool {
    alias_target(alias_path).is_some_and(|target| target.is_file())
}
