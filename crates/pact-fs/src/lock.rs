//! Advisory lock serialising mutating commands against one storage root.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, Result, StorageLayout};

/// Exclusive advisory lock on `<root>/.lock`, released on drop.
///
/// Install, update and uninstall hold this for their whole critical section
/// so two concurrent invocations never share a staging directory.
#[derive(Debug)]
pub struct StorageLock {
    file: File,
    path: PathBuf,
}

impl StorageLock {
    /// Block until the lock for `layout` is acquired.
    pub fn acquire(layout: &StorageLayout) -> Result<Self> {
        if let Some(lock) = Self::try_acquire(layout)? {
            return Ok(lock);
        }
        tracing::info!("Another pact process is changing extensions; waiting for it to finish");
        Self::acquire_path(&layout.lock_path())
    }

    /// Try to take the lock without blocking; `Ok(None)` if it is held.
    pub fn try_acquire(layout: &StorageLayout) -> Result<Option<Self>> {
        let path = layout.lock_path();
        let file = open_lock_file(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(_) => Err(Error::LockFailed { path }),
        }
    }

    fn acquire_path(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        tracing::debug!(path = %path.display(), "Waiting for storage lock");
        file.lock_exclusive().map_err(|_| Error::LockFailed {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::io(path, e))
}
