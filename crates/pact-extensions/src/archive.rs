//! Bundle archive extraction.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Format implied by an asset file name.
    pub fn from_asset_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Extract `archive` into `dest` and return the payload root.
///
/// When the archive holds a single top-level directory, that directory is the
/// payload root; otherwise `dest` itself is. Entries escaping `dest` are
/// skipped. Undecodable input is a [`Error::CorruptArchive`]; failing to write
/// the payload is a [`Error::Filesystem`] naming the path.
pub fn extract(archive: &Path, format: ArchiveFormat, dest: &Path, asset: &str) -> Result<PathBuf> {
    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    let file = File::open(archive).map_err(|e| Error::io(archive, e))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(file, dest, asset)?,
        ArchiveFormat::Zip => extract_zip(file, dest, asset)?,
    }

    let root = payload_root(dest).map_err(|e| Error::io(dest, e))?;
    tracing::debug!(
        archive = %archive.display(),
        root = %root.display(),
        "Extracted archive"
    );
    Ok(root)
}

fn corrupt(asset: &str, reason: impl ToString) -> Error {
    Error::CorruptArchive {
        asset: asset.to_string(),
        reason: reason.to_string(),
    }
}

/// Whether `e` came from decoding archive bytes rather than writing to disk.
fn is_decode_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
    )
}

/// Classify an error that may come from either side of a copy.
fn copy_error(asset: &str, path: &Path, e: io::Error) -> Error {
    if is_decode_error(&e) {
        corrupt(asset, e)
    } else {
        Error::io(path, e)
    }
}

fn extract_tar_gz(file: File, dest: &Path, asset: &str) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_preserve_permissions(true);
    for entry in archive.entries().map_err(|e| corrupt(asset, e))? {
        let mut entry = entry.map_err(|e| corrupt(asset, e))?;
        let target = entry
            .path()
            .map(|path| dest.join(path))
            .map_err(|e| corrupt(asset, e))?;
        // unpack_in refuses entries that would land outside dest
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| copy_error(asset, &target, e))?;
        if !unpacked {
            tracing::warn!(
                entry = %target.display(),
                "Skipped archive entry outside the extraction directory"
            );
        }
    }
    Ok(())
}

fn extract_zip(file: File, dest: &Path, asset: &str) -> Result<()> {
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(asset, e))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| corrupt(asset, e))?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(entry = %entry.name(), "Skipped archive entry outside the extraction directory");
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| Error::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| copy_error(asset, &out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io(&out_path, e))?;
        }
    }
    Ok(())
}

/// `dir`'s only child when that child is a directory, else `dir`.
fn payload_root(dir: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(dir)?;
    let (Some(first), None) = (entries.next().transpose()?, entries.next()) else {
        return Ok(dir.to_path_buf());
    };
    if first.file_type()?.is_dir() {
        Ok(first.path())
    } else {
        Ok(dir.to_path_buf())
    }
}
