//! Detection and normalisation of the running platform.
//!
//! Every extension asset is published per (OS, architecture, libc) cell. The
//! normalisation rules live in [`Platform::from_raw`] so the whole matrix can
//! be exercised without the matching hardware.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bytes of a system binary inspected for the libc marker.
const LIBC_PROBE_BYTES: u64 = 64 * 1024;

/// System binaries whose interpreter metadata reveals the libc flavour.
const LIBC_PROBE_PATHS: [&str; 2] = ["/bin/sh", "/bin/ls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Macos,
    Linux,
    Windows,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "aarch64")]
    Aarch64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Libc {
    Gnu,
    Musl,
}

impl Libc {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gnu => "gnu",
            Self::Musl => "musl",
        }
    }
}

/// Canonical platform an extension binary is built for.
///
/// `libc` is only ever set on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libc: Option<Libc>,
}

impl Platform {
    /// Normalise raw OS and architecture tokens.
    ///
    /// `libc_probe` is only called for Linux.
    pub fn from_raw(os: &str, arch: &str, libc_probe: impl FnOnce() -> Libc) -> Result<Self> {
        let unsupported = || Error::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let canonical_os = match os.trim().to_ascii_lowercase().as_str() {
            "macos" | "darwin" => Os::Macos,
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            _ => return Err(unsupported()),
        };

        let canonical_arch = match (canonical_os, arch.trim().to_ascii_lowercase().as_str()) {
            (_, "x86_64" | "x64" | "amd64") => Arch::X86_64,
            (_, "aarch64" | "arm64") => Arch::Aarch64,
            // 32-bit processes under WOW64 still run the x86_64 binaries
            (Os::Windows, "x86" | "i386" | "i686") => Arch::X86_64,
            (Os::Macos, "x86" | "i386") => Arch::X86_64,
            _ => return Err(unsupported()),
        };

        let libc = (canonical_os == Os::Linux).then(libc_probe);

        Ok(Self {
            os: canonical_os,
            arch: canonical_arch,
            libc,
        })
    }

    /// Detect the running platform. The result is cached for the process.
    pub fn detect() -> Result<Self> {
        static DETECTED: OnceLock<std::result::Result<Platform, (String, String)>> =
            OnceLock::new();

        DETECTED
            .get_or_init(|| {
                let os = std::env::consts::OS;
                let arch = raw_arch();
                let detected = Self::from_raw(os, &arch, probe_libc);
                match &detected {
                    Ok(platform) => tracing::debug!(%platform, raw_arch = %arch, "Detected platform"),
                    Err(e) => tracing::debug!("Platform detection failed: {e}"),
                }
                detected.map_err(|_| (os.to_string(), arch))
            })
            .clone()
            .map_err(|(os, arch)| Error::UnsupportedPlatform { os, arch })
    }

    /// Conventional asset name: `<tool>-<arch>-<os>[-<libc>][.exe]`.
    pub fn asset_name(&self, tool: &str) -> String {
        let libc = self
            .libc
            .map(|libc| format!("-{}", libc.as_str()))
            .unwrap_or_default();
        format!(
            "{tool}-{}-{}{libc}{}",
            self.arch.as_str(),
            self.os.as_str(),
            self.exe_suffix()
        )
    }

    /// Rust target triple, e.g. `aarch64-apple-darwin`.
    pub fn target_triple(&self) -> String {
        let arch = self.arch.as_str();
        match self.os {
            Os::Macos => format!("{arch}-apple-darwin"),
            Os::Linux => format!(
                "{arch}-unknown-linux-{}",
                self.libc.unwrap_or(Libc::Gnu).as_str()
            ),
            Os::Windows => format!("{arch}-pc-windows-msvc"),
        }
    }

    pub fn exe_suffix(&self) -> &'static str {
        match self.os {
            Os::Windows => ".exe",
            _ => "",
        }
    }

    /// Archive format bundles are published in.
    pub fn archive_ext(&self) -> &'static str {
        match self.os {
            Os::Windows => "zip",
            _ => "tar.gz",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())?;
        if let Some(libc) = self.libc {
            write!(f, "-{}", libc.as_str())?;
        }
        Ok(())
    }
}

/// Raw machine architecture.
///
/// Windows reports the native architecture through the environment even to
/// 32-bit processes; elsewhere the compile target is authoritative.
fn raw_arch() -> String {
    if cfg!(windows) {
        for var in ["PROCESSOR_ARCHITEW6432", "PROCESSOR_ARCHITECTURE"] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    return value;
                }
            }
        }
    }
    std::env::consts::ARCH.to_string()
}

/// Look for the `musl` marker in well-known system binaries.
pub fn probe_libc() -> Libc {
    for path in LIBC_PROBE_PATHS {
        if let Some(libc) = probe_libc_at(Path::new(path)) {
            return libc;
        }
    }
    Libc::Gnu
}

/// Inspect one binary; `None` when it cannot be read.
pub fn probe_libc_at(path: &Path) -> Option<Libc> {
    let file = File::open(path).ok()?;
    let mut head = Vec::new();
    file.take(LIBC_PROBE_BYTES).read_to_end(&mut head).ok()?;
    if head.windows(4).any(|window| window == b"musl") {
        Some(Libc::Musl)
    } else {
        Some(Libc::Gnu)
    }
}
