//! Shared test utilities for the pact extension manager workspace.
//!
//! A dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`transport`]: a recording in-memory [`Transport`](pact_extensions::Transport)
//! - [`archive`]: tar.gz and zip builders plus fake executable scripts
//! - [`root`]: [`TestRoot`](root::TestRoot), a temporary storage root

pub mod archive;
pub mod root;
pub mod transport;

use pact_extensions::{Libc, Platform};

/// Build a platform from raw tokens, probing Linux as glibc.
pub fn platform(os: &str, arch: &str) -> Platform {
    Platform::from_raw(os, arch, || Libc::Gnu).expect("supported test platform")
}

/// The platform the tests are running on, falling back to linux/x86_64.
pub fn host_platform() -> Platform {
    Platform::detect().unwrap_or_else(|_| platform("linux", "x86_64"))
}
