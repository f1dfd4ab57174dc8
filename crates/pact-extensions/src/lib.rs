//! Extension management for the pact CLI.
//!
//! This crate provides platform detection, the extension catalog, version
//! resolution against upstream sources, the persisted registry of installed
//! extensions, and the install manager that downloads and places binaries.

pub mod archive;
pub mod descriptor;
pub mod error;
pub mod installer;
pub mod launcher;
pub mod platform;
pub mod registry;
pub mod template;
pub mod transport;
pub mod version;

pub use descriptor::{Catalog, ExtensionDescriptor, ExtensionKind, ToolSpec, VersionSource};
pub use error::{Error, Result};
pub use installer::{InstallManager, UpdateOutcome, VersionRequest};
pub use platform::{Arch, Libc, Os, Platform};
pub use registry::{InstalledExtensionRecord, Registry};
pub use transport::{FetchRequest, HttpTransport, Transport};
pub use version::VersionResolver;
