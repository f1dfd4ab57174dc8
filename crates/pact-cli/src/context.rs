//! Per-invocation command context
//!
//! Bundles what the extension commands share: the storage layout, the
//! catalog, the transport for upstream requests and the target platform.

use pact_extensions::{Catalog, InstallManager, Platform, Transport, VersionResolver};
use pact_fs::StorageLayout;

use crate::error::Result;

/// Everything an extension command needs for one invocation.
pub struct CommandContext<'a> {
    pub layout: &'a StorageLayout,
    pub catalog: Catalog,
    pub transport: &'a dyn Transport,
    platform: Option<Platform>,
}

impl<'a> CommandContext<'a> {
    /// Load the catalog for `layout`.
    ///
    /// `platform` overrides detection of the running platform.
    pub fn load(
        layout: &'a StorageLayout,
        transport: &'a dyn Transport,
        platform: Option<Platform>,
    ) -> Result<Self> {
        let catalog = Catalog::load(layout)?;
        Ok(Self {
            layout,
            catalog,
            transport,
            platform,
        })
    }

    /// The target platform, failing when the running one is unsupported.
    pub fn platform(&self) -> Result<Platform> {
        match self.platform {
            Some(platform) => Ok(platform),
            None => Ok(Platform::detect()?),
        }
    }

    pub fn resolver(&self) -> VersionResolver<'a> {
        VersionResolver::new(self.transport)
    }

    pub fn installer(&self) -> Result<InstallManager<'a>> {
        Ok(InstallManager::new(self.layout, self.transport, self.platform()?))
    }
}
