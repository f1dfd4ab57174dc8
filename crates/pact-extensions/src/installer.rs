//! Install, update and uninstall of extensions.
//!
//! Every install goes through `<root>/.staging/<name>/`: the asset is
//! downloaded and unpacked there, checked, and only then swapped into
//! `<root>/<kind>/<name>/`. Aliases are written after the swap and the
//! registry after the aliases, so a failure at any step leaves neither a
//! record nor an alias pointing at missing files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use pact_fs::{StorageLayout, alias, io};

use crate::archive::{self, ArchiveFormat};
use crate::descriptor::{ExtensionDescriptor, ExtensionKind, ToolSpec, VersionSource};
use crate::platform::{Os, Platform};
use crate::registry::{InstalledExtensionRecord, Registry};
use crate::template::TemplateVars;
use crate::transport::{FetchRequest, Transport};
use crate::version::{VersionResolver, versions_match};
use crate::{Error, Result};

/// Which version to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    Latest,
    Exact(String),
}

impl VersionRequest {
    /// `None` means latest.
    pub fn from_option(version: Option<&str>) -> Self {
        match version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => Self::Exact(version.to_string()),
            None => Self::Latest,
        }
    }
}

/// Result of [`InstallManager::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Installed version already matches the latest; nothing was downloaded.
    UpToDate(InstalledExtensionRecord),
    Updated {
        from: String,
        record: InstalledExtensionRecord,
    },
}

/// Performs installs, updates and uninstalls against one storage root.
pub struct InstallManager<'a> {
    layout: &'a StorageLayout,
    transport: &'a dyn Transport,
    platform: Platform,
}

impl<'a> InstallManager<'a> {
    pub fn new(layout: &'a StorageLayout, transport: &'a dyn Transport, platform: Platform) -> Self {
        Self {
            layout,
            transport,
            platform,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn resolver(&self) -> VersionResolver<'a> {
        VersionResolver::new(self.transport)
    }

    /// Install `descriptor` and record it in `registry`.
    pub fn install(
        &self,
        registry: &mut Registry,
        descriptor: &ExtensionDescriptor,
        request: &VersionRequest,
        force: bool,
    ) -> Result<InstalledExtensionRecord> {
        if registry.get(&descriptor.name).is_some() && !force {
            return Err(Error::AlreadyInstalled(descriptor.name.clone()));
        }
        check_alias_conflicts(registry, descriptor)?;

        let version = match request {
            VersionRequest::Latest => self
                .resolver()
                .resolve_latest(descriptor, &self.platform)?,
            VersionRequest::Exact(version) => version.trim().to_string(),
        };
        tracing::info!(extension = %descriptor.name, %version, platform = %self.platform, "Installing");

        let staging = self.layout.staging_for(&descriptor.name);
        io::reset_dir(&staging)?;

        let result = self.stage_and_place(registry, descriptor, &version, &staging);

        if let Err(e) = io::remove_dir_if_exists(&staging) {
            tracing::warn!("Failed to clean staging directory {}: {}", staging.display(), e);
        }
        let record = result?;
        tracing::info!(extension = %record.name, version = %record.version, "Installed");
        Ok(record)
    }

    fn stage_and_place(
        &self,
        registry: &mut Registry,
        descriptor: &ExtensionDescriptor,
        version: &str,
        staging: &Path,
    ) -> Result<InstalledExtensionRecord> {
        let vars = TemplateVars::new(descriptor, version, &self.platform);
        let asset = vars.asset().to_string();
        let url = vars.render(descriptor.source.download_url());

        let mut request = FetchRequest::new(&url);
        if matches!(descriptor.source, VersionSource::ReleaseApi { .. }) {
            request = request.with_github_token();
        }
        let bytes = self
            .transport
            .get_bytes(&request)
            .map_err(|e| {
                if e.is_not_found() {
                    Error::AssetNotFound {
                        asset: asset.clone(),
                        version: version.to_string(),
                        platform: self.platform.to_string(),
                    }
                } else {
                    e
                }
            })?;

        let payload = match descriptor.kind {
            ExtensionKind::SingleBinary => {
                let payload = staging.join("payload");
                let tool = single_tool(descriptor)?;
                let binary = payload.join(format!("{}{}", tool.member, self.platform.exe_suffix()));
                write_file(&binary, &bytes)?;
                payload
            }
            ExtensionKind::Bundle => {
                let format = ArchiveFormat::from_asset_name(&asset).ok_or_else(|| {
                    Error::CorruptArchive {
                        asset: asset.clone(),
                        reason: "unrecognised archive format".to_string(),
                    }
                })?;
                let archive_path = staging.join(&asset);
                write_file(&archive_path, &bytes)?;
                archive::extract(&archive_path, format, &staging.join("unpacked"), &asset)?
            }
        };

        // Relative location of every member inside the payload
        let mut members = BTreeMap::new();
        for tool in &descriptor.tools {
            let located = locate_member(&payload, &tool.member, &self.platform).ok_or_else(|| {
                Error::CorruptArchive {
                    asset: asset.clone(),
                    reason: format!("missing member '{}'", tool.member),
                }
            })?;
            io::make_executable(&located)?;
            let relative = located
                .strip_prefix(&payload)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(&tool.member));
            members.insert(tool.alias.clone(), relative);
        }

        let install_dir = self
            .layout
            .install_dir(descriptor.kind.dir_name(), &descriptor.name);
        io::replace_dir(&payload, &install_dir, &staging.join("previous"))?;
        tracing::debug!(dir = %install_dir.display(), "Placed payload");

        let binary_paths: BTreeMap<String, PathBuf> = members
            .into_iter()
            .map(|(alias, relative)| (alias, install_dir.join(relative)))
            .collect();

        self.layout.ensure()?;
        if let Some(previous) = registry.get(&descriptor.name) {
            for stale in previous
                .aliases()
                .filter(|name| !binary_paths.contains_key(*name))
            {
                alias::remove_alias(&self.layout.alias_path(stale))?;
            }
        }
        for (name, binary) in &binary_paths {
            alias::replace_alias(&self.layout.alias_path(name), binary)?;
        }

        let record = InstalledExtensionRecord {
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            version: version.to_string(),
            installed_at: Utc::now(),
            binary_paths,
            platform: self.platform,
        };
        registry.put(record.clone());
        registry.save()?;
        Ok(record)
    }

    /// Update to the latest version unless already there.
    pub fn update(
        &self,
        registry: &mut Registry,
        descriptor: &ExtensionDescriptor,
    ) -> Result<UpdateOutcome> {
        let record = registry
            .get(&descriptor.name)
            .cloned()
            .ok_or_else(|| Error::NotInstalled(descriptor.name.clone()))?;

        let resolver = self.resolver();
        let installed = resolver
            .resolve_installed(descriptor, registry)
            .unwrap_or_else(|| record.version.clone());
        let latest = resolver.resolve_latest(descriptor, &self.platform)?;

        if versions_match(&installed, &latest) {
            tracing::info!(extension = %descriptor.name, version = %installed, "Already up to date");
            return Ok(UpdateOutcome::UpToDate(record));
        }

        let record = self.install(registry, descriptor, &VersionRequest::Exact(latest), true)?;
        Ok(UpdateOutcome::Updated {
            from: installed,
            record,
        })
    }

    /// Remove an extension's aliases, then its files, then its record.
    pub fn uninstall(
        &self,
        registry: &mut Registry,
        name: &str,
    ) -> Result<InstalledExtensionRecord> {
        let record = registry
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotInstalled(name.to_string()))?;

        for alias_name in record.aliases() {
            alias::remove_alias(&self.layout.alias_path(alias_name))?;
        }
        io::remove_dir_if_exists(&self.layout.install_dir(record.kind.dir_name(), name))?;

        registry.remove(name);
        registry.save()?;
        tracing::info!(extension = %name, "Uninstalled");
        Ok(record)
    }
}

/// Reject aliases already provided by another installed extension.
fn check_alias_conflicts(registry: &Registry, descriptor: &ExtensionDescriptor) -> Result<()> {
    for alias_name in descriptor.aliases() {
        if let Some((owner, _)) = registry.find_alias(alias_name) {
            if owner.name != descriptor.name {
                return Err(Error::AliasConflict {
                    alias: alias_name.to_string(),
                    owner: owner.name.clone(),
                });
            }
        }
    }
    Ok(())
}

fn single_tool(descriptor: &ExtensionDescriptor) -> Result<&ToolSpec> {
    match descriptor.tools.as_slice() {
        [tool] => Ok(tool),
        _ => Err(Error::InvalidDescriptor {
            name: descriptor.name.clone(),
            reason: "a single-binary extension must declare exactly one tool".to_string(),
        }),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}

/// Find `member` under `root`, trying the platform's executable suffixes.
///
/// Windows bundles ship batch wrappers as well as executables.
pub fn locate_member(root: &Path, member: &str, platform: &Platform) -> Option<PathBuf> {
    let suffixes: &[&str] = match platform.os {
        Os::Windows => &[".exe", ".bat", ".cmd", ""],
        _ => &[""],
    };
    suffixes
        .iter()
        .map(|suffix| root.join(format!("{member}{suffix}")))
        .find(|candidate| candidate.is_file())
}
