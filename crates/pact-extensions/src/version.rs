//! Installed and latest version resolution.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::descriptor::{ExtensionDescriptor, ExtensionKind, VersionSource};
use crate::platform::Platform;
use crate::registry::Registry;
use crate::template::TemplateVars;
use crate::transport::{FetchRequest, Transport};
use crate::{Error, Result};

/// Release document returned by a release API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
}

/// Whether two version tokens denote the same release.
///
/// Plain tag equality; no semantic ordering is applied.
pub fn versions_match(installed: &str, latest: &str) -> bool {
    installed.trim() == latest.trim()
}

/// Extract the version from `--version` output.
///
/// `"pactflow-ai 1.11.4"` yields `1.11.4`; a lone token is taken as-is.
pub fn parse_version_output(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|line| !line.trim().is_empty())?;
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    Some(tokens.next().unwrap_or(first).to_string())
}

/// Resolves installed and latest versions of extensions.
pub struct VersionResolver<'a> {
    transport: &'a dyn Transport,
}

impl<'a> VersionResolver<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// The latest published version for `platform`.
    pub fn resolve_latest(
        &self,
        descriptor: &ExtensionDescriptor,
        platform: &Platform,
    ) -> Result<String> {
        match &descriptor.source {
            VersionSource::DirectEndpoint { latest_url, .. } => {
                // The version is not known yet; only platform placeholders apply
                let url = TemplateVars::new(descriptor, "", platform).render(latest_url);
                let body = self.transport.get_text(&FetchRequest::new(&url))?;
                let version = body.trim();
                if version.is_empty() {
                    return Err(Error::Parse {
                        url,
                        message: "empty version response".to_string(),
                    });
                }
                tracing::debug!(extension = %descriptor.name, %version, "Latest version");
                Ok(version.to_string())
            }
            VersionSource::ReleaseApi { api_url, .. } => {
                let url = TemplateVars::new(descriptor, "", platform).render(api_url);
                let release = self.fetch_release(&url)?;
                let tag = release
                    .tag_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .ok_or_else(|| Error::Parse {
                        url: url.clone(),
                        message: "release has no tag_name".to_string(),
                    })?
                    .to_string();

                let vars = TemplateVars::new(descriptor, &tag, platform);
                let asset = vars.asset();
                if !release.assets.iter().any(|a| a.name == asset) {
                    return Err(Error::AssetNotFound {
                        asset: asset.to_string(),
                        version: tag,
                        platform: platform.to_string(),
                    });
                }
                tracing::debug!(extension = %descriptor.name, version = %tag, %asset, "Latest release");
                Ok(tag)
            }
        }
    }

    fn fetch_release(&self, url: &str) -> Result<Release> {
        let request = FetchRequest::new(url)
            .header("Accept", "application/vnd.github+json")
            .with_github_token();
        let body = self.transport.get_text(&request)?;
        serde_json::from_str(&body).map_err(|e| Error::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// The installed version, or `None` when there is no record.
    ///
    /// Single binaries are asked for their version; when that fails the
    /// registry's recorded version is used.
    pub fn resolve_installed(
        &self,
        descriptor: &ExtensionDescriptor,
        registry: &Registry,
    ) -> Option<String> {
        let record = registry.get(&descriptor.name)?;
        if descriptor.kind == ExtensionKind::Bundle {
            return Some(record.version.clone());
        }

        let reported = record
            .binary_paths
            .values()
            .next()
            .and_then(|binary| query_binary_version(binary));
        match reported {
            Some(version) => Some(version),
            None => {
                tracing::warn!(
                    extension = %descriptor.name,
                    "Could not query the installed binary for its version; using the recorded {}",
                    record.version
                );
                Some(record.version.clone())
            }
        }
    }
}

/// Run `<binary> --version` and parse its stdout.
pub fn query_binary_version(binary: &Path) -> Option<String> {
    let output = match Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(binary = %binary.display(), "--version failed: {e}");
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!(binary = %binary.display(), status = %output.status, "--version exited non-zero");
        return None;
    }
    parse_version_output(&String::from_utf8_lossy(&output.stdout))
}
