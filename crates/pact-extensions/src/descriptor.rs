//! Extension descriptors and the catalog of installable extensions.
//!
//! The catalog starts from the compiled-in descriptors and is then extended or
//! overridden by the optional `extensions.toml` under the storage root, one
//! `[extensions."<name>"]` table per descriptor.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use pact_fs::StorageLayout;

use crate::template;
use crate::{Error, Result};

/// Top-level commands an extension alias may never shadow.
pub const RESERVED_COMMANDS: [&str; 10] = [
    "broker",
    "pactflow",
    "mock",
    "verifier",
    "stub",
    "plugin",
    "completions",
    "extension",
    "help",
    "version",
];

/// Default asset template, `<tool>-<arch>-<os>[-libc][.exe]`.
pub const DEFAULT_ASSET_TEMPLATE: &str = "{tool}-{arch}-{os}{libc}{exe}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionKind {
    /// One executable downloaded as-is.
    SingleBinary,
    /// An archive holding several executables.
    Bundle,
}

impl ExtensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleBinary => "single-binary",
            Self::Bundle => "bundle",
        }
    }

    /// Directory under the storage root holding installs of this kind.
    pub fn dir_name(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the latest version of an extension is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VersionSource {
    /// `latest_url` returns a bare version token.
    DirectEndpoint {
        latest_url: String,
        download_url: String,
    },
    /// `api_url` returns a release document with `tag_name` and `assets`.
    ReleaseApi {
        api_url: String,
        download_url: String,
    },
}

impl VersionSource {
    pub fn download_url(&self) -> &str {
        match self {
            Self::DirectEndpoint { download_url, .. } | Self::ReleaseApi { download_url, .. } => {
                download_url
            }
        }
    }

    fn templates(&self) -> [&str; 2] {
        match self {
            Self::DirectEndpoint {
                latest_url,
                download_url,
            } => [latest_url.as_str(), download_url.as_str()],
            Self::ReleaseApi {
                api_url,
                download_url,
            } => [api_url.as_str(), download_url.as_str()],
        }
    }
}

/// One executable an extension provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Name the tool is invoked by, `pact <alias>`.
    pub alias: String,
    /// Path relative to the install directory, without executable suffix.
    pub member: String,
}

impl ToolSpec {
    pub fn new(alias: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            member: member.into(),
        }
    }

    /// Final path component of `member`.
    pub fn file_stem(&self) -> &str {
        self.member
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.member)
    }
}

/// Complete description of an installable extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub description: String,
    pub kind: ExtensionKind,
    pub source: VersionSource,
    /// Asset-name template.
    pub asset: String,
    pub tools: Vec<ToolSpec>,
    /// Upstream spelling of canonical `os`/`arch` tokens, e.g. `macos = "osx"`.
    ///
    /// An `<os>-<arch>` key replaces the `arch` token on that platform only,
    /// e.g. `windows-aarch64 = "x86_64"` when no native build exists.
    pub platform_names: BTreeMap<String, String>,
}

impl ExtensionDescriptor {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.alias.as_str())
    }

    pub fn tool_for_alias(&self, alias: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.alias == alias)
    }

    /// Check the descriptor in isolation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            name: self.name.clone(),
            reason,
        };

        validate_name(&self.name).map_err(invalid)?;

        if self.tools.is_empty() {
            return Err(invalid("declares no tools".to_string()));
        }
        if self.kind == ExtensionKind::SingleBinary && self.tools.len() != 1 {
            return Err(invalid(format!(
                "a single-binary extension must declare exactly one tool, found {}",
                self.tools.len()
            )));
        }

        let mut seen = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            pact_fs::alias::validate_alias(&tool.alias).map_err(|e| invalid(e.to_string()))?;
            if RESERVED_COMMANDS.contains(&tool.alias.as_str()) {
                return Err(invalid(format!(
                    "alias '{}' shadows a built-in command",
                    tool.alias
                )));
            }
            if seen.contains(&tool.alias.as_str()) {
                return Err(invalid(format!("alias '{}' is declared twice", tool.alias)));
            }
            seen.push(tool.alias.as_str());
            validate_member(&tool.member).map_err(invalid)?;
        }

        for template in self
            .source
            .templates()
            .into_iter()
            .chain(std::iter::once(self.asset.as_str()))
        {
            let unknown = template::unknown_placeholders(template);
            if !unknown.is_empty() {
                return Err(invalid(format!(
                    "template '{template}' uses unknown placeholder(s): {}",
                    unknown.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("name may only contain lowercase letters, digits, '-' and '_'".to_string());
    }
    if name.starts_with('-') {
        return Err("name must not start with '-'".to_string());
    }
    Ok(())
}

fn validate_member(member: &str) -> std::result::Result<(), String> {
    let path = Path::new(member);
    let relative = !member.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if relative {
        Ok(())
    } else {
        Err(format!("member '{member}' must be a plain relative path"))
    }
}

/// One `[extensions."<name>"]` table of `extensions.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DescriptorConfig {
    #[serde(default)]
    pub description: String,
    pub kind: ExtensionKind,
    pub source: VersionSource,
    #[serde(default)]
    pub asset: Option<String>,
    pub tools: Vec<ToolSpec>,
    #[serde(default)]
    pub platform_names: BTreeMap<String, String>,
}

impl DescriptorConfig {
    pub fn into_descriptor(self, name: &str) -> ExtensionDescriptor {
        ExtensionDescriptor {
            name: name.to_string(),
            description: self.description,
            kind: self.kind,
            source: self.source,
            asset: self
                .asset
                .unwrap_or_else(|| default_asset_template(self.kind)),
            tools: self.tools,
            platform_names: self.platform_names,
        }
    }
}

fn default_asset_template(kind: ExtensionKind) -> String {
    match kind {
        ExtensionKind::SingleBinary => DEFAULT_ASSET_TEMPLATE.to_string(),
        ExtensionKind::Bundle => "{tool}-{arch}-{os}{libc}.{archive}".to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    extensions: BTreeMap<String, DescriptorConfig>,
}

/// Catalog of installable extensions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, ExtensionDescriptor>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The compiled-in descriptors.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(ExtensionDescriptor {
            name: "pactflow-ai".to_string(),
            description: "AI-augmented test generation for PactFlow".to_string(),
            kind: ExtensionKind::SingleBinary,
            source: VersionSource::DirectEndpoint {
                latest_url: "https://download.pactflow.io/ai/dist/{target}/latest".to_string(),
                download_url:
                    "https://download.pactflow.io/ai/dist/{target}/{version}/pactflow-ai{exe}"
                        .to_string(),
            },
            asset: "pactflow-ai{exe}".to_string(),
            tools: vec![ToolSpec::new("pactflow-ai", "pactflow-ai")],
            platform_names: BTreeMap::new(),
        });
        catalog.register(ExtensionDescriptor {
            name: "pact-legacy".to_string(),
            description: "Legacy Ruby standalone tools (broker client, mock, verifier, stub)"
                .to_string(),
            kind: ExtensionKind::Bundle,
            source: VersionSource::ReleaseApi {
                api_url:
                    "https://api.github.com/repos/pact-foundation/pact-standalone/releases/latest"
                        .to_string(),
                download_url:
                    "https://github.com/pact-foundation/pact-standalone/releases/download/{tag}/{asset}"
                        .to_string(),
            },
            asset: "pact-{version_bare}-{os}-{arch}.{archive}".to_string(),
            tools: vec![
                ToolSpec::new("pact-broker-legacy", "bin/pact-broker"),
                ToolSpec::new("pactflow-legacy", "bin/pactflow"),
                ToolSpec::new("message-legacy", "bin/pact-message"),
                ToolSpec::new("mock-legacy", "bin/pact-mock-service"),
                ToolSpec::new("verifier-legacy", "bin/pact-provider-verifier"),
                ToolSpec::new("stub-legacy", "bin/pact-stub-service"),
            ],
            platform_names: BTreeMap::from([
                ("macos".to_string(), "osx".to_string()),
                ("aarch64".to_string(), "arm64".to_string()),
                // No Windows ARM64 build; the x86_64 one runs under emulation
                ("windows-aarch64".to_string(), "x86_64".to_string()),
            ]),
        });
        catalog
    }

    /// Built-in descriptors merged with `<root>/extensions.toml`, validated.
    pub fn load(layout: &StorageLayout) -> Result<Self> {
        let mut catalog = Self::builtin();
        let path = layout.catalog_path();
        if let Some(content) = pact_fs::io::read_optional(&path)? {
            let file: CatalogFile = toml::from_str(&content).map_err(|e| Error::CatalogParse {
                path: path.clone(),
                message: e.to_string(),
            })?;
            for (name, config) in file.extensions {
                tracing::debug!(extension = %name, path = %path.display(), "Catalog override");
                catalog.register(config.into_descriptor(&name));
            }
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Register a descriptor, replacing any entry of the same name.
    pub fn register(&mut self, descriptor: ExtensionDescriptor) {
        self.entries.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionDescriptor> {
        self.entries.get(name)
    }

    /// Look up a descriptor, failing with [`Error::UnknownExtension`].
    pub fn require(&self, name: &str) -> Result<&ExtensionDescriptor> {
        self.get(name)
            .ok_or_else(|| Error::UnknownExtension(name.to_string()))
    }

    /// All extension names (sorted).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Descriptors in name order.
    pub fn descriptors(&self) -> Vec<&ExtensionDescriptor> {
        let mut descriptors: Vec<_> = self.entries.values().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every descriptor and reject aliases shared across descriptors.
    pub fn validate(&self) -> Result<()> {
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for descriptor in self.descriptors() {
            descriptor.validate()?;
            for alias in descriptor.aliases() {
                if let Some(owner) = owners.insert(alias, &descriptor.name) {
                    return Err(Error::InvalidDescriptor {
                        name: descriptor.name.clone(),
                        reason: format!("alias '{alias}' is also declared by '{owner}'"),
                    });
                }
            }
        }
        Ok(())
    }
}
