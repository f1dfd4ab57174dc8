//! Persisted registry of installed extensions (`<root>/config.json`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pact_fs::StorageLayout;

use crate::descriptor::ExtensionKind;
use crate::platform::Platform;
use crate::{Error, Result};

/// Manifest schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata of one installed extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledExtensionRecord {
    pub name: String,
    pub kind: ExtensionKind,
    pub version: String,
    pub installed_at: DateTime<Utc>,
    /// Alias to absolute path of the placed binary.
    pub binary_paths: BTreeMap<String, PathBuf>,
    pub platform: Platform,
}

impl InstalledExtensionRecord {
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.binary_paths.keys().map(String::as_str)
    }

    /// Aliases whose entry under `bin/` or whose placed binary is missing.
    pub fn broken_aliases(&self, layout: &StorageLayout) -> Vec<String> {
        self.binary_paths
            .iter()
            .filter(|(alias, binary)| {
                !binary.is_file() || !pact_fs::alias::alias_resolves(&layout.alias_path(alias))
            })
            .map(|(alias, _)| alias.clone())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    schema_version: u32,
    #[serde(default)]
    extensions: BTreeMap<String, InstalledExtensionRecord>,
}

/// Installed extensions keyed by name, bound to the manifest they came from.
///
/// Loaded once per invocation, mutated in memory and flushed with [`Registry::save`]
/// after each successful install, update or uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    path: PathBuf,
    records: BTreeMap<String, InstalledExtensionRecord>,
}

impl Registry {
    /// An empty registry that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: BTreeMap::new(),
        }
    }

    /// Load the manifest at `path`; absent means empty, unparsable is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(content) = pact_fs::io::read_optional(&path)? else {
            tracing::debug!(path = %path.display(), "No registry manifest, starting empty");
            return Ok(Self::empty(path));
        };

        let corrupt = |message: String| Error::RegistryCorrupt {
            path: path.clone(),
            message,
        };

        let manifest: Manifest = serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        if manifest.schema_version != SCHEMA_VERSION {
            return Err(corrupt(format!(
                "unsupported schema version {}",
                manifest.schema_version
            )));
        }
        if let Some((key, record)) = manifest
            .extensions
            .iter()
            .find(|(key, record)| **key != record.name)
        {
            return Err(corrupt(format!(
                "entry '{key}' holds a record named '{}'",
                record.name
            )));
        }

        tracing::debug!(
            path = %path.display(),
            count = manifest.extensions.len(),
            "Loaded registry"
        );
        Ok(Self {
            path,
            records: manifest.extensions,
        })
    }

    /// Load the registry of a storage root.
    pub fn open(layout: &StorageLayout) -> Result<Self> {
        Self::load(layout.manifest_path())
    }

    /// Write the whole manifest atomically.
    pub fn save(&self) -> Result<()> {
        let manifest = Manifest {
            schema_version: SCHEMA_VERSION,
            extensions: self.records.clone(),
        };
        let mut json = serde_json::to_string_pretty(&manifest).map_err(|e| Error::RegistryCorrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        json.push('\n');
        pact_fs::io::write_atomic(&self.path, json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), count = self.records.len(), "Saved registry");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&InstalledExtensionRecord> {
        self.records.get(name)
    }

    /// Insert or replace a record, returning the previous one.
    pub fn put(&mut self, record: InstalledExtensionRecord) -> Option<InstalledExtensionRecord> {
        self.records.insert(record.name.clone(), record)
    }

    pub fn remove(&mut self, name: &str) -> Option<InstalledExtensionRecord> {
        self.records.remove(name)
    }

    /// Records in name order.
    pub fn records(&self) -> impl Iterator<Item = &InstalledExtensionRecord> {
        self.records.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// The record providing `alias` and the binary it maps to.
    pub fn find_alias(&self, alias: &str) -> Option<(&InstalledExtensionRecord, &Path)> {
        self.records.values().find_map(|record| {
            record
                .binary_paths
                .get(alias)
                .map(|binary| (record, binary.as_path()))
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
