//! [`TestRoot`]: a temporary storage root.

use std::fs;
use std::path::{Path, PathBuf};

use pact_extensions::Registry;
use pact_fs::StorageLayout;
use tempfile::TempDir;

/// A storage root in a temporary directory, removed on drop.
pub struct TestRoot {
    temp_dir: TempDir,
    layout: StorageLayout,
}

impl Default for TestRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoot {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let layout = StorageLayout::new(temp_dir.path().join("extensions"));
        Self { temp_dir, layout }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// A scratch directory next to the storage root.
    pub fn scratch(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("scratch");
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    /// Freshly load the registry from disk.
    pub fn registry(&self) -> Registry {
        Registry::open(&self.layout).expect("load registry")
    }

    pub fn write_catalog(&self, toml: &str) {
        fs::create_dir_all(self.root()).expect("create root");
        fs::write(self.layout.catalog_path(), toml).expect("write catalog");
    }

    pub fn write_manifest(&self, json: &str) {
        fs::create_dir_all(self.root()).expect("create root");
        fs::write(self.layout.manifest_path(), json).expect("write manifest");
    }

    pub fn alias_path(&self, alias: &str) -> PathBuf {
        self.layout.alias_path(alias)
    }

    /// Whether an alias entry exists, dangling or not.
    pub fn alias_exists(&self, alias: &str) -> bool {
        fs::symlink_metadata(self.alias_path(alias)).is_ok()
    }

    /// Whether the staging area holds no leftovers.
    pub fn staging_is_clean(&self) -> bool {
        match fs::read_dir(self.layout.staging_dir()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}
