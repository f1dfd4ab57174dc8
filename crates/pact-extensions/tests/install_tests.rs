//! Install, update and uninstall against a temporary storage root.
#![cfg(unix)]

use pact_extensions::{
    Catalog, Error, ExtensionDescriptor, ExtensionKind, InstallManager, Libc, Os, Arch,
    ToolSpec, UpdateOutcome, VersionRequest, VersionSource,
};
use pact_fs::alias;
use pact_test_utils::archive::{LEGACY_MEMBERS, legacy_bundle, version_script, zip};
use pact_test_utils::root::TestRoot;
use pact_test_utils::transport::FakeTransport;
use pact_test_utils::platform;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

const AI_LATEST: &str = "https://download.pactflow.io/ai/dist/aarch64-apple-darwin/latest";
const AI_1_11_3: &str = "https://download.pactflow.io/ai/dist/aarch64-apple-darwin/1.11.3/pactflow-ai";
const AI_1_11_4: &str = "https://download.pactflow.io/ai/dist/aarch64-apple-darwin/1.11.4/pactflow-ai";

const LEGACY_API: &str =
    "https://api.github.com/repos/pact-foundation/pact-standalone/releases/latest";
const LEGACY_V240: &str = "https://github.com/pact-foundation/pact-standalone/releases/download/v2.4.0/pact-2.4.0-linux-x86_64.tar.gz";
const LEGACY_V250: &str = "https://github.com/pact-foundation/pact-standalone/releases/download/v2.5.0/pact-2.5.0-linux-x86_64.tar.gz";

fn release_json(tag: &str, assets: &[&str]) -> String {
    let assets: Vec<String> = assets
        .iter()
        .map(|name| format!(r#"{{"name":"{name}","browser_download_url":"https://example.com/{name}"}}"#))
        .collect();
    format!(r#"{{"tag_name":"{tag}","assets":[{}]}}"#, assets.join(","))
}

fn ai_transport() -> FakeTransport {
    FakeTransport::new()
        .with_text(AI_LATEST, "1.11.4\n")
        .with_bytes(AI_1_11_3, version_script("pactflow-ai", "1.11.3"))
        .with_bytes(AI_1_11_4, version_script("pactflow-ai", "1.11.4"))
}

#[test]
fn test_install_pactflow_ai_on_macos_aarch64() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    let record = manager
        .install(
            &mut registry,
            catalog.get("pactflow-ai").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap();

    assert_eq!(record.name, "pactflow-ai");
    assert_eq!(record.version, "1.11.4");
    assert_eq!(record.kind, ExtensionKind::SingleBinary);
    assert_eq!(record.platform.os, Os::Macos);
    assert_eq!(record.platform.arch, Arch::Aarch64);
    assert_eq!(record.platform.libc, None);

    let placed = root.root().join("single-binary").join("pactflow-ai").join("pactflow-ai");
    assert_eq!(
        record.binary_paths,
        BTreeMap::from([("pactflow-ai".to_string(), placed.clone())])
    );
    assert!(pact_fs::io::is_executable(&placed));
    assert_eq!(alias::alias_target(&root.alias_path("pactflow-ai")), Some(placed));

    let reloaded = root.registry();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get("pactflow-ai"), Some(&record));
    assert!(root.staging_is_clean());
    assert_eq!(transport.request_count(AI_LATEST), 1);
    assert_eq!(transport.request_count(AI_1_11_4), 1);
}

#[test]
fn test_install_exact_version_skips_latest_lookup() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    let record = manager
        .install(
            &mut registry,
            catalog.get("pactflow-ai").unwrap(),
            &VersionRequest::Exact("1.11.3".to_string()),
            false,
        )
        .unwrap();

    assert_eq!(record.version, "1.11.3");
    assert_eq!(transport.request_count(AI_LATEST), 0);
}

#[test]
fn test_second_install_requires_force() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let descriptor = catalog.get("pactflow-ai").unwrap();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    manager
        .install(&mut registry, descriptor, &VersionRequest::Latest, false)
        .unwrap();
    let err = manager
        .install(&mut registry, descriptor, &VersionRequest::Latest, false)
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInstalled(ref name) if name == "pactflow-ai"));

    manager
        .install(&mut registry, descriptor, &VersionRequest::Latest, true)
        .unwrap();
    assert_eq!(transport.request_count(AI_1_11_4), 2);
}

#[test]
fn test_failed_download_leaves_nothing_behind() {
    let root = TestRoot::new();
    let transport = FakeTransport::new()
        .with_text(AI_LATEST, "1.11.4")
        .with_status(AI_1_11_4, 500);
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    let err = manager
        .install(
            &mut registry,
            catalog.get("pactflow-ai").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Network { status: Some(500), .. }), "{err}");
    assert!(registry.is_empty());
    assert!(root.registry().is_empty());
    assert!(!root.alias_exists("pactflow-ai"));
    assert!(!root.root().join("single-binary").join("pactflow-ai").exists());
    assert!(root.staging_is_clean());
}

#[test]
fn test_missing_binary_is_asset_not_found() {
    let root = TestRoot::new();
    let transport = FakeTransport::new().with_text(AI_LATEST, "1.11.4");
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    let err = manager
        .install(
            &mut registry,
            catalog.get("pactflow-ai").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap_err();

    match err {
        Error::AssetNotFound {
            asset,
            version,
            platform,
        } => {
            assert_eq!(asset, "pactflow-ai");
            assert_eq!(version, "1.11.4");
            assert_eq!(platform, "macos-aarch64");
        }
        other => panic!("expected AssetNotFound, got {other:?}"),
    }
}

#[test]
fn test_update_is_idempotent() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let descriptor = catalog.get("pactflow-ai").unwrap();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    manager
        .install(
            &mut registry,
            descriptor,
            &VersionRequest::Exact("1.11.3".to_string()),
            false,
        )
        .unwrap();

    let first = manager.update(&mut registry, descriptor).unwrap();
    let updated = match first {
        UpdateOutcome::Updated { from, record } => {
            assert_eq!(from, "1.11.3");
            assert_eq!(record.version, "1.11.4");
            record
        }
        other => panic!("expected an update, got {other:?}"),
    };
    let downloads = transport.request_count(AI_1_11_4);
    assert_eq!(downloads, 1);

    let second = manager.update(&mut registry, descriptor).unwrap();
    assert_eq!(second, UpdateOutcome::UpToDate(updated.clone()));
    assert_eq!(transport.request_count(AI_1_11_4), downloads);
    assert_eq!(root.registry().get("pactflow-ai"), Some(&updated));
}

#[test]
fn test_update_requires_installed_record() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();

    let err = manager
        .update(&mut registry, catalog.get("pactflow-ai").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::NotInstalled(_)));
    assert_eq!(transport.requests().len(), 0);
}

fn legacy_transport() -> FakeTransport {
    FakeTransport::new()
        .with_text(
            LEGACY_API,
            &release_json("v2.4.0", &["pact-2.4.0-linux-x86_64.tar.gz", "pact-2.4.0-osx-arm64.tar.gz"]),
        )
        .with_bytes(LEGACY_V240, legacy_bundle("2.4.0", &[]))
}

#[test]
fn test_install_legacy_bundle_creates_every_alias() {
    let root = TestRoot::new();
    let transport = legacy_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();

    let record = manager
        .install(
            &mut registry,
            catalog.get("pact-legacy").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap();

    assert_eq!(record.version, "v2.4.0");
    assert_eq!(record.platform.libc, Some(Libc::Gnu));
    let install_dir = root.root().join("bundle").join("pact-legacy");
    assert_eq!(
        record.binary_paths.get("mock-legacy"),
        Some(&install_dir.join("bin").join("pact-mock-service"))
    );
    assert_eq!(record.binary_paths.len(), LEGACY_MEMBERS.len());
    for alias_name in record.binary_paths.keys() {
        assert!(alias::alias_resolves(&root.alias_path(alias_name)), "{alias_name}");
    }
    // the single top-level directory is stripped
    assert!(install_dir.join("README.md").is_file());
    assert!(record.broken_aliases(root.layout()).is_empty());
}

#[test]
fn test_corrupt_bundle_keeps_previous_installation() {
    let root = TestRoot::new();
    let transport = legacy_transport();
    let catalog = Catalog::builtin();
    let descriptor = catalog.get("pact-legacy").unwrap();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();
    let original = manager
        .install(&mut registry, descriptor, &VersionRequest::Latest, false)
        .unwrap();

    transport.set_bytes(LEGACY_V250, legacy_bundle("2.5.0", &["bin/pact-stub-service"]));
    let err = manager
        .install(
            &mut registry,
            descriptor,
            &VersionRequest::Exact("v2.5.0".to_string()),
            true,
        )
        .unwrap_err();

    match &err {
        Error::CorruptArchive { reason, .. } => assert!(reason.contains("pact-stub-service")),
        other => panic!("expected CorruptArchive, got {other:?}"),
    }
    assert_eq!(root.registry().get("pact-legacy"), Some(&original));
    for binary in original.binary_paths.values() {
        assert!(binary.is_file(), "{} vanished", binary.display());
    }
    assert!(root.staging_is_clean());
}

#[test]
fn test_garbage_bundle_is_corrupt_archive() {
    let root = TestRoot::new();
    let transport = legacy_transport().with_bytes(LEGACY_V240, b"<html>rate limited</html>".to_vec());
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();

    let err = manager
        .install(
            &mut registry,
            catalog.get("pact-legacy").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, Error::CorruptArchive { .. }), "{err}");
    assert!(root.registry().is_empty());
}

#[test]
fn test_release_without_platform_asset() {
    let root = TestRoot::new();
    let transport = FakeTransport::new().with_text(
        LEGACY_API,
        &release_json("v2.4.0", &["pact-2.4.0-osx-arm64.tar.gz"]),
    );
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();

    let err = manager
        .install(
            &mut registry,
            catalog.get("pact-legacy").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap_err();
    assert!(matches!(err, Error::AssetNotFound { ref asset, .. } if asset == "pact-2.4.0-linux-x86_64.tar.gz"));
}

#[test]
fn test_alias_conflict_is_rejected() {
    let root = TestRoot::new();
    let transport = ai_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("macos", "arm64"));
    let mut registry = root.registry();
    manager
        .install(
            &mut registry,
            catalog.get("pactflow-ai").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap();

    let mut impostor = catalog.get("pactflow-ai").unwrap().clone();
    impostor.name = "pactflow-ai-nightly".to_string();
    let err = manager
        .install(&mut registry, &impostor, &VersionRequest::Latest, false)
        .unwrap_err();

    match err {
        Error::AliasConflict { alias, owner } => {
            assert_eq!(alias, "pactflow-ai");
            assert_eq!(owner, "pactflow-ai");
        }
        other => panic!("expected AliasConflict, got {other:?}"),
    }
    assert_eq!(root.registry().len(), 1);
}

#[test]
fn test_uninstall_removes_aliases_files_and_record() {
    let root = TestRoot::new();
    let transport = legacy_transport();
    let catalog = Catalog::builtin();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();
    let record = manager
        .install(
            &mut registry,
            catalog.get("pact-legacy").unwrap(),
            &VersionRequest::Latest,
            false,
        )
        .unwrap();

    let removed = manager.uninstall(&mut registry, "pact-legacy").unwrap();

    assert_eq!(removed, record);
    for alias_name in record.binary_paths.keys() {
        assert!(!root.alias_exists(alias_name), "{alias_name} still present");
    }
    assert!(!root.root().join("bundle").join("pact-legacy").exists());
    assert!(root.registry().is_empty());

    let err = manager.uninstall(&mut registry, "pact-legacy").unwrap_err();
    assert!(matches!(err, Error::NotInstalled(_)));
}

#[test]
fn test_zip_bundle_without_top_level_directory() {
    let root = TestRoot::new();
    let descriptor = ExtensionDescriptor {
        name: "tools".to_string(),
        description: "Zip packaged tools".to_string(),
        kind: ExtensionKind::Bundle,
        source: VersionSource::DirectEndpoint {
            latest_url: "https://example.com/tools/latest".to_string(),
            download_url: "https://example.com/tools/{asset}".to_string(),
        },
        asset: "tools-{version}.zip".to_string(),
        tools: vec![
            ToolSpec::new("tool-one", "one"),
            ToolSpec::new("tool-two", "nested/two"),
        ],
        platform_names: BTreeMap::new(),
    };
    descriptor.validate().unwrap();

    let transport = FakeTransport::new()
        .with_text("https://example.com/tools/latest", "3.0.0")
        .with_bytes(
            "https://example.com/tools/tools-3.0.0.zip",
            zip(&[
                ("one", version_script("one", "3.0.0")),
                ("nested/two", version_script("two", "3.0.0")),
            ]),
        );
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "aarch64"));
    let mut registry = root.registry();

    let record = manager
        .install(&mut registry, &descriptor, &VersionRequest::Latest, false)
        .unwrap();

    let install_dir = root.root().join("bundle").join("tools");
    assert_eq!(
        record.binary_paths.get("tool-two"),
        Some(&install_dir.join("nested").join("two"))
    );
    assert!(pact_fs::io::is_executable(&install_dir.join("one")));
}

#[test]
fn test_reinstall_drops_aliases_no_longer_declared() {
    let root = TestRoot::new();
    let transport = legacy_transport();
    let catalog = Catalog::builtin();
    let mut descriptor = catalog.get("pact-legacy").unwrap().clone();
    let manager = InstallManager::new(root.layout(), &transport, platform("linux", "x86_64"));
    let mut registry = root.registry();
    manager
        .install(&mut registry, &descriptor, &VersionRequest::Latest, false)
        .unwrap();

    descriptor.tools.retain(|tool| tool.alias != "message-legacy");
    let record = manager
        .install(&mut registry, &descriptor, &VersionRequest::Latest, true)
        .unwrap();

    assert!(!record.binary_paths.contains_key("message-legacy"));
    assert!(!root.alias_exists("message-legacy"));
    assert!(root.alias_exists("mock-legacy"));
}
