use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use pact_extensions::{Error, ExtensionKind, InstalledExtensionRecord, Libc, Platform, Registry};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn record(name: &str, kind: ExtensionKind, aliases: &[&str]) -> InstalledExtensionRecord {
    InstalledExtensionRecord {
        name: name.to_string(),
        kind,
        version: "1.11.4".to_string(),
        installed_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
        binary_paths: aliases
            .iter()
            .map(|alias| (alias.to_string(), PathBuf::from(format!("/opt/pact/{alias}"))))
            .collect::<BTreeMap<_, _>>(),
        platform: Platform::from_raw("linux", "aarch64", || Libc::Musl).unwrap(),
    }
}

#[test]
fn test_missing_manifest_loads_empty() {
    let temp = TempDir::new().unwrap();
    let registry = Registry::load(temp.path().join("config.json")).unwrap();
    assert!(registry.is_empty());
    assert_eq!(registry.records().count(), 0);
}

#[test]
fn test_empty_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");

    Registry::empty(&path).save().unwrap();
    let reloaded = Registry::load(&path).unwrap();

    assert!(reloaded.is_empty());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap().trim(),
        "{\n  \"schemaVersion\": 1,\n  \"extensions\": {}\n}"
    );
}

#[test]
fn test_round_trip_preserves_every_field() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");

    let mut registry = Registry::empty(&path);
    registry.put(record("pactflow-ai", ExtensionKind::SingleBinary, &["pactflow-ai"]));
    registry.put(record(
        "pact-legacy",
        ExtensionKind::Bundle,
        &["mock-legacy", "stub-legacy", "verifier-legacy"],
    ));
    registry.save().unwrap();

    let reloaded = Registry::load(&path).unwrap();
    assert_eq!(reloaded, registry);
    assert_eq!(reloaded.names(), vec!["pact-legacy", "pactflow-ai"]);
}

#[test]
fn test_remove_then_save() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let mut registry = Registry::empty(&path);
    registry.put(record("pactflow-ai", ExtensionKind::SingleBinary, &["pactflow-ai"]));
    registry.save().unwrap();

    let removed = registry.remove("pactflow-ai").unwrap();
    assert_eq!(removed.name, "pactflow-ai");
    assert!(registry.remove("pactflow-ai").is_none());
    registry.save().unwrap();

    assert!(Registry::load(&path).unwrap().is_empty());
}

#[test]
fn test_unparsable_manifest_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = Registry::load(&path).unwrap_err();
    assert!(matches!(err, Error::RegistryCorrupt { .. }), "{err}");
}

#[test]
fn test_future_schema_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    std::fs::write(&path, r#"{"schemaVersion": 2, "extensions": {}}"#).unwrap();

    let err = Registry::load(&path).unwrap_err();
    assert!(err.to_string().contains("schema version 2"), "{err}");
}

#[test]
fn test_save_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let mut registry = Registry::empty(temp.path().join("config.json"));
    registry.put(record("pactflow-ai", ExtensionKind::SingleBinary, &["pactflow-ai"]));
    registry.save().unwrap();
    registry.save().unwrap();

    let names: Vec<_> = std::fs::read_dir(temp.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["config.json"]);
}
