use pact_extensions::{Catalog, Error, ExtensionKind, VersionSource};
use pact_test_utils::root::TestRoot;

#[test]
fn test_no_catalog_file_gives_builtins() {
    let root = TestRoot::new();
    let catalog = Catalog::load(root.layout()).unwrap();
    assert_eq!(catalog.names(), Catalog::builtin().names());
}

#[test]
fn test_catalog_file_overrides_and_extends() {
    let root = TestRoot::new();
    root.write_catalog(
        r#"
[extensions."pactflow-ai"]
kind = "single-binary"
description = "Mirror"
tools = [{ alias = "pactflow-ai", member = "pactflow-ai" }]
source = { type = "direct-endpoint", latest_url = "https://mirror.example/{target}/latest", download_url = "https://mirror.example/{target}/{version}/pactflow-ai{exe}" }

[extensions."drift"]
kind = "bundle"
asset = "drift-{version_bare}-{target}.{archive}"
tools = [{ alias = "drift", member = "bin/drift" }]
source = { type = "release-api", api_url = "https://api.github.com/repos/example/drift/releases/latest", download_url = "https://github.com/example/drift/releases/download/{tag}/{asset}" }
"#,
    );

    let catalog = Catalog::load(root.layout()).unwrap();

    assert_eq!(catalog.names(), vec!["drift", "pact-legacy", "pactflow-ai"]);
    let ai = catalog.get("pactflow-ai").unwrap();
    assert_eq!(ai.description, "Mirror");
    assert!(matches!(
        &ai.source,
        VersionSource::DirectEndpoint { latest_url, .. } if latest_url.starts_with("https://mirror.example")
    ));
    let drift = catalog.get("drift").unwrap();
    assert_eq!(drift.kind, ExtensionKind::Bundle);
    assert_eq!(drift.tools[0].member, "bin/drift");
}

#[test]
fn test_invalid_toml_is_catalog_parse_error() {
    let root = TestRoot::new();
    root.write_catalog("[extensions.\"broken\"\nkind = ");

    let err = Catalog::load(root.layout()).unwrap_err();
    assert!(matches!(err, Error::CatalogParse { .. }), "{err}");
}

#[test]
fn test_alias_shared_across_descriptors_is_rejected() {
    let root = TestRoot::new();
    root.write_catalog(
        r#"
[extensions."copycat"]
kind = "single-binary"
tools = [{ alias = "mock-legacy", member = "copycat" }]
source = { type = "direct-endpoint", latest_url = "https://example.com/latest", download_url = "https://example.com/{version}/copycat" }
"#,
    );

    let err = Catalog::load(root.layout()).unwrap_err();
    assert!(
        matches!(err, Error::InvalidDescriptor { ref reason, .. } if reason.contains("mock-legacy")),
        "{err}"
    );
}

#[test]
fn test_unknown_extension_lookup() {
    let catalog = Catalog::builtin();
    assert!(matches!(
        catalog.require("nope"),
        Err(Error::UnknownExtension(ref name)) if name == "nope"
    ));
}
