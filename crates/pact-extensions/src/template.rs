//! `{placeholder}` expansion for URL and asset templates.

use std::collections::BTreeMap;

use crate::descriptor::{ExtensionDescriptor, ExtensionKind};
use crate::platform::Platform;

/// Placeholders a template may reference.
pub const PLACEHOLDERS: [&str; 12] = [
    "name",
    "tool",
    "version",
    "version_bare",
    "tag",
    "os",
    "arch",
    "libc",
    "exe",
    "archive",
    "target",
    "asset",
];

/// Values for every placeholder, for one (descriptor, version, platform).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<&'static str, String>,
}

impl TemplateVars {
    pub fn new(descriptor: &ExtensionDescriptor, version: &str, platform: &Platform) -> Self {
        let version = version.trim();
        let tool = match descriptor.kind {
            ExtensionKind::SingleBinary => descriptor
                .tools
                .first()
                .map(|tool| tool.file_stem().to_string())
                .unwrap_or_else(|| descriptor.name.clone()),
            ExtensionKind::Bundle => descriptor.name.clone(),
        };
        let os = platform.os.as_str();
        let arch = platform.arch.as_str();
        let names = &descriptor.platform_names;

        let mut values = BTreeMap::new();
        values.insert("name", descriptor.name.clone());
        values.insert("tool", tool);
        values.insert("version", version.to_string());
        values.insert(
            "version_bare",
            version.strip_prefix('v').unwrap_or(version).to_string(),
        );
        values.insert("tag", version.to_string());
        values.insert(
            "os",
            names.get(os).cloned().unwrap_or_else(|| os.to_string()),
        );
        values.insert(
            "arch",
            names
                .get(&format!("{os}-{arch}"))
                .or_else(|| names.get(arch))
                .cloned()
                .unwrap_or_else(|| arch.to_string()),
        );
        values.insert(
            "libc",
            platform
                .libc
                .map(|libc| format!("-{}", libc.as_str()))
                .unwrap_or_default(),
        );
        values.insert("exe", platform.exe_suffix().to_string());
        values.insert("archive", platform.archive_ext().to_string());
        values.insert("target", platform.target_triple());

        let mut vars = Self { values };
        let asset = vars.render(&descriptor.asset);
        vars.values.insert("asset", asset);
        vars
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The rendered asset name.
    pub fn asset(&self) -> &str {
        self.get("asset").unwrap_or_default()
    }

    /// Expand every known placeholder; unknown ones are left verbatim.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let key = &after[..close];
                    match self.values.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Placeholders referenced by `template` that are not in [`PLACEHOLDERS`].
pub fn unknown_placeholders(template: &str) -> Vec<String> {
    let mut unknown = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let key = &after[..close];
        if !PLACEHOLDERS.contains(&key) {
            unknown.push(key.to_string());
        }
        rest = &after[close + 1..];
    }
    unknown
}
