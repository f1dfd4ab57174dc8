//! Extension command implementations.
//!
//! CLI handlers for the `pact extension` subcommands: list, install, update,
//! uninstall and env. Mutating handlers hold the storage-root lock and load
//! the registry only after acquiring it.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use pact_extensions::version::versions_match;
use pact_extensions::{
    ExtensionDescriptor, ExtensionKind, InstallManager, InstalledExtensionRecord, Registry,
    UpdateOutcome, VersionRequest,
};
use pact_fs::{StorageLayout, StorageLock};

use crate::context::CommandContext;
use crate::error::{CliError, Result};

/// A single named extension or every applicable one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    All,
}

impl Selection {
    pub fn from_args(name: Option<String>, all: bool) -> Result<Self> {
        match (name, all) {
            (_, true) => Ok(Self::All),
            (Some(name), false) => Ok(Self::One(name)),
            (None, false) => Err(CliError::user("specify an extension name or --all")),
        }
    }
}

/// Installation state shown by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtensionStatus {
    #[serde(rename = "installed")]
    Installed,
    #[serde(rename = "update available")]
    UpdateAvailable,
    #[serde(rename = "not installed")]
    NotInstalled,
    /// Recorded as installed but an alias or its binary is missing
    #[serde(rename = "broken")]
    Broken,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::UpdateAvailable => "update available",
            Self::NotInstalled => "not installed",
            Self::Broken => "broken",
        }
    }

    fn color(&self) -> Color {
        match self {
            Self::Installed => Color::Green,
            Self::UpdateAvailable => Color::Yellow,
            Self::NotInstalled => Color::Grey,
            Self::Broken => Color::Red,
        }
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of `pact extension list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub name: String,
    pub kind: ExtensionKind,
    pub description: String,
    pub installed_version: Option<String>,
    /// `None` when the latest version could not be resolved
    pub latest_version: Option<String>,
    pub status: ExtensionStatus,
}

/// Rows for every catalog descriptor and every registry record, by name.
pub fn list_rows(ctx: &CommandContext<'_>, registry: &Registry, installed_only: bool) -> Vec<ListRow> {
    let platform = match ctx.platform() {
        Ok(platform) => Some(platform),
        Err(e) => {
            tracing::warn!("Latest versions unavailable: {e}");
            None
        }
    };
    let resolver = ctx.resolver();

    let names: BTreeSet<String> = ctx
        .catalog
        .names()
        .into_iter()
        .chain(registry.names())
        .collect();

    let mut rows = Vec::new();
    for name in names {
        let descriptor = ctx.catalog.get(&name);
        let record = registry.get(&name);
        if installed_only && record.is_none() {
            continue;
        }
        let Some(kind) = descriptor.map(|d| d.kind).or(record.map(|r| r.kind)) else {
            continue;
        };

        let installed_version = match (descriptor, record) {
            (Some(descriptor), Some(_)) => resolver.resolve_installed(descriptor, registry),
            (None, Some(record)) => Some(record.version.clone()),
            (_, None) => None,
        };

        let latest_version = match (descriptor, platform.as_ref()) {
            (Some(descriptor), Some(platform)) => match resolver.resolve_latest(descriptor, platform) {
                Ok(version) => Some(version),
                Err(e) => {
                    tracing::debug!(extension = %name, "Latest version unknown: {e}");
                    None
                }
            },
            _ => None,
        };

        let status = status_of(ctx.layout, record, installed_version.as_deref(), latest_version.as_deref());
        rows.push(ListRow {
            description: descriptor.map(|d| d.description.clone()).unwrap_or_default(),
            name,
            kind,
            installed_version,
            latest_version,
            status,
        });
    }
    rows
}

fn status_of(
    layout: &StorageLayout,
    record: Option<&InstalledExtensionRecord>,
    installed: Option<&str>,
    latest: Option<&str>,
) -> ExtensionStatus {
    let Some(record) = record else {
        return ExtensionStatus::NotInstalled;
    };
    if !record.broken_aliases(layout).is_empty() {
        return ExtensionStatus::Broken;
    }
    match (installed, latest) {
        (Some(installed), Some(latest)) if !versions_match(installed, latest) => {
            ExtensionStatus::UpdateAvailable
        }
        _ => ExtensionStatus::Installed,
    }
}

/// Handle `pact extension list [--installed] [--json]`
pub fn handle_extension_list(ctx: &CommandContext<'_>, installed_only: bool, json: bool) -> Result<()> {
    let registry = Registry::open(ctx.layout)?;
    let rows = list_rows(ctx, &registry, installed_only);

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        if installed_only {
            println!("{} No extensions installed", "=>".blue().bold());
        } else {
            println!("{} No extensions available", "=>".blue().bold());
        }
        return Ok(());
    }

    let mut table = Table::new();
    table
        .set_header(vec!["Name", "Type", "Installed", "Latest", "Status"])
        .set_content_arrangement(ContentArrangement::Dynamic);
    for row in &rows {
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.kind.as_str()),
            Cell::new(row.installed_version.as_deref().unwrap_or("-")),
            Cell::new(row.latest_version.as_deref().unwrap_or("unknown")),
            Cell::new(row.status.as_str()).fg(row.status.color()),
        ]);
    }
    println!("{table}");

    if rows.iter().any(|row| row.status == ExtensionStatus::Broken) {
        println!(
            "   {} Reinstall broken extensions with {}",
            "Hint:".dimmed(),
            "pact extension install <name> --force".bold()
        );
    }
    Ok(())
}

/// Handle `pact extension install (<name> | --all) [--version <v>] [--force]`
pub fn handle_extension_install(
    ctx: &CommandContext<'_>,
    selection: Selection,
    version: Option<&str>,
    force: bool,
) -> Result<()> {
    let installer = ctx.installer()?;
    ctx.layout.ensure()?;
    let _lock = StorageLock::acquire(ctx.layout)?;
    let mut registry = Registry::open(ctx.layout)?;
    let request = VersionRequest::from_option(version);

    match selection {
        Selection::One(name) => {
            let descriptor = ctx.catalog.require(&name)?;
            install_one(&installer, &mut registry, descriptor, &request, force)?;
        }
        Selection::All => {
            let mut failures = Failures::new("install");
            for descriptor in ctx.catalog.descriptors() {
                if registry.get(&descriptor.name).is_some() && !force {
                    println!(
                        "{} {} is already installed, skipping",
                        "=>".blue().bold(),
                        descriptor.name.cyan()
                    );
                    continue;
                }
                if let Err(e) = install_one(&installer, &mut registry, descriptor, &request, force) {
                    failures.record(&descriptor.name, e);
                }
            }
            failures.finish()?;
        }
    }

    print_path_hint(ctx.layout);
    Ok(())
}

fn install_one(
    installer: &InstallManager<'_>,
    registry: &mut Registry,
    descriptor: &ExtensionDescriptor,
    request: &VersionRequest,
    force: bool,
) -> Result<()> {
    let wanted = match request {
        VersionRequest::Latest => "latest".to_string(),
        VersionRequest::Exact(version) => version.clone(),
    };
    println!(
        "{} Installing {} ({}) for {}",
        "=>".blue().bold(),
        descriptor.name.cyan(),
        wanted,
        installer.platform()
    );

    let record = installer.install(registry, descriptor, request, force)?;
    println!(
        "{} Installed {} {}",
        "✓".green().bold(),
        record.name.cyan(),
        record.version
    );
    print_aliases(&record);
    Ok(())
}

/// Handle `pact extension update (<name> | --all)`
pub fn handle_extension_update(ctx: &CommandContext<'_>, selection: Selection) -> Result<()> {
    let installer = ctx.installer()?;
    ctx.layout.ensure()?;
    let _lock = StorageLock::acquire(ctx.layout)?;
    let mut registry = Registry::open(ctx.layout)?;

    match selection {
        Selection::One(name) => {
            let descriptor = ctx.catalog.require(&name)?;
            update_one(&installer, &mut registry, descriptor)?;
        }
        Selection::All => {
            let names = registry.names();
            if names.is_empty() {
                return Err(CliError::user(
                    "no extensions are installed; install one with 'pact extension install <name>'",
                ));
            }
            let mut failures = Failures::new("update");
            for name in names {
                let result = ctx
                    .catalog
                    .require(&name)
                    .map_err(CliError::from)
                    .and_then(|descriptor| update_one(&installer, &mut registry, descriptor));
                if let Err(e) = result {
                    failures.record(&name, e);
                }
            }
            failures.finish()?;
        }
    }
    Ok(())
}

fn update_one(
    installer: &InstallManager<'_>,
    registry: &mut Registry,
    descriptor: &ExtensionDescriptor,
) -> Result<()> {
    println!(
        "{} Checking {} for updates",
        "=>".blue().bold(),
        descriptor.name.cyan()
    );
    match installer.update(registry, descriptor)? {
        UpdateOutcome::UpToDate(record) => {
            println!(
                "{} {} is up to date ({})",
                "✓".green().bold(),
                record.name.cyan(),
                record.version
            );
        }
        UpdateOutcome::Updated { from, record } => {
            println!(
                "{} Updated {} {} -> {}",
                "✓".green().bold(),
                record.name.cyan(),
                from,
                record.version
            );
            print_aliases(&record);
        }
    }
    Ok(())
}

/// Handle `pact extension uninstall (<name> | --all)`
pub fn handle_extension_uninstall(ctx: &CommandContext<'_>, selection: Selection) -> Result<()> {
    ctx.layout.ensure()?;
    let _lock = StorageLock::acquire(ctx.layout)?;
    let mut registry = Registry::open(ctx.layout)?;

    match selection {
        Selection::One(name) => uninstall_one(ctx, &mut registry, &name)?,
        Selection::All => {
            let names = registry.names();
            if names.is_empty() {
                println!("{} No extensions installed", "=>".blue().bold());
                return Ok(());
            }
            let mut failures = Failures::new("uninstall");
            for name in names {
                if let Err(e) = uninstall_one(ctx, &mut registry, &name) {
                    failures.record(&name, e);
                }
            }
            failures.finish()?;
        }
    }
    Ok(())
}

fn uninstall_one(ctx: &CommandContext<'_>, registry: &mut Registry, name: &str) -> Result<()> {
    // Removal works from the record alone, even on a platform we cannot detect
    let platform = match registry.get(name) {
        Some(record) => record.platform,
        None => return Err(pact_extensions::Error::NotInstalled(name.to_string()).into()),
    };
    let record = InstallManager::new(ctx.layout, ctx.transport, platform).uninstall(registry, name)?;
    println!(
        "{} Uninstalled {} {}",
        "✓".green().bold(),
        record.name.cyan(),
        record.version
    );
    Ok(())
}

/// Handle `pact extension env`
pub fn handle_extension_env(ctx: &CommandContext<'_>) -> Result<()> {
    let layout = ctx.layout;
    let catalog_path = layout.catalog_path();
    let platform = match ctx.platform() {
        Ok(platform) => format!("{platform} ({})", platform.target_triple()),
        Err(e) => format!("{} ({e})", "unsupported".red()),
    };

    println!("{} Extension storage", "=>".blue().bold());
    println!("   {} {}", "Root:    ".dimmed(), layout.display_root().display());
    println!(
        "   {} {}",
        "Manifest:".dimmed(),
        shown(&layout.manifest_path())
    );
    println!(
        "   {} {}{}",
        "Catalog: ".dimmed(),
        shown(&catalog_path),
        if catalog_path.is_file() { "" } else { " (not present)" }
    );
    println!("   {} {}", "Bin:     ".dimmed(), shown(&layout.bin_dir()));
    println!("   {} {}", "Platform:".dimmed(), platform);
    println!();
    println!("Add the bin directory to your PATH:");
    for line in path_setup_lines(&layout.bin_dir()) {
        println!("   {line}");
    }
    Ok(())
}

/// `path` without Windows verbatim prefixes.
fn shown(path: &Path) -> String {
    dunce::simplified(path).display().to_string()
}

/// Shell lines that put `bin_dir` first on `PATH`.
pub fn path_setup_lines(bin_dir: &Path) -> Vec<String> {
    let bin = shown(bin_dir);
    if cfg!(windows) {
        vec![
            format!("set PATH={bin};%PATH%"),
            format!("$env:Path = \"{bin};\" + $env:Path"),
        ]
    } else {
        vec![format!("export PATH=\"{bin}:$PATH\"")]
    }
}

fn print_aliases(record: &InstalledExtensionRecord) {
    let aliases: Vec<&str> = record.aliases().collect();
    if !aliases.is_empty() {
        println!("   {} {}", "Commands:".dimmed(), aliases.join(", ").yellow());
    }
}

fn print_path_hint(layout: &StorageLayout) {
    let bin_dir = layout.bin_dir();
    let on_path = std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| dir == bin_dir))
        .unwrap_or(false);
    if !on_path {
        println!(
            "   {} Run installed commands as {} or add {} to PATH (see {})",
            "Next:".dimmed(),
            "pact <command>".bold(),
            shown(&bin_dir),
            "pact extension env".bold()
        );
    }
}

/// Collects per-extension failures of an `--all` operation.
struct Failures {
    operation: &'static str,
    failed: Vec<String>,
    first: Option<CliError>,
}

impl Failures {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            failed: Vec::new(),
            first: None,
        }
    }

    fn record(&mut self, name: &str, error: CliError) {
        eprintln!("{} {}: {}", "✗".red().bold(), name, error);
        self.failed.push(name.to_string());
        self.first.get_or_insert(error);
    }

    fn finish(self) -> Result<()> {
        match self.first {
            None => Ok(()),
            Some(first) => Err(CliError::Partial {
                operation: self.operation,
                failed: self.failed,
                first: Box::new(first),
            }),
        }
    }
}
