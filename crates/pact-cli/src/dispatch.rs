//! Routing of one `pact` invocation
//!
//! The leading token is resolved exactly once into a [`Route`]: a built-in
//! tool, shell completions, an `extension` subcommand, or the alias of an
//! installed extension. Anything else is an unknown command.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap_complete::Shell;
use colored::Colorize;

use pact_extensions::{HttpTransport, Platform, Registry, Transport, launcher};
use pact_fs::{StorageLayout, alias};

use crate::cli::{Cli, Commands, ExtensionAction};
use crate::commands::{self, BuiltinTool, Selection};
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::logging;

/// Where an invocation goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// No command given
    Usage,
    Builtin {
        tool: BuiltinTool,
        args: Vec<OsString>,
    },
    Completions(Shell),
    Extension(ExtensionAction),
    /// An installed extension's alias, checked on disk
    Alias {
        alias: String,
        extension: String,
        binary: PathBuf,
        args: Vec<OsString>,
    },
}

impl Route {
    /// Resolve a parsed command against the storage root.
    ///
    /// The registry is read fresh, and only when the command is not built in.
    pub fn resolve(command: Option<Commands>, layout: &StorageLayout) -> Result<Self> {
        let (tool, args) = match command {
            None => return Ok(Route::Usage),
            Some(Commands::Broker { args }) => (BuiltinTool::Broker, args),
            Some(Commands::Pactflow { args }) => (BuiltinTool::Pactflow, args),
            Some(Commands::Mock { args }) => (BuiltinTool::Mock, args),
            Some(Commands::Verifier { args }) => (BuiltinTool::Verifier, args),
            Some(Commands::Stub { args }) => (BuiltinTool::Stub, args),
            Some(Commands::Plugin { args }) => (BuiltinTool::Plugin, args),
            Some(Commands::Completions { shell }) => return Ok(Route::Completions(shell)),
            Some(Commands::Extension { action, .. }) => return Ok(Route::Extension(action)),
            Some(Commands::External(argv)) => return Self::resolve_alias(argv, layout),
        };
        Ok(Route::Builtin { tool, args })
    }

    fn resolve_alias(argv: Vec<OsString>, layout: &StorageLayout) -> Result<Self> {
        let mut argv = argv.into_iter();
        let Some(command) = argv.next() else {
            return Ok(Route::Usage);
        };
        let Some(name) = command.to_str().map(str::to_string) else {
            return Err(CliError::UnknownCommand(command.to_string_lossy().into_owned()));
        };
        if alias::validate_alias(&name).is_err() {
            return Err(CliError::UnknownCommand(name));
        }

        let registry = Registry::open(layout)?;
        let Some((record, binary)) = registry.find_alias(&name) else {
            tracing::debug!(command = %name, "Not an installed alias");
            return Err(CliError::UnknownCommand(name));
        };

        let broken = |path: PathBuf| CliError::BrokenAlias {
            alias: name.clone(),
            extension: record.name.clone(),
            path,
        };
        let alias_path = layout.alias_path(&name);
        if !alias::alias_resolves(&alias_path) {
            return Err(broken(alias_path));
        }
        if !binary.is_file() {
            return Err(broken(binary.to_path_buf()));
        }

        tracing::debug!(alias = %name, extension = %record.name, binary = %binary.display(), "Resolved alias");
        Ok(Route::Alias {
            extension: record.name.clone(),
            binary: binary.to_path_buf(),
            alias: name,
            args: argv.collect(),
        })
    }
}

/// Runs `pact` invocations.
///
/// The HTTP transport is only built when a command needs the network.
#[derive(Default)]
pub struct Dispatcher {
    transport: Option<Box<dyn Transport>>,
    platform: Option<Platform>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `transport` for all upstream requests.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Target `platform` instead of the detected one.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Run one invocation and return the process exit code.
    ///
    /// `argv` includes the program name, as [`std::env::args_os`] does.
    pub fn run<I, T>(&mut self, argv: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(e) => {
                // --help and --version land here too, with exit code 0
                let _ = e.print();
                return e.exit_code();
            }
        };

        let (verbose, log_level) = cli.log_settings();
        if let Err(e) = logging::init(verbose, log_level) {
            // A subscriber is already installed, e.g. by an embedding test
            tracing::debug!("Logging already initialised: {e}");
        }

        match self.execute(cli) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("{}: {}", "error".red().bold(), e);
                e.exit_code()
            }
        }
    }

    fn execute(&mut self, cli: Cli) -> Result<i32> {
        let layout = StorageLayout::resolve(cli.home)?;
        tracing::debug!(root = %layout.root().display(), "Storage root");

        match Route::resolve(cli.command, &layout)? {
            Route::Usage => {
                println!("{} Pact command line tools", "pact".green().bold());
                println!();
                println!("Run {} for available commands.", "pact --help".cyan());
                Ok(0)
            }
            Route::Builtin { tool, args } => commands::run_builtin(tool, &args),
            Route::Completions(shell) => {
                commands::run_completions(shell, &mut std::io::stdout())?;
                Ok(0)
            }
            Route::Extension(action) => {
                let platform = self.platform;
                let transport = self.transport()?;
                let ctx = CommandContext::load(&layout, transport, platform)?;
                run_extension(&ctx, action)?;
                Ok(0)
            }
            Route::Alias { binary, args, .. } => Ok(launcher::launch(&binary, &args)?),
        }
    }

    fn transport(&mut self) -> Result<&dyn Transport> {
        let transport: Box<dyn Transport> = match self.transport.take() {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new()?),
        };
        Ok(&**self.transport.insert(transport))
    }
}

fn run_extension(ctx: &CommandContext<'_>, action: ExtensionAction) -> Result<()> {
    match action {
        ExtensionAction::List { installed, json } => {
            commands::handle_extension_list(ctx, installed, json)
        }
        ExtensionAction::Install {
            name,
            all,
            version,
            force,
        } => commands::handle_extension_install(
            ctx,
            Selection::from_args(name, all)?,
            version.as_deref(),
            force,
        ),
        ExtensionAction::Update { name, all } => {
            commands::handle_extension_update(ctx, Selection::from_args(name, all)?)
        }
        ExtensionAction::Uninstall { name, all } => {
            commands::handle_extension_uninstall(ctx, Selection::from_args(name, all)?)
        }
        ExtensionAction::Env => commands::handle_extension_env(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<Commands> {
        Cli::try_parse_from(args).unwrap().command
    }

    #[test]
    fn builtins_route_without_touching_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        // A corrupt manifest would fail any registry read
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let layout = StorageLayout::new(dir.path());

        let route = Route::resolve(parse(&["pact", "stub", "-p", "8080"]), &layout).unwrap();
        assert_eq!(
            route,
            Route::Builtin {
                tool: BuiltinTool::Stub,
                args: vec!["-p".into(), "8080".into()],
            }
        );
        assert_eq!(Route::resolve(None, &layout).unwrap(), Route::Usage);
        assert!(matches!(
            Route::resolve(parse(&["pact", "extension", "env"]), &layout).unwrap(),
            Route::Extension(ExtensionAction::Env)
        ));
    }

    #[test]
    fn unknown_command_with_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let err = Route::resolve(parse(&["pact", "totally-unknown"]), &layout).unwrap_err();
        assert!(matches!(err, CliError::UnknownCommand(ref name) if name == "totally-unknown"));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn path_like_command_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());

        let err = Route::resolve(parse(&["pact", "../bin/sh"]), &layout).unwrap_err();
        assert!(matches!(err, CliError::UnknownCommand(_)));
    }

    #[test]
    fn corrupt_registry_is_reported_for_aliases() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();
        let layout = StorageLayout::new(dir.path());

        let err = Route::resolve(parse(&["pact", "pactflow-ai"]), &layout).unwrap_err();
        assert!(matches!(
            err,
            CliError::Extensions(pact_extensions::Error::RegistryCorrupt { .. })
        ));
    }

    #[test]
    fn usage_errors_exit_2() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.run(["pact", "extension", "install"]), 2);
        assert_eq!(dispatcher.run(["pact", "completions", "no-such-shell"]), 2);
    }

    #[test]
    fn help_and_version_exit_0() {
        let mut dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.run(["pact", "--help"]), 0);
        assert_eq!(dispatcher.run(["pact", "--version"]), 0);
    }
}
