//! CLI argument definitions using clap derive

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use pact_fs::HOME_ENV_VAR;

/// Pact command line tools and extension manager
///
/// Options are read before the command only; everything after a built-in
/// tool or an alias belongs to that program.
#[derive(Parser, Debug)]
#[command(name = "pact")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LogArgs,

    /// Extension storage root
    #[arg(long, value_name = "DIR", env = HOME_ENV_VAR, hide_env_values = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Logging options, merging those given to `pact extension`.
    pub fn log_settings(&self) -> (bool, Option<&str>) {
        let extension = match &self.command {
            Some(Commands::Extension { logging, .. }) => Some(logging),
            _ => None,
        };
        let verbose = self.logging.verbose || extension.is_some_and(|l| l.verbose);
        let log_level = extension
            .and_then(|l| l.log_level.as_deref())
            .or(self.logging.log_level.as_deref());
        (verbose, log_level)
    }
}

/// Logging options
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log filter (error, warn, info, debug, trace or a tracing directive)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// Top-level commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Pact Broker client (runs pact-broker)
    #[command(disable_help_flag = true)]
    Broker {
        /// Arguments passed through to pact-broker
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// PactFlow client (runs pactflow)
    #[command(disable_help_flag = true)]
    Pactflow {
        /// Arguments passed through to pactflow
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Mock server (runs pact-mock-server)
    #[command(disable_help_flag = true)]
    Mock {
        /// Arguments passed through to pact-mock-server
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Provider verifier (runs pact-verifier)
    #[command(disable_help_flag = true)]
    Verifier {
        /// Arguments passed through to pact-verifier
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Stub server (runs pact-stub-server)
    #[command(disable_help_flag = true)]
    Stub {
        /// Arguments passed through to pact-stub-server
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Plugin manager (runs pact-plugin-cli)
    #[command(disable_help_flag = true)]
    Plugin {
        /// Arguments passed through to pact-plugin-cli
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<OsString>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Manage optional extensions
    Extension {
        /// Also accepted after `extension` and its subcommands
        #[command(flatten)]
        logging: ExtensionLogArgs,

        #[command(subcommand)]
        action: ExtensionAction,
    },

    /// An installed extension alias, followed by its arguments
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

/// Logging options of `pact extension`, inherited by its subcommands
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionLogArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log filter (error, warn, info, debug, trace or a tracing directive)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

/// `pact extension` subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionAction {
    /// List available and installed extensions
    List {
        /// Only show installed extensions
        #[arg(long)]
        installed: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Install an extension
    Install {
        /// Extension name (see `pact extension list`)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Install every available extension
        #[arg(long)]
        all: bool,

        /// Install this version instead of the latest
        #[arg(long, value_name = "VERSION", conflicts_with = "all")]
        version: Option<String>,

        /// Reinstall even when already installed
        #[arg(long)]
        force: bool,
    },

    /// Update an installed extension to its latest version
    Update {
        /// Extension name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Update every installed extension
        #[arg(long)]
        all: bool,
    },

    /// Remove an installed extension
    Uninstall {
        /// Extension name
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Remove every installed extension
        #[arg(long)]
        all: bool,
    },

    /// Show storage locations, the detected platform and PATH setup
    Env,
}
