//! Built-in commands: the standalone pact tools and shell completions.

use std::ffi::OsString;
use std::io::Write;

use clap::CommandFactory;
use clap_complete::Shell;

use pact_extensions::launcher;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// A top-level command backed by a separately installed pact program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    Broker,
    Pactflow,
    Mock,
    Verifier,
    Stub,
    Plugin,
}

impl BuiltinTool {
    /// Name of the subcommand.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Broker => "broker",
            Self::Pactflow => "pactflow",
            Self::Mock => "mock",
            Self::Verifier => "verifier",
            Self::Stub => "stub",
            Self::Plugin => "plugin",
        }
    }

    /// Executable looked up on `PATH`.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Broker => "pact-broker",
            Self::Pactflow => "pactflow",
            Self::Mock => "pact-mock-server",
            Self::Verifier => "pact-verifier",
            Self::Stub => "pact-stub-server",
            Self::Plugin => "pact-plugin-cli",
        }
    }
}

/// Run a built-in tool with `args` and return its exit code.
pub fn run_builtin(tool: BuiltinTool, args: &[OsString]) -> Result<i32> {
    let program = launcher::find_on_path(tool.program()).ok_or_else(|| CliError::ToolNotFound {
        command: tool.command().to_string(),
        program: tool.program().to_string(),
    })?;
    tracing::debug!(command = tool.command(), program = %program.display(), "Running built-in");
    Ok(launcher::launch(&program, args)?)
}

/// Write completions for `shell` to `out`.
pub fn run_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "pact", out);
    out.flush()?;
    Ok(())
}
