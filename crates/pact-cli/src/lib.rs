//! The `pact` command line.
//!
//! Parses arguments with clap, then routes the invocation to a built-in tool,
//! the `extension` management commands, or an installed extension's alias.

pub mod cli;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod logging;

pub use context::CommandContext;
pub use dispatch::{Dispatcher, Route};
pub use error::{CliError, Result};
