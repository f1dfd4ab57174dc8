//! Command implementations for pact-cli

pub mod builtin;
pub mod extension;

pub use builtin::{BuiltinTool, run_builtin, run_completions};
pub use extension::{
    Selection, handle_extension_env, handle_extension_install, handle_extension_list,
    handle_extension_uninstall, handle_extension_update,
};
