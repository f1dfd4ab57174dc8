//! Launching extension and built-in binaries as child processes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Once;

use crate::{Error, Result};

/// Run `program` with `args`, inheriting stdio, and return its exit code.
///
/// Ctrl-C is ignored by this process while the child runs; the terminal
/// delivers it to the child, which decides how to shut down.
pub fn launch<I, S>(program: &Path, args: I) -> Result<i32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    ignore_interrupts();

    tracing::debug!(program = %program.display(), "Launching");
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| Error::Launch {
            program: program.to_path_buf(),
            source,
        })?;

    let code = exit_code(status);
    tracing::debug!(program = %program.display(), code, "Child exited");
    Ok(code)
}

fn ignore_interrupts() {
    static HANDLER: Once = Once::new();
    HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(|| {}) {
            tracing::debug!("Could not install interrupt handler: {e}");
        }
    });
}

/// Exit code to propagate for a finished child.
///
/// On Unix a child killed by signal `N` maps to `128 + N`, as shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Locate `tool` on `PATH`, honouring `PATHEXT` on Windows.
pub fn find_on_path(tool: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    let extensions: Vec<String> = if cfg!(windows) {
        std::env::var("PATHEXT")
            .unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string())
            .split(';')
            .map(|s| s.to_ascii_lowercase())
            .collect()
    } else {
        vec![String::new()]
    };

    for dir in std::env::split_paths(&path_var) {
        for ext in &extensions {
            let candidate = dir.join(format!("{tool}{ext}"));
            if pact_fs::io::is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}
