use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding the pact-specific log filter.
pub const LOG_ENV_VAR: &str = "PACT_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Pick the log filter directive.
///
/// `--verbose` wins, then `--log-level`, then `PACT_LOG`, then `RUST_LOG`.
pub fn filter_directive(
    verbose: bool,
    log_level: Option<&str>,
    pact_log: Option<&str>,
    rust_log: Option<&str>,
) -> String {
    if verbose {
        return "debug".to_string();
    }
    [log_level, pact_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

/// Initialize the tracing subscriber for one invocation.
///
/// Logs go to stderr so they never mix with command output on stdout.
pub fn init(
    verbose: bool,
    log_level: Option<&str>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let pact_log = std::env::var(LOG_ENV_VAR).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(verbose, log_level, pact_log.as_deref(), rust_log.as_deref());

    let filter_layer = EnvFilter::try_new(&directive).or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_precedence() {
        assert_eq!(filter_directive(true, Some("trace"), None, None), "debug");
        assert_eq!(filter_directive(false, Some("trace"), Some("info"), None), "trace");
        assert_eq!(filter_directive(false, None, Some("info"), Some("error")), "info");
        assert_eq!(filter_directive(false, None, Some("  "), Some("error")), "error");
        assert_eq!(filter_directive(false, None, None, None), "warn");
    }

    #[test]
    fn test_logging_init() {
        // Only the first init in a process succeeds
        let _ = init(false, Some("debug"));
        tracing::debug!("This is a debug message");
    }
}
