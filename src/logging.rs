//! Logging init: structured diagnostics on stderr.
//!
//! Progress meant for the user is printed from [`crate::ProgressEvent`]s;
//! tracing carries the diagnostics next to it.

use tracing_subscriber::EnvFilter;

/// Default filter for the given number of `-v` flags
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,zoro_dl=info",
        _ => "debug,zoro_dl=debug",
    }
}

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity`. Calling this more than once
/// keeps the first subscriber.
pub fn init_logging(verbosity: u8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(verbosity, "logging initialized");
    }
}
