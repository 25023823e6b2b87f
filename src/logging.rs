//! Diagnostic logging setup.
//!
//! Logs go to stderr so command output on stdout stays machine-readable
//! (`ctx validate --json`). `RUST_LOG` takes precedence over `--verbose`.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "context_registry=info";
const VERBOSE_FILTER: &str = "context_registry=debug";

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
