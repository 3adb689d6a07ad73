use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging to stdout.
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
}
