//! Diagnostic tracing for the scaffold engine.
//!
//! Step progress is logged at `info`, staging decisions at `debug`. The CLI's
//! own summary goes to stdout and is unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to `default_directive` (`warn` unless the CLI
/// was asked to be verbose). Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=scaffold=debug scaffold apply pipelines/rails_api.toml ./blog
/// ```
pub fn init(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
