//! Logging setup

use tracing::{debug, info};

/// Install the global tracing subscriber
///
/// Honors `RUST_LOG`; `verbose` raises the default level to DEBUG. Calling
/// this again after a subscriber is installed does nothing.
pub fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    let result = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();

    match result {
        Ok(()) => info!("Logging initialized (verbose: {})", verbose),
        Err(e) => debug!(error = %e, "Subscriber already installed"),
    }
}
