use std::sync::OnceLock;

use anyhow::{Error, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Install the tracing subscriber once per process.
///
/// The filter comes from `RUST_LOG` and falls back to `info`. Events are
/// written as JSON lines to stderr so stdout stays free for selection output.
/// Later calls are no-ops.
///
/// # Errors
/// Fails when another global subscriber was installed first.
pub fn init() -> Result<()> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| Error::msg(e.to_string()))?;
    let _ = TRACING_INIT.set(());

    info!(version = env!("CARGO_PKG_VERSION"), "tracing initialized");
    Ok(())
}
