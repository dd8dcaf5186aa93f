//! Shared `tracing` setup for the MIP binaries.

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// The `-d` flag of the daemons maps to `debug`; the default is `info`.
/// `RUST_LOG` overrides both.
pub fn setup(debug: bool) -> Result<()> {
    let default_directive = if debug { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
