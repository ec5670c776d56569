use anyhow::{Context, Result};
use tracing::Level;

/// Install the global subscriber. `verbosity` counts `-v` flags: info, debug, then trace.
pub fn init(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Could not set up global logging subscriber")
}
