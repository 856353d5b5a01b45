//! Logging initialisation for the CLI.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// `silent` keeps warnings and errors only. Otherwise `verbosity` 0 is INFO,
/// 1 is DEBUG and 2+ is TRACE. `RUST_LOG`, when set, takes precedence.
pub fn init(verbosity: u8, silent: bool) {
    let level = if silent {
        Level::WARN
    } else {
        match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
