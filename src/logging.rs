// src/logging.rs
use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "REFORGE_LOG";

/// Filter directive: `REFORGE_LOG` wins, then `--verbose`, then `info`.
#[must_use]
pub fn filter_directive(verbose: bool) -> String {
    env::var(LOG_ENV).unwrap_or_else(|_| if verbose { "debug" } else { "info" }.to_string())
}

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logger(verbose: bool) {
    let filter_layer = EnvFilter::try_new(filter_directive(verbose)).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .try_init();
}
