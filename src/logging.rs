//! Tracing initialization
//!
//! Logs go to stderr so stdout only ever carries the report (text or JSON).
//! Levels come from the `DBSNIFF_LOG` environment variable, e.g.
//! `DBSNIFF_LOG=dbsniff=debug`. Falls back to `dbsniff=warn`, or `dbsniff=debug` when
//! `verbose` is set.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "DBSNIFF_LOG";

static INIT: Once = Once::new();

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose { "dbsniff=debug" } else { "dbsniff=warn" };
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
