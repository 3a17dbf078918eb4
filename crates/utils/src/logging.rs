//! provides logging helpers

use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Default level directive for the given verbosity.
pub fn default_level(debug: bool) -> filter::LevelFilter {
    if debug {
        filter::LevelFilter::DEBUG
    } else {
        filter::LevelFilter::WARN
    }
}

/// initiate the global tracing subscriber
///
/// Logs go to stderr; stdout is reserved for command output. `RUST_LOG`
/// overrides the default directive.
pub fn init(debug: bool) {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(default_level(debug).into())
        .from_env_lossy();

    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).init();
}
