//! Diagnostics on stderr through `tracing-subscriber`.
//!
//! Verbosity maps to levels: none is `warn`, `-v` is `debug`, `-vv` and up
//! is `trace`. `RUST_LOG` takes precedence when set.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level for a `-v` count.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,tableone={level},tableonelib={level}")))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level_for(verbosity)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
