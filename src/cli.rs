//! Helpers shared by the command-line entry points

use env_logger::Env;

/// Initialise `env_logger`; `RUST_LOG` overrides the default level
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}
