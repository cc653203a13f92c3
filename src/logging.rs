//! Logger initialization.

use env_logger::{Builder, Env, Target};
use log::{LevelFilter, SetLoggerError};

/// Initializes `env_logger` writing to stdout.
///
/// `RUST_LOG` is honoured, defaulting to `info`. An explicit `level` (from
/// `--log-level` or `EXPORT_LOG_LEVEL`) overrides it.
pub fn init_logger(level: Option<LevelFilter>) -> Result<(), SetLoggerError> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper_util", LevelFilter::Info);

    builder.target(Target::Stdout).format_timestamp_secs().try_init()
}
