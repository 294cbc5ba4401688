//! Tracing subscriber setup for the command-line tool.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Result, SchemaError};

/// Installs a global `fmt` subscriber filtered by `level` (any `EnvFilter`
/// directive, e.g. `info` or `classgraph=debug`).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| SchemaError::argument(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| SchemaError::argument("logging already initialized"))
}
