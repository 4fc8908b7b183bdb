use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Installs the global fmt subscriber; `RUST_LOG` overrides the `info` default.
pub fn init() -> Result<(), AppError> {
    fmt()
        .with_env_filter(filter("info"))
        .with_target(true)
        .try_init()
        .map_err(AppError::logging_init)
}

/// Same as [`init`] but logs to stderr at `warn`, keeping stdout for report output.
pub fn init_for_cli() -> Result<(), AppError> {
    fmt()
        .with_env_filter(filter("warn"))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(AppError::logging_init)
}
