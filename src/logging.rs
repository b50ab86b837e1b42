use log::{info, log_enabled, Level};
use std::fmt;

/// Initializes the `env_logger` backend, falling back to `default_filter` when
/// `RUST_LOG` is unset.
///
/// Level names follow `RUST_LOG`; `rf95_rs=trace` shows every interrupt. Safe
/// to call more than once; later calls are ignored.
pub fn init_logger_with_default(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Logs an informational message, formatting it only when info is enabled.
pub fn log_info(message: fmt::Arguments<'_>) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}
