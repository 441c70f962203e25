use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable controlling log verbosity.
pub const LOG_ENV: &str = "GPUWIRE_LOG";

/// Initialize structured logging with environment filter.
/// Set GPUWIRE_LOG=debug (or trace, info, warn, error) for verbosity control.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Route log output through the test harness. Safe to call from every test;
/// only the first call installs the subscriber.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
