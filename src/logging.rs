use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Level defaults to `info`, overridable via
/// `RUST_LOG`. Logs go to stderr so they never mix with redirected output.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
