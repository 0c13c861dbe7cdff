use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,orgportal=debug";

/// Initialise the global `tracing` subscriber with a standard `fmt` layer.
///
/// Respects `RUST_LOG`; falls back to `info,orgportal=debug`. Call once at
/// the start of `main`. Later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
