use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a `tracing` subscriber for the `stagerd` binary.
///
/// Uses `RUST_LOG` (via `EnvFilter`) if set, otherwise falls back to
/// `default_filter`. There is no OTLP collector in this deployment, so this
/// is just the `fmt` + `EnvFilter` pair.
pub fn setup_telemetry(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
