use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// JSON logs on stdout, level from `RUST_LOG` (default `info`)
pub fn init_telemetry() {
    let _ = try_init_telemetry("info");
}

/// Installs the global subscriber; fails if one is already set
pub fn try_init_telemetry(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}
