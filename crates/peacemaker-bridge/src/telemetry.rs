use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a `fmt` subscriber. `RUST_LOG` overrides `level`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
