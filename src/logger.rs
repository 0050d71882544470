use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug"
    } else if cfg!(debug_assertions) {
        "trace"
    } else {
        "info"
    };

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(f) => (f, true),
        Err(_) => (EnvFilter::new(level), false),
    };

    let fmt_layer = fmt::layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    // Only visible once the subscriber is installed
    if !from_env {
        info!("\"RUST_LOG\" variable not set, defaulting to {level}");
    }
}
