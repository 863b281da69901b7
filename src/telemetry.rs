use tracing_subscriber::{EnvFilter, Registry, prelude::*};

/// Initialize tracing; `RUST_LOG` overrides the default `info` level.
pub fn init() {
    let logger = tracing_subscriber::fmt::layer().compact();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let reg = Registry::default();
    // A subscriber may already be set, e.g. by a test harness
    let _ = reg.with(env_filter).with(logger).try_init();
}
