use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber: fmt output filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
