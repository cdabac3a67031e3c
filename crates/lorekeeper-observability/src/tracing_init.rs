//! Structured logging setup: one `tracing-subscriber` registry for the
//! whole server binary, configurable via `RUST_LOG`.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `tracing` subscriber. Call once, from `main`.
///
/// Falls back to `info` for every target when `RUST_LOG` is unset or
/// unparseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}
