//! Structured logging and Prometheus metrics (ambient A4): a `tracing`
//! subscriber configured once from `main`, plus a `Metrics` registry the
//! server binary exposes on `GET /metrics`.

pub mod metrics;
pub mod tracing_init;

pub use metrics::Metrics;
pub use tracing_init::init_tracing;
