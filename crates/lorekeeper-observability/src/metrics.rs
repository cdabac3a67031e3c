//! Prometheus metrics registry (A4): turn counters, retrieval latency, and
//! fusion degraded-mode occurrences.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

use lorekeeper_core::error::{Error, Result};

pub struct Metrics {
    registry: Registry,
    pub ingestions_total: IntCounter,
    pub ingestions_failed_total: IntCounter,
    pub search_turns_total: IntCounter,
    pub search_turns_failed_total: IntCounter,
    pub retrieval_latency_seconds: Histogram,
    pub retrieval_degraded_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let ingestions_total = IntCounter::with_opts(Opts::new(
            "lorekeeper_ingestions_total",
            "Ingestion turns completed successfully",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        let ingestions_failed_total = IntCounter::with_opts(Opts::new(
            "lorekeeper_ingestions_failed_total",
            "Ingestion turns that terminated with an error",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        let search_turns_total = IntCounter::with_opts(Opts::new(
            "lorekeeper_search_turns_total",
            "Agentic search turns completed successfully",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        let search_turns_failed_total = IntCounter::with_opts(Opts::new(
            "lorekeeper_search_turns_failed_total",
            "Agentic search turns that terminated with an error",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        let retrieval_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "lorekeeper_retrieval_latency_seconds",
            "Wall-clock time for a hybrid retrieval call",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        let retrieval_degraded_total = IntCounter::with_opts(Opts::new(
            "lorekeeper_retrieval_degraded_total",
            "Retrieval calls that degraded to a single backend",
        ))
        .map_err(|e| Error::internal(format!("registering metric: {e}")))?;

        for collector in [
            Box::new(ingestions_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(ingestions_failed_total.clone()),
            Box::new(search_turns_total.clone()),
            Box::new(search_turns_failed_total.clone()),
            Box::new(retrieval_latency_seconds.clone()),
            Box::new(retrieval_degraded_total.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| Error::internal(format!("registering metric: {e}")))?;
        }

        Ok(Self {
            registry,
            ingestions_total,
            ingestions_failed_total,
            search_turns_total,
            search_turns_failed_total,
            retrieval_latency_seconds,
            retrieval_degraded_total,
        })
    }

    /// Render every registered metric in Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| Error::internal(format!("encoding metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| Error::internal(format!("metrics not utf8: {e}")))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("metric registration with fixed, non-conflicting names cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_contains_registered_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.ingestions_total.inc();
        metrics.retrieval_degraded_total.inc();

        let text = metrics.export().unwrap();
        assert!(text.contains("lorekeeper_ingestions_total 1"));
        assert!(text.contains("lorekeeper_retrieval_degraded_total 1"));
    }
}
