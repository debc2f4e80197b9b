pub mod metrics;
pub mod storage;
pub mod telemetry;

pub use metrics::Metrics;
pub use storage::ObservedStorage;
pub use telemetry::init_telemetry;

/// Render everything registered in `registry`, storage metrics included, in
/// the Prometheus text format.
pub fn encode_prometheus_text(registry: &prometheus::Registry) -> Result<String, prometheus::Error> {
    prometheus::TextEncoder::new().encode_to_string(&registry.gather())
}
