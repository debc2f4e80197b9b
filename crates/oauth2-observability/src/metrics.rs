use std::time::Duration;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Prometheus collectors for credential storage calls.
#[derive(Clone)]
pub struct Metrics {
    pub operations_total: IntCounterVec,
    pub operation_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create the collectors and register them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let operations_total = IntCounterVec::new(
            Opts::new(
                "oauth2_credential_storage_operations_total",
                "Credential storage operations by backend, operation and outcome",
            ),
            &["backend", "operation", "outcome"],
        )?;

        let operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "oauth2_credential_storage_operation_seconds",
                "Credential storage operation latency, including time spent waiting for the lock",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["backend", "operation"],
        )?;

        registry.register(Box::new(operations_total.clone()))?;
        registry.register(Box::new(operation_duration_seconds.clone()))?;

        Ok(Self {
            operations_total,
            operation_duration_seconds,
        })
    }

    pub fn observe(&self, backend: &str, operation: &str, outcome: &str, elapsed: Duration) {
        self.operations_total
            .with_label_values(&[backend, operation, outcome])
            .inc();
        self.operation_duration_seconds
            .with_label_values(&[backend, operation])
            .observe(elapsed.as_secs_f64());
    }
}
