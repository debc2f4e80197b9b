pub use oauth2_observability::{encode_prometheus_text, init_telemetry, Metrics};
