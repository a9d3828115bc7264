pub mod schema;

pub use schema::{
    ActionKind, AlertsConfig, Config, DetectorConfig, EmailAlertConfig, EscalationConfig,
    ObservabilityConfig, PrometheusSourceConfig, SourceConfig, SourceKind, WatchConfig,
    WebhookAlertConfig,
};
