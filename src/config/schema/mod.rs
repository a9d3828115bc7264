mod alerts;
mod core;
mod detector;
mod escalation;
mod observability;
mod source;
mod watch;

pub use alerts::{AlertsConfig, EmailAlertConfig, WebhookAlertConfig};
pub use self::core::Config;
pub use detector::DetectorConfig;
pub use escalation::{ActionKind, EscalationConfig};
pub use observability::ObservabilityConfig;
pub use source::{PrometheusSourceConfig, SourceConfig, SourceKind};
pub use watch::WatchConfig;
