use crate::engine::{AlertLevel, MetricSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// One outbound alert: level, human message and the metrics behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub alert_level: AlertLevel,
    pub message: String,
    pub entity: String,
    pub coherence: f64,
    pub recovery_margin: f64,
    pub snapshot: MetricSnapshot,
    pub timestamp: DateTime<Utc>,
}

/// Outbound alert transport (webhook, mail, ...).
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

pub(crate) fn host_label() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown-host".into())
}
