use crate::engine::AlertLevel;
use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    TickCompleted {
        entity: String,
        alert_level: AlertLevel,
        duration: Duration,
    },
    TickSkipped {
        entity: String,
        reason: String,
    },
    AlertRaised {
        entity: String,
        alert_level: AlertLevel,
        recovery_margin: f64,
    },
    PhaseTriggered {
        entity: String,
        consecutive_breaches: u32,
        read_only: bool,
    },
    NotificationSent {
        channel: String,
        alert_level: AlertLevel,
    },
    NotificationSuppressed {
        alert_level: AlertLevel,
    },
    NotificationFailed {
        channel: String,
        message: String,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    Coherence(f64),
    RecoveryMargin(f64),
    TickLatency(Duration),
}

/// Observability sink for loop events and metrics.
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
