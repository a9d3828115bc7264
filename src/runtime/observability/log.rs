use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{info, warn};

/// Tracing-backed observer.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::TickCompleted {
                entity,
                alert_level,
                duration,
            } => {
                info!(entity = %entity, alert = %alert_level, duration_ms = millis(*duration), "tick.completed");
            }
            ObserverEvent::TickSkipped { entity, reason } => {
                warn!(entity = %entity, reason = %reason, "tick.skipped");
            }
            ObserverEvent::AlertRaised {
                entity,
                alert_level,
                recovery_margin,
            } => {
                warn!(entity = %entity, alert = %alert_level, margin = recovery_margin, "alert.raised");
            }
            ObserverEvent::PhaseTriggered {
                entity,
                consecutive_breaches,
                read_only,
            } => {
                warn!(
                    entity = %entity,
                    breaches = consecutive_breaches,
                    read_only = read_only,
                    "phase.triggered"
                );
            }
            ObserverEvent::NotificationSent {
                channel,
                alert_level,
            } => {
                info!(channel = %channel, alert = %alert_level, "notification.sent");
            }
            ObserverEvent::NotificationSuppressed { alert_level } => {
                info!(alert = %alert_level, "notification.suppressed");
            }
            ObserverEvent::NotificationFailed { channel, message } => {
                warn!(channel = %channel, error = %message, "notification.failed");
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::Coherence(c) => {
                info!(c = c, "metric.coherence");
            }
            ObserverMetric::RecoveryMargin(m) => {
                info!(margin = m, "metric.recovery_margin");
            }
            ObserverMetric::TickLatency(d) => {
                info!(latency_ms = millis(*d), "metric.tick_latency");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
