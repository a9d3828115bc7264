pub mod action;
pub mod cooldown;
pub mod policy;

pub use action::{LogOnlyAction, SignalAction, TriggerAction, TriggerContext};
pub use cooldown::AlertCooldown;
pub use policy::{EscalationPolicy, EscalationSettings, EscalationState};

use crate::config::{ActionKind, EscalationConfig};
use crate::engine::{AlertLevel, Detection};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

/// In-memory escalation state of one monitored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertLedgerState {
    pub last_alert_time: HashMap<AlertLevel, DateTime<Utc>>,
    pub consecutive_breach_count: u32,
    pub phase_triggered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Read-only posture: the trigger was logged, nothing executed.
    ReadOnly,
    Executed,
    Failed(String),
}

/// Factory: build the configured trigger action.
pub fn create_action(config: &EscalationConfig) -> Result<Box<dyn TriggerAction>> {
    match config.action {
        ActionKind::None => Ok(Box::new(LogOnlyAction)),
        ActionKind::Signal => {
            let pid = config
                .target_pid
                .context("escalation.action = \"signal\" requires escalation.target_pid")?;
            Ok(Box::new(SignalAction::new(
                pid,
                &config.signal,
                Duration::from_secs(config.grace_seconds),
            )?))
        }
    }
}

/// Couples the sustained-breach rule with the action it guards.
pub struct Escalator {
    policy: EscalationPolicy,
    action: Box<dyn TriggerAction>,
}

impl Escalator {
    pub fn new(policy: EscalationPolicy, action: Box<dyn TriggerAction>) -> Self {
        Self { policy, action }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    pub fn action_name(&self) -> &str {
        self.action.name()
    }

    /// Feed one tick. Returns the outcome only on the tick the trigger fires.
    /// Action failures are reported, never propagated.
    pub async fn observe(&mut self, entity: &str, detection: Detection) -> Option<TriggerOutcome> {
        if !self.policy.observe(detection.recovery_margin) {
            return None;
        }

        let context = TriggerContext {
            entity: entity.to_string(),
            recovery_margin: detection.recovery_margin,
            alert_level: detection.alert_level,
            consecutive_breaches: self.policy.consecutive_breach_count(),
        };

        if self.policy.read_only() {
            tracing::warn!(
                entity = %context.entity,
                action = self.action.name(),
                breaches = context.consecutive_breaches,
                "phase trigger fired in read-only mode; action not executed"
            );
            return Some(TriggerOutcome::ReadOnly);
        }

        match self.action.execute(&context).await {
            Ok(()) => Some(TriggerOutcome::Executed),
            Err(error) => {
                tracing::error!(
                    entity = %context.entity,
                    action = self.action.name(),
                    error = %error,
                    "phase trigger action failed"
                );
                Some(TriggerOutcome::Failed(error.to_string()))
            }
        }
    }
}
