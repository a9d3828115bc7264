use crate::engine::AlertLevel;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

pub const DEFAULT_COOLDOWN_SECONDS: u64 = 300;

/// Per-level notification cooldown. A RED send never suppresses a later
/// YELLOW; each level keeps its own clock.
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    window: TimeDelta,
    last_sent: HashMap<AlertLevel, DateTime<Utc>>,
}

impl Default for AlertCooldown {
    fn default() -> Self {
        Self::from_secs(DEFAULT_COOLDOWN_SECONDS)
    }
}

impl AlertCooldown {
    pub fn from_secs(seconds: u64) -> Self {
        let window = i64::try_from(seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            window,
            last_sent: HashMap::new(),
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Sends are allowed only once strictly more than the window has passed.
    pub fn should_send(&self, level: AlertLevel, now: DateTime<Utc>) -> bool {
        self.last_sent
            .get(&level)
            .is_none_or(|last| now.signed_duration_since(*last) > self.window)
    }

    pub fn record(&mut self, level: AlertLevel, now: DateTime<Utc>) {
        self.last_sent.insert(level, now);
    }

    /// Check and record in one step. Returns `false` when suppressed.
    pub fn try_acquire(&mut self, level: AlertLevel, now: DateTime<Utc>) -> bool {
        if !self.should_send(level, now) {
            return false;
        }
        self.record(level, now);
        true
    }

    pub fn last_sent(&self, level: AlertLevel) -> Option<DateTime<Utc>> {
        self.last_sent.get(&level).copied()
    }

    pub fn snapshot(&self) -> HashMap<AlertLevel, DateTime<Utc>> {
        self.last_sent.clone()
    }

    pub fn reset(&mut self) {
        self.last_sent.clear();
    }
}
