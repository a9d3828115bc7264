use serde::{Deserialize, Serialize};

pub const DEFAULT_MARGIN_THRESHOLD: f64 = 0.01;
pub const DEFAULT_SUSTAINED_WINDOW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationSettings {
    pub margin_threshold: f64,
    pub sustained_window: u32,
    /// Log the trigger instead of executing the configured action.
    pub read_only: bool,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            margin_threshold: DEFAULT_MARGIN_THRESHOLD,
            sustained_window: DEFAULT_SUSTAINED_WINDOW,
            read_only: true,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EscalationState {
    Normal,
    Breaching,
    Triggered,
}

/// Sustained-breach rule for one monitored entity.
///
/// `phase_triggered` latches: once the trigger fires it stays set for the
/// lifetime of the policy, so the trigger fires at most once.
#[derive(Debug, Clone, Default)]
pub struct EscalationPolicy {
    settings: EscalationSettings,
    consecutive_breach_count: u32,
    phase_triggered: bool,
}

impl EscalationPolicy {
    pub fn new(settings: EscalationSettings) -> Self {
        Self {
            settings,
            consecutive_breach_count: 0,
            phase_triggered: false,
        }
    }

    pub fn settings(&self) -> EscalationSettings {
        self.settings
    }

    pub fn read_only(&self) -> bool {
        self.settings.read_only
    }

    pub fn consecutive_breach_count(&self) -> u32 {
        self.consecutive_breach_count
    }

    pub fn phase_triggered(&self) -> bool {
        self.phase_triggered
    }

    pub fn state(&self) -> EscalationState {
        if self.phase_triggered {
            EscalationState::Triggered
        } else if self.consecutive_breach_count > 0 {
            EscalationState::Breaching
        } else {
            EscalationState::Normal
        }
    }

    /// Feed one tick's margin. Returns `true` on the tick the trigger fires.
    pub fn observe(&mut self, recovery_margin: f64) -> bool {
        let breached = recovery_margin <= self.settings.margin_threshold;
        if breached {
            self.consecutive_breach_count = self.consecutive_breach_count.saturating_add(1);
        } else {
            self.consecutive_breach_count = 0;
        }

        if breached
            && !self.phase_triggered
            && self.consecutive_breach_count >= self.settings.sustained_window
        {
            self.phase_triggered = true;
            return true;
        }
        false
    }
}
