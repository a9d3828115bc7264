use crate::escalation::policy::{
    DEFAULT_MARGIN_THRESHOLD, DEFAULT_SUSTAINED_WINDOW, EscalationSettings,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    #[default]
    None,
    Signal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    #[serde(default = "default_margin_threshold")]
    pub margin_threshold: f64,
    #[serde(default = "default_sustained_window")]
    pub sustained_window: u32,
    /// Safe default: the trigger is logged, never executed.
    #[serde(default = "default_true")]
    pub read_only: bool,
    #[serde(default)]
    pub action: ActionKind,
    #[serde(default)]
    pub target_pid: Option<u32>,
    #[serde(default = "default_signal")]
    pub signal: String,
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,
}

fn default_margin_threshold() -> f64 {
    DEFAULT_MARGIN_THRESHOLD
}

fn default_sustained_window() -> u32 {
    DEFAULT_SUSTAINED_WINDOW
}

fn default_true() -> bool {
    true
}

fn default_signal() -> String {
    "TERM".into()
}

fn default_grace_seconds() -> u64 {
    2
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            margin_threshold: default_margin_threshold(),
            sustained_window: default_sustained_window(),
            read_only: true,
            action: ActionKind::None,
            target_pid: None,
            signal: default_signal(),
            grace_seconds: default_grace_seconds(),
        }
    }
}

impl EscalationConfig {
    pub fn settings(&self) -> EscalationSettings {
        EscalationSettings {
            margin_threshold: self.margin_threshold,
            sustained_window: self.sustained_window,
            read_only: self.read_only,
        }
    }
}
