use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Margins at or below this value are treated as "no buffer left".
pub const DEFAULT_RED_EPSILON: f64 = 1e-9;
pub const DEFAULT_BETA_BASE: f64 = 1.1;
pub const DEFAULT_C_BASELINE: f64 = 0.6;

/// Alert level, ordered by severity (`Green < Yellow < Red`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

/// The single result shape every detector caller consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub recovery_margin: f64,
    pub alert_level: AlertLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub beta_base: f64,
    pub c_baseline: f64,
    pub red_epsilon: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            beta_base: DEFAULT_BETA_BASE,
            c_baseline: DEFAULT_C_BASELINE,
            red_epsilon: DEFAULT_RED_EPSILON,
        }
    }
}

/// Stateless recovery-debt detector. Holding one only pins the thresholds;
/// no history is consulted between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryDebtDetector {
    settings: DetectorSettings,
}

impl RecoveryDebtDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> DetectorSettings {
        self.settings
    }

    pub fn update(&self, c: f64, beta: f64) -> Detection {
        detect(c, beta, &self.settings)
    }
}

/// `update(C, beta, beta_base, c_baseline)` with the default RED epsilon.
pub fn update(c: f64, beta: f64, beta_base: f64, c_baseline: f64) -> Detection {
    detect(
        c,
        beta,
        &DetectorSettings {
            beta_base,
            c_baseline,
            red_epsilon: DEFAULT_RED_EPSILON,
        },
    )
}

pub fn detect(c: f64, beta: f64, settings: &DetectorSettings) -> Detection {
    let recovery_margin = recovery_margin(c, settings.c_baseline);
    let alert_level = if recovery_margin <= settings.red_epsilon {
        AlertLevel::Red
    } else if beta > settings.beta_base {
        AlertLevel::Yellow
    } else {
        AlertLevel::Green
    };
    Detection {
        recovery_margin,
        alert_level,
    }
}

/// Normalized buffer above the baseline, clamped at zero. A non-positive
/// baseline leaves no defined buffer and yields zero.
pub fn recovery_margin(c: f64, c_baseline: f64) -> f64 {
    if c_baseline <= 0.0 || c_baseline.is_nan() {
        return 0.0;
    }
    // f64::max discards NaN, so a NaN coherence also lands on zero.
    ((c - c_baseline) / c_baseline).max(0.0)
}
