use crate::engine::detector::{
    DEFAULT_BETA_BASE, DEFAULT_C_BASELINE, DEFAULT_RED_EPSILON, DetectorSettings,
};
use crate::engine::trend::DEFAULT_TREND_WINDOW;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_beta_base")]
    pub beta_base: f64,
    #[serde(default = "default_c_baseline")]
    pub c_baseline: f64,
    /// Margins at or below this are RED.
    #[serde(default = "default_red_epsilon")]
    pub red_epsilon: f64,
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

fn default_beta_base() -> f64 {
    DEFAULT_BETA_BASE
}

fn default_c_baseline() -> f64 {
    DEFAULT_C_BASELINE
}

fn default_red_epsilon() -> f64 {
    DEFAULT_RED_EPSILON
}

fn default_trend_window() -> usize {
    DEFAULT_TREND_WINDOW
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            beta_base: default_beta_base(),
            c_baseline: default_c_baseline(),
            red_epsilon: default_red_epsilon(),
            trend_window: default_trend_window(),
        }
    }
}

impl DetectorConfig {
    pub fn settings(&self) -> DetectorSettings {
        DetectorSettings {
            beta_base: self.beta_base,
            c_baseline: self.c_baseline,
            red_epsilon: self.red_epsilon,
        }
    }
}
