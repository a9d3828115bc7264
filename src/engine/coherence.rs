//! Reduction of a raw metric snapshot to a coherence score `C` and a stress
//! factor `beta`.

use super::metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};

/// Sub-scores are floored here before exponentiation so a single zero cannot
/// collapse the product.
pub const HEALTH_FLOOR: f64 = 0.001;

const LATENCY_CEILING_MS: f64 = 5000.0;
const RESTART_CEILING: f64 = 10.0;
const ERROR_RATE_PENALTY: f64 = 10.0;

const CPU_WEIGHT: f64 = 2.0;
const MEM_WEIGHT: f64 = 2.0;
const ERROR_WEIGHT: f64 = 1.0;
const LATENCY_WEIGHT: f64 = 1.0;
const RESTART_WEIGHT: f64 = 1.0;

pub const BETA_MIN: f64 = 0.5;
pub const BETA_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoherenceReading {
    #[serde(rename = "C")]
    pub c: f64,
    pub beta: f64,
}

/// Per-metric health in `[0, 1]`, higher is healthier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthScores {
    pub cpu: f64,
    pub mem: f64,
    pub error: f64,
    pub latency: f64,
    pub restart: f64,
}

impl HealthScores {
    pub fn from_snapshot(snapshot: &MetricSnapshot) -> Self {
        Self {
            cpu: unit(1.0 - snapshot.cpu_usage / 100.0),
            mem: unit(1.0 - snapshot.mem_usage / 100.0),
            error: unit(1.0 - snapshot.error_rate * ERROR_RATE_PENALTY),
            latency: unit(1.0 - snapshot.response_p95_ms.min(LATENCY_CEILING_MS) / LATENCY_CEILING_MS),
            restart: unit(1.0 - f64::from(snapshot.restart_count).min(RESTART_CEILING) / RESTART_CEILING),
        }
    }

    /// Weighted geometric mean of the sub-scores.
    pub fn coherence(&self) -> f64 {
        let weighted = [
            (self.cpu, CPU_WEIGHT),
            (self.mem, MEM_WEIGHT),
            (self.error, ERROR_WEIGHT),
            (self.latency, LATENCY_WEIGHT),
            (self.restart, RESTART_WEIGHT),
        ];
        let total: f64 = weighted.iter().map(|(_, w)| w).sum();
        let product = weighted
            .iter()
            .map(|(value, weight)| value.max(HEALTH_FLOOR).powf(weight / total))
            .product::<f64>();
        product.clamp(0.0, 1.0)
    }
}

/// Reduce one snapshot. Total and deterministic: out-of-range or non-finite
/// inputs are clamped rather than rejected; validation happens at ingestion.
pub fn reduce(snapshot: &MetricSnapshot) -> CoherenceReading {
    CoherenceReading {
        c: HealthScores::from_snapshot(snapshot).coherence(),
        beta: stress_factor(snapshot),
    }
}

/// Linear stress in `[0.5, 2.0]` from average CPU and memory load.
pub fn stress_factor(snapshot: &MetricSnapshot) -> f64 {
    let load = (load_fraction(snapshot.cpu_usage) + load_fraction(snapshot.mem_usage)) / 2.0;
    BETA_MIN + (BETA_MAX - BETA_MIN) * load
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn load_fraction(percent: f64) -> f64 {
    if percent.is_nan() {
        1.0
    } else {
        (percent / 100.0).clamp(0.0, 1.0)
    }
}
