use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// p95 latency assumed when a collector does not report one.
pub const HEALTHY_RESPONSE_P95_MS: f64 = 100.0;

fn default_response_p95_ms() -> f64 {
    HEALTHY_RESPONSE_P95_MS
}

/// One sampling tick of raw host metrics, as produced by a collector.
///
/// `response_p95_ms` and `restart_count` are optional on the wire and
/// default to healthy values; every other field is required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// CPU usage percentage, `0..=100`.
    pub cpu_usage: f64,
    /// Memory usage percentage, `0..=100`.
    pub mem_usage: f64,
    /// Errors per second.
    pub error_rate: f64,
    #[serde(default = "default_response_p95_ms", alias = "response_p95")]
    pub response_p95_ms: f64,
    #[serde(default)]
    pub restart_count: u32,
}

impl MetricSnapshot {
    pub fn new(cpu_usage: f64, mem_usage: f64, error_rate: f64) -> Self {
        Self {
            cpu_usage,
            mem_usage,
            error_rate,
            response_p95_ms: HEALTHY_RESPONSE_P95_MS,
            restart_count: 0,
        }
    }

    /// Parse and validate a snapshot from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, InputError> {
        let snapshot: Self = serde_json::from_str(raw.trim_start_matches('\u{feff}'))
            .map_err(|e| InputError::MalformedSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        check_percentage("cpu_usage", self.cpu_usage)?;
        check_percentage("mem_usage", self.mem_usage)?;
        check_non_negative("error_rate", self.error_rate)?;
        check_non_negative("response_p95_ms", self.response_p95_ms)?;
        Ok(())
    }
}

fn check_percentage(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(InputError::MalformedSnapshot(format!(
            "{field} must be within 0..=100, got {value}"
        )))
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<(), InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputError::MalformedSnapshot(format!(
            "{field} must be a finite value >= 0, got {value}"
        )))
    }
}
