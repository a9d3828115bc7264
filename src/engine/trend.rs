use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Samples required before confidence is derived from the history.
const MIN_CONFIDENT_SAMPLES: usize = 5;
const LOW_CONFIDENCE: f64 = 0.3;
const MAX_CONFIDENCE_DIFFS: usize = 4;

/// Trend-derived view of the recovery margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    pub recovery_margin: f64,
    pub debt_slope: f64,
    pub steps_to_irreversible: Option<u64>,
    pub confidence: f64,
}

/// Rolling margin history held by the caller; the detector itself stays
/// stateless.
#[derive(Debug, Clone)]
pub struct TrendTracker {
    window: usize,
    history: VecDeque<f64>,
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_WINDOW)
    }
}

impl TrendTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            history: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, margin: f64) {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(margin);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.history.back().copied()
    }

    /// Change between the last two samples; negative means worsening.
    pub fn debt_slope(&self) -> f64 {
        let n = self.history.len();
        if n < 2 {
            return 0.0;
        }
        self.history[n - 1] - self.history[n - 2]
    }

    pub fn steps_to_irreversible(&self) -> Option<u64> {
        let margin = self.latest()?;
        steps_to_irreversible(margin, self.debt_slope())
    }

    pub fn confidence(&self) -> f64 {
        if self.history.len() < MIN_CONFIDENT_SAMPLES {
            return LOW_CONFIDENCE;
        }
        let diffs: Vec<f64> = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(prev, next)| (next - prev).abs())
            .collect();
        let recent = &diffs[diffs.len().saturating_sub(MAX_CONFIDENCE_DIFFS)..];
        #[allow(clippy::cast_precision_loss)]
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        (1.0 - mean).clamp(0.0, 1.0)
    }

    pub fn snapshot(&self) -> Option<RecoveryMetrics> {
        let recovery_margin = self.latest()?;
        Some(RecoveryMetrics {
            recovery_margin,
            debt_slope: self.debt_slope(),
            steps_to_irreversible: self.steps_to_irreversible(),
            confidence: self.confidence(),
        })
    }
}

/// Steps until the margin reaches zero at the current slope. `None` when the
/// margin is flat or improving.
pub fn steps_to_irreversible(margin: f64, slope: f64) -> Option<u64> {
    if slope >= 0.0 || slope.is_nan() {
        return None;
    }
    if margin <= 0.0 {
        return Some(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (margin / slope).abs().trunc() as u64;
    Some(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(values: &[f64]) -> TrendTracker {
        let mut tracker = TrendTracker::default();
        for v in values {
            tracker.push(*v);
        }
        tracker
    }

    #[test]
    fn slope_is_zero_with_fewer_than_two_samples() {
        assert!(tracker_with(&[]).debt_slope().abs() < f64::EPSILON);
        assert!(tracker_with(&[0.4]).debt_slope().abs() < f64::EPSILON);
    }

    #[test]
    fn slope_uses_last_two_samples() {
        let tracker = tracker_with(&[0.5, 0.45, 0.3]);
        assert!((tracker.debt_slope() + 0.15).abs() < 1e-12);
    }

    #[test]
    fn steps_to_irreversible_truncates() {
        assert_eq!(steps_to_irreversible(0.35, -0.1), Some(3));
        assert_eq!(steps_to_irreversible(0.0, -0.1), Some(0));
        assert_eq!(steps_to_irreversible(0.35, 0.0), None);
        assert_eq!(steps_to_irreversible(0.35, 0.2), None);
    }

    #[test]
    fn confidence_is_floored_below_five_samples() {
        let tracker = tracker_with(&[0.5, 0.5, 0.5, 0.5]);
        assert!((tracker.confidence() - LOW_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn stable_history_is_fully_confident() {
        let tracker = tracker_with(&[0.5; 5]);
        assert!((tracker.confidence() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn volatile_history_lowers_confidence() {
        let tracker = tracker_with(&[0.9, 0.1, 0.9, 0.1, 0.9]);
        assert!((tracker.confidence() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut tracker = TrendTracker::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            tracker.push(v);
        }
        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.latest(), Some(4.0));
    }

    #[test]
    fn snapshot_combines_all_fields() {
        let metrics = tracker_with(&[0.6, 0.5, 0.4, 0.3, 0.2]).snapshot().unwrap();
        assert!((metrics.recovery_margin - 0.2).abs() < 1e-12);
        assert_eq!(metrics.steps_to_irreversible, Some(2));
        assert!((metrics.confidence - 0.9).abs() < 1e-9);
    }
}
