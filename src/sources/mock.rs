use super::traits::MetricSource;
use crate::engine::MetricSnapshot;
use crate::error::TransportError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::pin::Pin;

const BASE_CPU: f64 = 30.0;
const BASE_MEM: f64 = 40.0;
const RESTART_PRESSURE: f64 = 95.0;
const RESTART_PROBABILITY: f64 = 0.1;

/// Simulated host that degrades a little every tick.
pub struct MockSource {
    degradation_rate: f64,
    tick: u64,
    restart_count: u32,
    rng: StdRng,
}

impl MockSource {
    pub fn new(degradation_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            degradation_rate,
            tick: 0,
            restart_count: 0,
            rng,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Back to a healthy host. The RNG stream is not rewound.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.restart_count = 0;
    }

    pub fn collect(&mut self) -> MetricSnapshot {
        self.tick += 1;
        #[allow(clippy::cast_precision_loss)]
        let degradation = self.tick as f64 * self.degradation_rate;

        let cpu = (BASE_CPU + degradation * 50.0 + self.rng.random_range(-5.0..=5.0)).clamp(0.0, 100.0);
        let mem = (BASE_MEM + degradation * 40.0 + self.rng.random_range(-5.0..=5.0)).clamp(0.0, 100.0);
        let error_rate = (degradation * 0.1 + self.rng.random_range(-0.01..=0.01)).max(0.0);
        let response_p95_ms =
            (100.0 + degradation * 1000.0 + self.rng.random_range(-50.0..=50.0)).max(0.0);

        if (cpu > RESTART_PRESSURE || mem > RESTART_PRESSURE)
            && self.rng.random_bool(RESTART_PROBABILITY)
        {
            self.restart_count = self.restart_count.saturating_add(1);
        }

        MetricSnapshot {
            cpu_usage: cpu,
            mem_usage: mem,
            error_rate,
            response_p95_ms,
            restart_count: self.restart_count,
        }
    }
}

impl MetricSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn sample(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<MetricSnapshot, TransportError>> + Send + '_>> {
        let snapshot = self.collect();
        Box::pin(async move { Ok(snapshot) })
    }
}
