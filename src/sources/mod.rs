pub mod mock;
pub mod prometheus;
pub mod system;
pub mod traits;

pub use mock::MockSource;
pub use prometheus::PrometheusSource;
pub use system::SystemSource;
pub use traits::MetricSource;

use crate::config::{SourceConfig, SourceKind};

/// Factory: create the configured metric source
pub fn create_source(config: &SourceConfig) -> Box<dyn MetricSource> {
    match config.kind {
        SourceKind::Mock => Box::new(MockSource::new(config.degradation_rate, config.seed)),
        SourceKind::System => Box::new(SystemSource::new()),
        SourceKind::Prometheus => Box::new(PrometheusSource::new(&config.prometheus)),
    }
}
