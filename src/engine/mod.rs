pub mod coherence;
pub mod detector;
pub mod ledger;
pub mod metrics;
pub mod run;
pub mod trend;

pub use coherence::{CoherenceReading, reduce};
pub use detector::{AlertLevel, Detection, DetectorSettings, RecoveryDebtDetector, detect, update};
pub use ledger::{Ledger, StepFields, StepRecord, compute_step_hash, verify_chain};
pub use metrics::MetricSnapshot;
pub use run::{AuditReport, Run, RunFile, RunSeal};
pub use trend::{RecoveryMetrics, TrendTracker};
