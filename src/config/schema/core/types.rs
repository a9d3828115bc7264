use super::super::{
    AlertsConfig, DetectorConfig, EscalationConfig, ObservabilityConfig, SourceConfig, WatchConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - resolved at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub detector: DetectorConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}
