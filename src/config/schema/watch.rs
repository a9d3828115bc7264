use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
    /// Run file written when the loop shuts down.
    #[serde(default)]
    pub run_path: Option<PathBuf>,
    /// Append raw `cpu_usage,mem_usage,error_rate` columns to the CSV.
    #[serde(default)]
    pub include_raw_metrics: bool,
    #[serde(default = "default_entity")]
    pub entity: String,
}

fn default_poll_interval_secs() -> f64 {
    1.0
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("pilot.csv")
}

fn default_entity() -> String {
    "localhost".into()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            csv_path: default_csv_path(),
            run_path: None,
            include_raw_metrics: false,
            entity: default_entity(),
        }
    }
}
