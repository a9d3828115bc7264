use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Mock,
    System,
    Prometheus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// Mock source: degradation added per tick.
    #[serde(default = "default_degradation_rate")]
    pub degradation_rate: f64,
    /// Mock source: fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub prometheus: PrometheusSourceConfig,
}

fn default_degradation_rate() -> f64 {
    0.02
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Mock,
            degradation_rate: default_degradation_rate(),
            seed: None,
            prometheus: PrometheusSourceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusSourceConfig {
    #[serde(default = "default_prometheus_url")]
    pub url: String,
    #[serde(default = "default_cpu_query")]
    pub cpu_query: String,
    #[serde(default = "default_mem_query")]
    pub mem_query: String,
    #[serde(default)]
    pub error_query: Option<String>,
    #[serde(default)]
    pub latency_query: Option<String>,
    #[serde(default)]
    pub restart_query: Option<String>,
    #[serde(default = "default_prometheus_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_prometheus_url() -> String {
    "http://localhost:9090".into()
}

fn default_cpu_query() -> String {
    r#"100 * (1 - avg(rate(node_cpu_seconds_total{mode="idle"}[1m])))"#.into()
}

fn default_mem_query() -> String {
    "100 * (1 - node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)".into()
}

fn default_prometheus_timeout_secs() -> u64 {
    1
}

impl Default for PrometheusSourceConfig {
    fn default() -> Self {
        Self {
            url: default_prometheus_url(),
            cpu_query: default_cpu_query(),
            mem_query: default_mem_query(),
            error_query: None,
            latency_query: None,
            restart_query: None,
            timeout_secs: default_prometheus_timeout_secs(),
        }
    }
}
