use crate::engine::AlertLevel;
use crate::escalation::cooldown::DEFAULT_COOLDOWN_SECONDS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Per-level notification cooldown.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
    /// Upper bound on a single channel delivery.
    #[serde(default = "default_delivery_timeout_secs")]
    pub delivery_timeout_secs: u64,
    /// Lowest level that produces a notification.
    #[serde(default = "default_min_level")]
    pub min_level: AlertLevel,
    #[serde(default)]
    pub webhook: WebhookAlertConfig,
    #[serde(default)]
    pub email: EmailAlertConfig,
}

fn default_cooldown_seconds() -> u64 {
    DEFAULT_COOLDOWN_SECONDS
}

fn default_delivery_timeout_secs() -> u64 {
    5
}

fn default_min_level() -> AlertLevel {
    AlertLevel::Yellow
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            delivery_timeout_secs: default_delivery_timeout_secs(),
            min_level: default_min_level(),
            webhook: WebhookAlertConfig::default(),
            email: EmailAlertConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookAlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".into()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailAlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            sender: String::new(),
            password: None,
            recipients: Vec::new(),
        }
    }
}
