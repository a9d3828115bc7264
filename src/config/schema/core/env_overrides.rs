use super::Config;
use crate::config::SourceKind;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("RECOVERY_WATCHDOG_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }

        if let Ok(kind) = std::env::var("RECOVERY_WATCHDOG_SOURCE") {
            match kind.to_ascii_lowercase().as_str() {
                "mock" => self.source.kind = SourceKind::Mock,
                "system" => self.source.kind = SourceKind::System,
                "prometheus" => self.source.kind = SourceKind::Prometheus,
                _ => {}
            }
        }

        if let Ok(url) =
            std::env::var("RECOVERY_WATCHDOG_PROMETHEUS_URL").or_else(|_| std::env::var("PROMETHEUS_URL"))
            && !url.is_empty()
        {
            self.source.prometheus.url = url;
        }

        if let Ok(url) = std::env::var("RECOVERY_WATCHDOG_WEBHOOK_URL")
            && !url.is_empty()
        {
            self.alerts.webhook.url = Some(url);
            self.alerts.webhook.enabled = true;
        }

        if let Ok(password) = std::env::var("RECOVERY_WATCHDOG_SMTP_PASSWORD")
            && !password.is_empty()
        {
            self.alerts.email.password = Some(password);
        }

        if let Ok(raw) = std::env::var("RECOVERY_WATCHDOG_POLL_INTERVAL")
            && let Ok(secs) = raw.parse::<f64>()
            && secs.is_finite()
            && secs > 0.0
        {
            self.watch.poll_interval_secs = secs;
        }

        if let Ok(raw) = std::env::var("RECOVERY_WATCHDOG_READ_ONLY") {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.escalation.read_only = true,
                "0" | "false" | "no" => self.escalation.read_only = false,
                _ => {}
            }
        }

        if let Ok(path) = std::env::var("RECOVERY_WATCHDOG_CSV_PATH")
            && !path.is_empty()
        {
            self.watch.csv_path = PathBuf::from(path);
        }
    }
}
